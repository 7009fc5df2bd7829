//! Diesel table definitions for the pipeline service.
//!
//! Tables: projects, triggers, copr_builds, koji_builds, test_runs.
//! Run records are append-only; callbacks mutate rows in place, keyed by
//! the externally assigned build/pipeline id.

diesel::table! {
    projects (id) {
        id -> Int8,
        namespace -> Varchar,
        repo_name -> Varchar,
        project_url -> Varchar,
        package_config -> Jsonb,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    triggers (id) {
        id -> Int8,
        kind -> Varchar,
        namespace -> Varchar,
        repo_name -> Varchar,
        project_url -> Varchar,
        pr_id -> Nullable<Int8>,
        branch_name -> Nullable<Varchar>,
        release_tag -> Nullable<Varchar>,
        create_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    copr_builds (id) {
        id -> Int8,
        build_id -> Varchar,
        target -> Varchar,
        status -> Varchar,
        commit_sha -> Varchar,
        web_url -> Nullable<Varchar>,
        submitted_time -> Nullable<Timestamptz>,
        start_time -> Nullable<Timestamptz>,
        finished_time -> Nullable<Timestamptz>,
        trigger_id -> Int8,
    }
}

diesel::table! {
    koji_builds (id) {
        id -> Int8,
        build_id -> Varchar,
        target -> Varchar,
        status -> Varchar,
        commit_sha -> Varchar,
        web_url -> Nullable<Varchar>,
        build_logs_url -> Nullable<Varchar>,
        submitted_time -> Nullable<Timestamptz>,
        start_time -> Nullable<Timestamptz>,
        finished_time -> Nullable<Timestamptz>,
        trigger_id -> Int8,
    }
}

diesel::table! {
    test_runs (id) {
        id -> Int8,
        pipeline_id -> Varchar,
        target -> Varchar,
        status -> Varchar,
        commit_sha -> Varchar,
        web_url -> Nullable<Varchar>,
        submitted_time -> Nullable<Timestamptz>,
        trigger_id -> Int8,
    }
}

// Foreign key relationships
diesel::joinable!(copr_builds -> triggers (trigger_id));
diesel::joinable!(koji_builds -> triggers (trigger_id));
diesel::joinable!(test_runs -> triggers (trigger_id));

diesel::allow_tables_to_appear_in_same_query!(
    projects,
    triggers,
    copr_builds,
    koji_builds,
    test_runs,
);
