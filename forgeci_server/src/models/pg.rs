//! Postgres store implementation (diesel-async over a deadpool pool).
//!
//! Status transitions are single UPDATE statements, so concurrent callbacks
//! for the same external id cannot interleave partial writes.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::schema::{copr_builds, koji_builds, projects, test_runs, triggers};

use super::koji_build::{CoprBuild, KojiBuild, NewCoprBuild, NewKojiBuild};
use super::project::Project;
use super::store::{CoprBuildStore, KojiBuildStore, ProjectStore, TestRunStore, TriggerStore};
use super::test_run::{NewTestRun, TestRun};
use super::trigger::{NewTrigger, TriggerKey, TriggerObject};
use super::RunStatus;

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> anyhow::Result<diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn find_by_repo(
        &self,
        namespace: &str,
        repo_name: &str,
    ) -> anyhow::Result<Option<Project>> {
        let mut conn = self.conn().await?;
        let project = projects::table
            .filter(projects::namespace.eq(namespace))
            .filter(projects::repo_name.eq(repo_name))
            .filter(projects::active.eq(true))
            .first::<Project>(&mut conn)
            .await
            .optional()?;
        Ok(project)
    }
}

#[async_trait]
impl TriggerStore for PgStore {
    async fn get_or_create(&self, key: &TriggerKey) -> anyhow::Result<TriggerObject> {
        let mut conn = self.conn().await?;

        let mut query = triggers::table
            .filter(triggers::kind.eq(key.kind()))
            .filter(triggers::project_url.eq(key.project_url()))
            .into_boxed();
        match key {
            TriggerKey::PullRequest { pr_id, .. } => {
                query = query.filter(triggers::pr_id.eq(pr_id));
            }
            TriggerKey::GitBranch { branch_name, .. } => {
                query = query.filter(triggers::branch_name.eq(branch_name));
            }
            TriggerKey::Release { release_tag, .. } => {
                query = query.filter(triggers::release_tag.eq(release_tag));
            }
        }

        if let Some(existing) = query.first::<TriggerObject>(&mut conn).await.optional()? {
            return Ok(existing);
        }

        let created = diesel::insert_into(triggers::table)
            .values(NewTrigger::from_key(key))
            .get_result::<TriggerObject>(&mut conn)
            .await?;
        Ok(created)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<TriggerObject>> {
        let mut conn = self.conn().await?;
        let trigger = triggers::table
            .find(id)
            .first::<TriggerObject>(&mut conn)
            .await
            .optional()?;
        Ok(trigger)
    }
}

#[async_trait]
impl TestRunStore for PgStore {
    async fn create(&self, new: NewTestRun) -> anyhow::Result<TestRun> {
        let mut conn = self.conn().await?;
        let run = diesel::insert_into(test_runs::table)
            .values(&new)
            .get_result::<TestRun>(&mut conn)
            .await?;
        Ok(run)
    }

    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> anyhow::Result<Option<TestRun>> {
        let mut conn = self.conn().await?;
        let run = test_runs::table
            .filter(test_runs::pipeline_id.eq(pipeline_id))
            .first::<TestRun>(&mut conn)
            .await
            .optional()?;
        Ok(run)
    }

    async fn set_result(
        &self,
        pipeline_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        // One UPDATE: racing callbacks can only ever apply whole rows.
        diesel::update(test_runs::table.filter(test_runs::pipeline_id.eq(pipeline_id)))
            .set((
                test_runs::status.eq(status.as_str()),
                web_url.map(|url| test_runs::web_url.eq(url)),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CoprBuildStore for PgStore {
    async fn create(&self, new: NewCoprBuild) -> anyhow::Result<CoprBuild> {
        let mut conn = self.conn().await?;
        let build = diesel::insert_into(copr_builds::table)
            .values(&new)
            .get_result::<CoprBuild>(&mut conn)
            .await?;
        Ok(build)
    }

    async fn get_by_build_target(
        &self,
        build_id: &str,
        target: &str,
    ) -> anyhow::Result<Option<CoprBuild>> {
        let mut conn = self.conn().await?;
        let build = copr_builds::table
            .filter(copr_builds::build_id.eq(build_id))
            .filter(copr_builds::target.eq(target))
            .first::<CoprBuild>(&mut conn)
            .await
            .optional()?;
        Ok(build)
    }

    async fn set_status(
        &self,
        build_id: &str,
        target: &str,
        status: RunStatus,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let rows = copr_builds::table
            .filter(copr_builds::build_id.eq(build_id))
            .filter(copr_builds::target.eq(target));
        if status == RunStatus::Running {
            diesel::update(rows)
                .set((
                    copr_builds::status.eq(status.as_str()),
                    copr_builds::start_time.eq(Utc::now()),
                ))
                .execute(&mut conn)
                .await?;
        } else if status.is_terminal() {
            diesel::update(rows)
                .set((
                    copr_builds::status.eq(status.as_str()),
                    copr_builds::finished_time.eq(Utc::now()),
                ))
                .execute(&mut conn)
                .await?;
        } else {
            diesel::update(rows)
                .set(copr_builds::status.eq(status.as_str()))
                .execute(&mut conn)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KojiBuildStore for PgStore {
    async fn create(&self, new: NewKojiBuild) -> anyhow::Result<KojiBuild> {
        let mut conn = self.conn().await?;
        let build = diesel::insert_into(koji_builds::table)
            .values(&new)
            .get_result::<KojiBuild>(&mut conn)
            .await?;
        Ok(build)
    }

    async fn get_by_build_id(&self, build_id: &str) -> anyhow::Result<Option<KojiBuild>> {
        let mut conn = self.conn().await?;
        let build = koji_builds::table
            .filter(koji_builds::build_id.eq(build_id))
            .first::<KojiBuild>(&mut conn)
            .await
            .optional()?;
        Ok(build)
    }

    async fn set_result(
        &self,
        build_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let rows = koji_builds::table.filter(koji_builds::build_id.eq(build_id));
        let changes = (
            koji_builds::status.eq(status.as_str()),
            web_url.map(|url| koji_builds::web_url.eq(url)),
        );
        if status == RunStatus::Running {
            diesel::update(rows)
                .set((changes, koji_builds::start_time.eq(Utc::now())))
                .execute(&mut conn)
                .await?;
        } else if status.is_terminal() {
            diesel::update(rows)
                .set((changes, koji_builds::finished_time.eq(Utc::now())))
                .execute(&mut conn)
                .await?;
        } else {
            diesel::update(rows).set(changes).execute(&mut conn).await?;
        }
        Ok(())
    }

    async fn get_range(&self, first: i64, last: i64) -> anyhow::Result<Vec<KojiBuild>> {
        let mut conn = self.conn().await?;
        let first = first.max(0);
        let count = (last - first + 1).max(0);
        let builds = koji_builds::table
            .order(koji_builds::id.desc())
            .offset(first)
            .limit(count)
            .load::<KojiBuild>(&mut conn)
            .await?;
        Ok(builds)
    }
}
