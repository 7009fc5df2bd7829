//! ForgeCI server library — event-driven build and test orchestration.
//!
//! Inbound webhooks (forge events, Copr/Koji build callbacks, Testing Farm
//! results) are normalized into typed events, matched against each
//! repository's declared job configurations, and dispatched as isolated
//! asynchronous tasks that drive external build/test backends and mirror
//! their outcomes back to the forge as commit statuses.

pub mod backends;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod forge;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod reporting;
pub mod routes;
pub mod schema;
