//! Task dispatcher — a bounded queue feeding a fixed worker pool.
//!
//! Every resolved handler runs as its own task with an isolated working
//! directory. Transient failures are retried with exponential backoff up
//! to a configured attempt bound; permanent failures and skips are not.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::events::Event;
use crate::handlers::{clean_workdir, resolve, HandlerEntry, TaskContext, TaskError};
use crate::jobs::{JobConfig, PackageConfig};
use crate::metrics;

/// One queued unit of work.
pub struct Task {
    pub id: Uuid,
    pub entry: &'static HandlerEntry,
    pub event: Event,
    pub job_config: JobConfig,
    pub package_config: PackageConfig,
    pub attempt: u32,
}

/// Delay before retry number `attempt` (0-based), doubling from the base
/// and capped.
pub fn retry_delay(config: &ServiceConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let secs = config
        .retry_base_secs
        .saturating_mul(exp)
        .min(config.retry_max_secs);
    Duration::from_secs(secs)
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: TaskContext,
    tx: mpsc::Sender<Task>,
}

impl Dispatcher {
    /// Starts the worker pool and returns a handle for enqueueing.
    pub fn spawn(ctx: TaskContext) -> Dispatcher {
        let (tx, rx) = mpsc::channel(ctx.config.queue_capacity);
        let dispatcher = Dispatcher { ctx, tx };

        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..dispatcher.ctx.config.workers {
            let rx = rx.clone();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                tracing::debug!(worker, "Dispatch worker started");
                loop {
                    let task = { rx.lock().await.recv().await };
                    let Some(task) = task else { break };
                    dispatcher.process(task).await;
                }
                tracing::debug!(worker, "Dispatch worker stopped");
            });
        }

        dispatcher
    }

    /// Resolves an event against a package config and enqueues every
    /// matching task. Returns how many were enqueued.
    pub async fn enqueue_event(
        &self,
        event: &Event,
        package_config: &PackageConfig,
    ) -> anyhow::Result<usize> {
        let resolved = resolve(event, package_config);
        let count = resolved.len();
        for task in resolved {
            self.enqueue(Task {
                id: Uuid::new_v4(),
                entry: task.entry,
                event: event.clone(),
                job_config: task.job_config,
                package_config: package_config.clone(),
                attempt: 0,
            })
            .await?;
        }
        Ok(count)
    }

    pub async fn enqueue(&self, task: Task) -> anyhow::Result<()> {
        metrics::queue_depth(self.ctx.config.queue_capacity - self.tx.capacity());
        self.tx
            .send(task)
            .await
            .map_err(|_| anyhow::anyhow!("dispatch queue closed"))
    }

    async fn process(&self, task: Task) {
        let task_name = task.entry.task_name;
        let Some(handler) = (task.entry.build)(
            &self.ctx,
            &task.event,
            &task.job_config,
            &task.package_config,
        ) else {
            tracing::debug!(task = task_name, "Handler declined event shape");
            return;
        };

        if !handler.pre_check() {
            tracing::debug!(task = task_name, task_id = %task.id, "Pre-check failed, skipping");
            metrics::task_finished(task_name, "skipped");
            return;
        }

        let workdir = self.ctx.config.work_dir.join(task.id.to_string());
        if let Err(e) = std::fs::create_dir_all(&workdir) {
            tracing::error!(task = task_name, error = %e, "Cannot create task workdir");
            metrics::task_finished(task_name, "error");
            return;
        }

        tracing::info!(task = task_name, task_id = %task.id, attempt = task.attempt, "Task started");
        let started = std::time::Instant::now();
        // The handler runs in its own spawned task so a panic inside it is
        // contained and surfaced as a failed task, not a dead worker.
        let run_dir = workdir.clone();
        let result = match tokio::spawn(async move {
            let mut handler = handler;
            handler.run(&run_dir).await
        })
        .await
        {
            Ok(result) => result,
            Err(join_err) => Err(TaskError::Permanent(anyhow::anyhow!(
                "task panicked: {join_err}"
            ))),
        };
        metrics::task_duration(task_name, started.elapsed().as_millis() as u64);

        // Cleanup failures are logged, never escalated into task failures.
        if let Err(e) = clean_workdir(&workdir) {
            tracing::warn!(task = task_name, error = %e, "Workdir cleanup failed");
        }
        if let Err(e) = std::fs::remove_dir(&workdir) {
            tracing::warn!(task = task_name, error = %e, "Workdir removal failed");
        }

        match result {
            Ok(results) => {
                let outcome = if results.success { "success" } else { "failure" };
                tracing::info!(task = task_name, task_id = %task.id, outcome, "Task finished");
                metrics::task_finished(task_name, outcome);
            }
            Err(TaskError::Permanent(err)) => {
                tracing::error!(task = task_name, task_id = %task.id, error = %err, "Task failed permanently");
                metrics::task_finished(task_name, "permanent_failure");
            }
            Err(TaskError::Transient(err)) => {
                let next_attempt = task.attempt + 1;
                if next_attempt >= self.ctx.config.retry_max_attempts {
                    tracing::error!(
                        task = task_name,
                        task_id = %task.id,
                        error = %err,
                        attempts = next_attempt,
                        "Task retries exhausted"
                    );
                    metrics::task_finished(task_name, "retries_exhausted");
                    return;
                }

                let delay = retry_delay(&self.ctx.config, task.attempt);
                tracing::warn!(
                    task = task_name,
                    task_id = %task.id,
                    error = %err,
                    delay_secs = delay.as_secs(),
                    "Transient failure, retrying"
                );
                metrics::task_retried(task_name);

                let dispatcher = self.clone();
                let retry = Task {
                    attempt: next_attempt,
                    ..task
                };
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = dispatcher.enqueue(retry).await {
                        tracing::error!(error = %e, "Cannot re-enqueue retried task");
                    }
                });
            }
        }
    }
}
