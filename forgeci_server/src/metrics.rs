//! Prometheus metrics for service observability.

use metrics::{counter, gauge, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a webhook received event.
pub fn webhook_received(source: &str) {
    counter!("forgeci_webhooks_received_total", "source" => source.to_string()).increment(1);
}

/// Record a finished task by name and outcome.
pub fn task_finished(task_name: &str, outcome: &str) {
    counter!(
        "forgeci_tasks_total",
        "task" => task_name.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record task execution duration.
pub fn task_duration(task_name: &str, duration_ms: u64) {
    histogram!("forgeci_task_duration_ms", "task" => task_name.to_string())
        .record(duration_ms as f64);
}

/// Record a commit status posted to the forge.
pub fn status_reported(state: &str) {
    counter!("forgeci_statuses_reported_total", "state" => state.to_string()).increment(1);
}

/// Record a scheduled retry.
pub fn task_retried(task_name: &str) {
    counter!("forgeci_task_retries_total", "task" => task_name.to_string()).increment(1);
}

/// Set current queue depth estimate.
pub fn queue_depth(depth: usize) {
    gauge!("forgeci_queue_depth").set(depth as f64);
}
