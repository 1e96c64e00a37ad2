use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_task_run(task: &str, status: &str, duration: Duration) {
    counter!(
        "mtp_task_runs_total",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_task_duration_seconds",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_task_cadence(task: &str, cadence: Duration) {
    histogram!(
        "mtp_task_cadence_seconds",
        "task" => task.to_string()
    )
    .record(cadence.as_secs_f64());
}

pub fn record_discovery_cycle(status: &str, new_providers: usize, duration: Duration) {
    counter!(
        "mtp_discovery_cycle_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_discovery_new_providers",
        "status" => status.to_string()
    )
    .record(new_providers as f64);
    histogram!(
        "mtp_discovery_cycle_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_liveness_probe(online: bool, duration: Duration) {
    let status = if online { "online" } else { "offline" };
    counter!(
        "mtp_liveness_probe_total",
        "status" => status
    )
    .increment(1);
    histogram!(
        "mtp_liveness_probe_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());
}
