use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_chain_request(method: &str, status: &str, duration: Duration) {
    counter!(
        "mtp_chain_request_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_chain_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_peer_query(query: &str, status: &str, duration: Duration) {
    counter!(
        "mtp_peer_query_total",
        "query" => query.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_peer_query_duration_seconds",
        "query" => query.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_repository_query(repository: &str, method: &str, status: &str, duration: Duration) {
    counter!(
        "mtp_repository_query_total",
        "repository" => repository.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_repository_query_duration_seconds",
        "repository" => repository.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}
