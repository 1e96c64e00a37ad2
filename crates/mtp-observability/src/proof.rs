use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_proof_stage(stage: &str, status: &str, duration: Duration) {
    counter!(
        "mtp_proof_stage_total",
        "stage" => stage.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_proof_stage_duration_seconds",
        "stage" => stage.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

/// One counter bump per checked (contract, provider) relation, labelled by
/// the numeric reason code it ended up with.
pub fn record_proof_outcome(reason: i16) {
    counter!(
        "mtp_proof_outcome_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_contract_scan(status: &str, contracts: usize, duration: Duration) {
    counter!(
        "mtp_contract_scan_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "mtp_contract_scan_contracts",
        "status" => status.to_string()
    )
    .record(contracts as f64);
    histogram!(
        "mtp_contract_scan_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}
