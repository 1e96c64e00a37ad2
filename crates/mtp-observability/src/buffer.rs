use metrics::{counter, gauge};

pub fn record_buffer_entries(buffer: &str, entries: usize) {
    gauge!(
        "mtp_scratch_buffer_entries",
        "buffer" => buffer.to_string()
    )
    .set(entries as f64);
}

pub fn record_buffer_expired(buffer: &str, expired: usize) {
    counter!(
        "mtp_scratch_buffer_expired_total",
        "buffer" => buffer.to_string()
    )
    .increment(expired as u64);
}

pub fn record_ingest(kind: &str, status: &str) {
    counter!(
        "mtp_ingest_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
