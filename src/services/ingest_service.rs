use std::{sync::Arc, time::Duration};

use mtp_observability::record_ingest;

use crate::{
    controllers::http_api_controller::v1::dto::{BenchmarksRequest, TelemetryRequest},
    services::ServiceError,
    state::ScratchBuffer,
    types::ProviderKey,
};

/// TTL of the latest-raw buffer backing `GET /telemetry/latest`.
const LATEST_TTL: Duration = Duration::from_secs(2 * 60);

/// Write side of the ingestion path. Submissions land in the scratch
/// buffers only; the flush worker owns persistence.
pub(crate) struct IngestService {
    telemetry_buffer: Arc<ScratchBuffer<TelemetryRequest>>,
    benchmarks_buffer: Arc<ScratchBuffer<BenchmarksRequest>>,
    latest_buffer: ScratchBuffer<serde_json::Value>,
}

impl IngestService {
    pub(crate) fn new(
        telemetry_buffer: Arc<ScratchBuffer<TelemetryRequest>>,
        benchmarks_buffer: Arc<ScratchBuffer<BenchmarksRequest>>,
    ) -> Self {
        Self {
            telemetry_buffer,
            benchmarks_buffer,
            latest_buffer: ScratchBuffer::new("latest_telemetry", LATEST_TTL),
        }
    }

    pub(crate) fn update_telemetry(
        &self,
        submission: TelemetryRequest,
        raw: serde_json::Value,
    ) -> Result<(), ServiceError> {
        let Some(key) = ProviderKey::parse(&submission.storage.provider.pubkey) else {
            record_ingest("telemetry", "rejected");
            return Err(ServiceError::BadRequest(
                "invalid provider pubkey".to_string(),
            ));
        };

        self.telemetry_buffer.set(key.as_str(), submission);
        self.latest_buffer.set(key.as_str(), raw);
        record_ingest("telemetry", "accepted");

        Ok(())
    }

    pub(crate) fn update_benchmarks(
        &self,
        submission: BenchmarksRequest,
    ) -> Result<(), ServiceError> {
        let Some(key) = ProviderKey::parse(&submission.pubkey) else {
            record_ingest("benchmarks", "rejected");
            return Err(ServiceError::BadRequest(
                "invalid provider pubkey".to_string(),
            ));
        };

        self.benchmarks_buffer.set(key.as_str(), submission);
        record_ingest("benchmarks", "accepted");

        Ok(())
    }

    /// Raw submissions received within the last couple of minutes.
    pub(crate) fn latest_telemetry(&self) -> Vec<serde_json::Value> {
        self.latest_buffer
            .get_all()
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;
    use crate::controllers::http_api_controller::v1::dto::{ProviderSpaceInfo, StorageInfo};

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    fn service() -> (
        IngestService,
        Arc<ScratchBuffer<TelemetryRequest>>,
        Arc<ScratchBuffer<BenchmarksRequest>>,
    ) {
        let telemetry = Arc::new(ScratchBuffer::new("telemetry", Duration::from_secs(120)));
        let benchmarks = Arc::new(ScratchBuffer::new("benchmarks", Duration::from_secs(600)));
        (
            IngestService::new(Arc::clone(&telemetry), Arc::clone(&benchmarks)),
            telemetry,
            benchmarks,
        )
    }

    fn telemetry_for(pubkey: &str) -> TelemetryRequest {
        TelemetryRequest {
            storage: StorageInfo {
                provider: ProviderSpaceInfo {
                    pubkey: pubkey.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn telemetry_lands_in_both_buffers() {
        let (service, telemetry, _) = service();

        service
            .update_telemetry(telemetry_for(KEY_A), json!({"raw": true}))
            .unwrap();

        assert!(telemetry.release(KEY_A).is_some());
        assert_eq!(service.latest_telemetry().len(), 1);
    }

    #[test]
    fn invalid_pubkey_is_rejected() {
        let (service, telemetry, benchmarks) = service();

        assert!(service
            .update_telemetry(telemetry_for("not-a-key"), json!({}))
            .is_err());
        assert!(service
            .update_benchmarks(BenchmarksRequest {
                pubkey: "short".to_string(),
                ..Default::default()
            })
            .is_err());

        assert!(telemetry.get_all().is_empty());
        assert!(benchmarks.get_all().is_empty());
    }

    #[test]
    fn benchmark_lands_in_buffer_keyed_lowercase() {
        let (service, _, benchmarks) = service();

        service
            .update_benchmarks(BenchmarksRequest {
                pubkey: KEY_A.to_uppercase(),
                ..Default::default()
            })
            .unwrap();

        assert!(benchmarks.release(KEY_A).is_some());
    }
}
