use std::{sync::Arc, time::Duration};

use mtp_repository::{BenchmarkUpsert, TelemetryUpsert};

use crate::{
    controllers::http_api_controller::v1::dto::{BenchmarksRequest, TelemetryRequest},
    error::NodeError,
    periodic::deps::ProviderStore,
    state::ScratchBuffer,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

/// Drains the ingestion buffers and persists one batched upsert per kind.
/// Only submissions from known providers are flushed; anything else ages
/// out of the buffers on its own.
pub(crate) struct TelemetryFlushTask {
    providers: Arc<dyn ProviderStore>,
    telemetry_buffer: Arc<ScratchBuffer<TelemetryRequest>>,
    benchmarks_buffer: Arc<ScratchBuffer<BenchmarksRequest>>,
}

impl TelemetryFlushTask {
    pub(crate) fn new(
        providers: Arc<dyn ProviderStore>,
        telemetry_buffer: Arc<ScratchBuffer<TelemetryRequest>>,
        benchmarks_buffer: Arc<ScratchBuffer<BenchmarksRequest>>,
    ) -> Self {
        Self {
            providers,
            telemetry_buffer,
            benchmarks_buffer,
        }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown(
            "telemetry_flush",
            shutdown,
            FAILURE_INTERVAL,
            || self.execute(),
        )
        .await;
    }

    #[tracing::instrument(name = "periodic.telemetry_flush", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let pubkeys = self.providers.get_all_pubkeys().await?;

        let mut telemetry_items = Vec::new();
        let mut benchmark_items = Vec::new();

        for pubkey in &pubkeys {
            if let Some(submission) = self.telemetry_buffer.release(pubkey) {
                telemetry_items.push(telemetry_to_upsert(pubkey, &submission));
            }
            if let Some(submission) = self.benchmarks_buffer.release(pubkey) {
                benchmark_items.push(benchmark_to_upsert(pubkey, &submission));
            }
        }

        if telemetry_items.is_empty() && benchmark_items.is_empty() {
            return Ok(SUCCESS_INTERVAL);
        }

        self.providers.update_telemetry(&telemetry_items).await?;
        self.providers.update_benchmarks(&benchmark_items).await?;

        tracing::info!(
            telemetry = telemetry_items.len(),
            benchmarks = benchmark_items.len(),
            "flushed provider submissions"
        );

        Ok(SUCCESS_INTERVAL)
    }
}

fn json_or_empty_object<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Flattens a telemetry submission into the persistence row. Nested maps
/// travel as JSON strings.
fn telemetry_to_upsert(pubkey: &str, submission: &TelemetryRequest) -> TelemetryUpsert {
    let (storage_git_hash, provider_git_hash) = match &submission.git_hashes {
        Some(hashes) => (
            hashes.get("ton-storage").cloned().unwrap_or_default(),
            hashes.get("ton-storage-provider").cloned().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    let pings = submission
        .pings
        .as_ref()
        .map(json_or_empty_object)
        .unwrap_or_else(|| "{}".to_string());
    let benchmarks = submission
        .benchmark
        .as_ref()
        .map(json_or_empty_object)
        .unwrap_or_else(|| "{}".to_string());

    TelemetryUpsert {
        public_key: pubkey.to_lowercase(),
        storage_git_hash,
        provider_git_hash,
        disk_name: submission.storage.disk_name.clone(),
        cpu_name: submission.cpu_info.cpu_name.clone(),
        cpu_product_name: submission.cpu_info.product_name.clone(),
        uname_sysname: submission.uname.sysname.clone(),
        uname_release: submission.uname.release.clone(),
        uname_version: submission.uname.version.clone(),
        uname_machine: submission.uname.machine.clone(),
        cpu_load: json_or_empty_object(&submission.cpu_info.cpu_load),
        pings,
        benchmarks,
        total_space: submission.storage.total_disk_space,
        used_space: submission.storage.used_disk_space,
        free_space: submission.storage.free_disk_space,
        used_provider_space: submission.storage.provider.used_provider_space,
        total_provider_space: submission.storage.provider.total_provider_space,
        total_swap: submission.swap.total,
        usage_swap: submission.swap.usage,
        swap_usage_percent: submission.swap.usage_percent,
        usage_ram: submission.memory.usage,
        total_ram: submission.memory.total,
        ram_usage_percent: submission.memory.usage_percent,
        cpu_number: submission.cpu_info.number,
        cpu_is_virtual: submission.cpu_info.is_virtual,
        max_bag_size_bytes: submission.storage.provider.max_bag_size_bytes,
        x_real_ip: submission.x_real_ip.clone(),
    }
}

/// Pulls the qd64 level out of the disk benchmark blob, if present.
fn extract_qd64_speed(disk: Option<&serde_json::Value>, field: &str) -> Option<String> {
    disk?
        .get("qd64")?
        .get(field)?
        .as_str()
        .map(str::to_string)
}

fn benchmark_to_upsert(pubkey: &str, submission: &BenchmarksRequest) -> BenchmarkUpsert {
    // Country must be an ISO code; longer strings are reporter junk.
    let country = submission
        .country
        .as_ref()
        .filter(|c| c.len() <= 2)
        .cloned();

    BenchmarkUpsert {
        public_key: pubkey.to_lowercase(),
        disk: submission
            .disk
            .as_ref()
            .map(json_or_empty_object)
            .unwrap_or_else(|| "{}".to_string()),
        network: submission
            .network
            .as_ref()
            .map(json_or_empty_object)
            .unwrap_or_else(|| "{}".to_string()),
        qd64_disk_read_speed: extract_qd64_speed(submission.disk.as_ref(), "read_speed"),
        qd64_disk_write_speed: extract_qd64_speed(submission.disk.as_ref(), "write_speed"),
        benchmark_timestamp: submission.benchmark_timestamp,
        speedtest_download: submission.speedtest.download,
        speedtest_upload: submission.speedtest.upload,
        speedtest_ping: submission.speedtest.ping,
        country,
        isp: submission.isp.clone(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::{
        controllers::http_api_controller::v1::dto::{ProviderSpaceInfo, StorageInfo},
        periodic::tasks::testutil::MockStore,
    };

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    fn buffers() -> (
        Arc<ScratchBuffer<TelemetryRequest>>,
        Arc<ScratchBuffer<BenchmarksRequest>>,
    ) {
        (
            Arc::new(ScratchBuffer::new("telemetry", Duration::from_secs(120))),
            Arc::new(ScratchBuffer::new("benchmarks", Duration::from_secs(600))),
        )
    }

    fn telemetry_submission() -> TelemetryRequest {
        TelemetryRequest {
            storage: StorageInfo {
                pubkey: KEY_A.to_uppercase(),
                disk_name: "nvme0n1".to_string(),
                total_disk_space: 1000.0,
                used_disk_space: 400.0,
                free_disk_space: 600.0,
                provider: ProviderSpaceInfo {
                    pubkey: KEY_A.to_string(),
                    used_provider_space: 120.5,
                    total_provider_space: 512.0,
                    max_bag_size_bytes: 1 << 30,
                },
            },
            git_hashes: Some(HashMap::from([
                ("ton-storage".to_string(), "abc1234".to_string()),
                ("ton-storage-provider".to_string(), "def5678".to_string()),
            ])),
            pings: Some(HashMap::from([("peer1".to_string(), 12.5)])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn buffered_telemetry_round_trips_into_one_upsert() {
        let store = Arc::new(MockStore::default());
        store.pubkeys.lock().unwrap().push(KEY_A.to_string());

        let (telemetry, benchmarks) = buffers();
        telemetry.set(KEY_A, telemetry_submission());

        let task = TelemetryFlushTask::new(
            Arc::clone(&store) as _,
            Arc::clone(&telemetry),
            Arc::clone(&benchmarks),
        );
        task.execute().await.unwrap();

        let items = store.telemetry_items.lock().unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.public_key, KEY_A);
        assert_eq!(item.storage_git_hash, "abc1234");
        assert_eq!(item.provider_git_hash, "def5678");
        assert_eq!(item.disk_name, "nvme0n1");
        assert_eq!(item.total_provider_space, 512.0);
        assert_eq!(item.max_bag_size_bytes, 1 << 30);

        let pings: HashMap<String, f64> = serde_json::from_str(&item.pings).unwrap();
        assert_eq!(pings.get("peer1"), Some(&12.5));

        // Released on flush: a second tick has nothing to write.
        task.execute().await.unwrap();
        assert_eq!(store.telemetry_items.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_provider_submissions_stay_buffered() {
        let store = Arc::new(MockStore::default());

        let (telemetry, benchmarks) = buffers();
        telemetry.set(KEY_A, telemetry_submission());

        TelemetryFlushTask::new(
            Arc::clone(&store) as _,
            Arc::clone(&telemetry),
            Arc::clone(&benchmarks),
        )
        .execute()
        .await
        .unwrap();

        assert!(store.telemetry_items.lock().unwrap().is_empty());
        assert!(telemetry.release(KEY_A).is_some());
    }

    #[tokio::test]
    async fn benchmark_flush_extracts_qd64_and_truncates_country() {
        let store = Arc::new(MockStore::default());
        store.pubkeys.lock().unwrap().push(KEY_A.to_string());

        let (telemetry, benchmarks) = buffers();
        benchmarks.set(
            KEY_A,
            BenchmarksRequest {
                pubkey: KEY_A.to_string(),
                disk: Some(json!({
                    "qd64": {"read_speed": "812 MiB/s", "write_speed": "401 MiB/s"},
                    "qd1": {"read_speed": "95 MiB/s"}
                })),
                country: Some("Germany".to_string()),
                isp: Some("Hetzner".to_string()),
                ..Default::default()
            },
        );

        TelemetryFlushTask::new(Arc::clone(&store) as _, telemetry, benchmarks)
            .execute()
            .await
            .unwrap();

        let items = store.benchmark_items.lock().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].qd64_disk_read_speed.as_deref(), Some("812 MiB/s"));
        assert_eq!(items[0].qd64_disk_write_speed.as_deref(), Some("401 MiB/s"));
        // Full country names are rejected, ISO codes pass.
        assert_eq!(items[0].country, None);
        assert_eq!(items[0].isp.as_deref(), Some("Hetzner"));
    }

    #[tokio::test]
    async fn iso_country_code_is_kept() {
        let store = Arc::new(MockStore::default());
        store.pubkeys.lock().unwrap().push(KEY_A.to_string());

        let (telemetry, benchmarks) = buffers();
        benchmarks.set(
            KEY_A,
            BenchmarksRequest {
                pubkey: KEY_A.to_string(),
                country: Some("DE".to_string()),
                ..Default::default()
            },
        );

        TelemetryFlushTask::new(Arc::clone(&store) as _, telemetry, benchmarks)
            .execute()
            .await
            .unwrap();

        let items = store.benchmark_items.lock().unwrap();
        assert_eq!(items[0].country.as_deref(), Some("DE"));
        assert_eq!(items[0].qd64_disk_read_speed, None);
    }
}
