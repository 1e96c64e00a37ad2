pub(crate) mod deps;
pub(crate) mod runner;
pub(crate) mod tasks;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use self::{
    deps::PeriodicDeps,
    tasks::{
        contract_sync::ContractSyncTask,
        discovery::DiscoveryTask,
        geo_enrich::GeoEnrichTask,
        liveness::LivenessTask,
        proof_check::ProofCheckTask,
        rating::RatingTask,
        retention::{HistoryCleaner, RetentionTask},
        telemetry_flush::TelemetryFlushTask,
        uptime::UptimeTask,
    },
};
use crate::{
    controllers::http_api_controller::v1::dto::{BenchmarksRequest, TelemetryRequest},
    state::ScratchBuffer,
};

pub(crate) struct PeriodicParams {
    pub(crate) master_address: String,
    pub(crate) history_days: i32,
    pub(crate) liveness_batch_size: usize,
    pub(crate) telemetry_buffer: Arc<ScratchBuffer<TelemetryRequest>>,
    pub(crate) benchmarks_buffer: Arc<ScratchBuffer<BenchmarksRequest>>,
    pub(crate) cleaner: Arc<dyn HistoryCleaner>,
}

/// Spawns every periodic worker into one `JoinSet` and waits for them.
/// Each worker loops independently; under normal operation they only exit
/// on shutdown. Panics surface immediately instead of at join-all time.
pub(crate) async fn run_all(
    deps: PeriodicDeps,
    params: PeriodicParams,
    shutdown: CancellationToken,
) {
    let mut set = tokio::task::JoinSet::new();

    set.spawn(
        DiscoveryTask::new(
            Arc::clone(&deps.providers),
            Arc::clone(&deps.system),
            Arc::clone(&deps.chain),
            params.master_address.clone(),
        )
        .run(shutdown.clone()),
    );

    set.spawn(
        LivenessTask::new(
            Arc::clone(&deps.providers),
            Arc::clone(&deps.peer),
            params.liveness_batch_size,
        )
        .run(shutdown.clone()),
    );

    set.spawn(
        ContractSyncTask::new(Arc::clone(&deps.providers), Arc::clone(&deps.chain))
            .run(shutdown.clone()),
    );

    set.spawn(
        ProofCheckTask::new(
            Arc::clone(&deps.providers),
            Arc::clone(&deps.chain),
            Arc::clone(&deps.peer),
        )
        .run(shutdown.clone()),
    );

    set.spawn(
        TelemetryFlushTask::new(
            Arc::clone(&deps.providers),
            Arc::clone(&params.telemetry_buffer),
            Arc::clone(&params.benchmarks_buffer),
        )
        .run(shutdown.clone()),
    );

    set.spawn(UptimeTask::new(Arc::clone(&deps.providers)).run(shutdown.clone()));
    set.spawn(RatingTask::new(Arc::clone(&deps.providers)).run(shutdown.clone()));

    set.spawn(
        GeoEnrichTask::new(Arc::clone(&deps.providers), Arc::clone(&deps.geo))
            .run(shutdown.clone()),
    );

    set.spawn(
        RetentionTask::new(Arc::clone(&params.cleaner), params.history_days)
            .run(shutdown.clone()),
    );

    // Janitors for the ingestion buffers live with the workers: they share
    // the same shutdown and have nothing to flush on exit.
    let telemetry_buffer = Arc::clone(&params.telemetry_buffer);
    let janitor_shutdown = shutdown.clone();
    set.spawn(async move { telemetry_buffer.run_janitor(janitor_shutdown).await });

    let benchmarks_buffer = Arc::clone(&params.benchmarks_buffer);
    let janitor_shutdown = shutdown.clone();
    set.spawn(async move { benchmarks_buffer.run_janitor(janitor_shutdown).await });

    while let Some(result) = set.join_next().await {
        match result {
            Ok(()) => {
                // Task exited normally (shutdown)
            }
            Err(e) if e.is_panic() => {
                tracing::error!("Periodic task panicked: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Periodic task failed: {:?}", e);
            }
        }
    }
}
