use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use ed25519_dalek::SigningKey;
use metrics_exporter_prometheus::PrometheusBuilder;
use mtp_chain::ChainClient;
use mtp_geo::GeoClient;
use mtp_peer::{DhtClient, Gateway, ProviderTransport};
use mtp_repository::RepositoryManager;
use rand::rngs::OsRng;

use crate::{
    config::Config,
    context::Context,
    periodic::{PeriodicParams, deps::{PeerFacade, PeriodicDeps}},
    services::{IngestService, ProviderService},
    state::ScratchBuffer,
};

const TELEMETRY_BUFFER_TTL: Duration = Duration::from_secs(2 * 60);
const BENCHMARKS_BUFFER_TTL: Duration = Duration::from_secs(10 * 60);

pub(crate) struct CoreBootstrap {
    pub(crate) context: Arc<Context>,
    pub(crate) periodic_deps: PeriodicDeps,
    pub(crate) periodic_params: PeriodicParams,
}

/// Wires managers, clients, buffers, and services. Startup failures here
/// are unrecoverable, so this is the one place allowed to panic.
pub(crate) async fn build_core(config: Arc<Config>) -> CoreBootstrap {
    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener((Ipv4Addr::UNSPECIFIED, config.metrics.port))
            .install()
            .expect("Failed to install metrics exporter");
        tracing::info!(port = config.metrics.port, "metrics exporter listening");
    }

    let repository_manager = Arc::new(
        RepositoryManager::connect(&config.repository)
            .await
            .expect("Failed to connect to database"),
    );

    let chain_client =
        Arc::new(ChainClient::new(&config.chain.client).expect("Failed to build chain client"));

    let gateway = Arc::new(Gateway::new(load_transport_key(
        config.system.key_seed.as_deref(),
    )));
    let dht = Arc::new(
        DhtClient::new(Arc::clone(&gateway), &config.peer).expect("Failed to build DHT client"),
    );
    let transport = ProviderTransport::new(Arc::clone(&gateway), Arc::clone(&dht), &config.peer);
    let peer = Arc::new(PeerFacade::new(gateway, dht, transport));

    let geo = Arc::new(GeoClient::new(&config.geo).expect("Failed to build geo client"));

    let telemetry_buffer = Arc::new(ScratchBuffer::new("telemetry", TELEMETRY_BUFFER_TTL));
    let benchmarks_buffer = Arc::new(ScratchBuffer::new("benchmarks", BENCHMARKS_BUFFER_TTL));

    let provider_service = Arc::new(ProviderService::new(Arc::clone(&repository_manager)));
    let ingest_service = Arc::new(IngestService::new(
        Arc::clone(&telemetry_buffer),
        Arc::clone(&benchmarks_buffer),
    ));

    let periodic_deps = PeriodicDeps {
        providers: Arc::clone(&repository_manager) as _,
        system: Arc::clone(&repository_manager) as _,
        chain: chain_client as _,
        peer: peer as _,
        geo: geo as _,
    };

    let periodic_params = PeriodicParams {
        master_address: config.chain.master_address.clone(),
        history_days: config.system.store_history_days,
        liveness_batch_size: config.system.liveness_batch_size,
        telemetry_buffer,
        benchmarks_buffer,
        cleaner: Arc::clone(&repository_manager) as _,
    };

    let context = Arc::new(Context::new(
        Arc::clone(&config),
        provider_service,
        ingest_service,
    ));

    CoreBootstrap {
        context,
        periodic_deps,
        periodic_params,
    }
}

/// Transport identity: from the configured 64-hex seed, or freshly
/// generated when none is set. Without a persisted seed the node gets a
/// new network identity on every start, which is fine for a registry.
fn load_transport_key(seed_hex: Option<&str>) -> SigningKey {
    match seed_hex {
        Some(seed_hex) => {
            let raw = hex::decode(seed_hex).expect("system.key_seed is not valid hex");
            let seed: [u8; 32] = raw
                .try_into()
                .expect("system.key_seed must decode to 32 bytes");
            SigningKey::from_bytes(&seed)
        }
        None => SigningKey::generate(&mut OsRng),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn key_from_seed_is_deterministic() {
        let seed = "11".repeat(32);
        let a = load_transport_key(Some(&seed));
        let b = load_transport_key(Some(&seed));
        assert_eq!(a.verifying_key(), b.verifying_key());
    }

    #[test]
    fn generated_keys_differ() {
        let a = load_transport_key(None);
        let b = load_transport_key(None);
        assert_ne!(a.verifying_key(), b.verifying_key());
    }
}
