use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use mtp_observability::record_liveness_probe;
use mtp_repository::{ProviderPriceUpdate, StatusSample};
use tokio_util::sync::CancellationToken;

use crate::{
    error::NodeError,
    periodic::deps::{PeerApi, ProviderStore},
    types::ProviderKey,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

const PROBE_TIMEOUT: Duration = Duration::from_secs(14);
/// Probe size handed to the rates query; liveness only cares whether the
/// daemon answers, not what it would charge for real data.
const FAKE_SIZE: u64 = 1;

/// Probes every known provider over the peer protocol once per tick,
/// recording an online/offline sample and, for responsive daemons, their
/// current commercial terms.
pub(crate) struct LivenessTask {
    providers: Arc<dyn ProviderStore>,
    peer: Arc<dyn PeerApi>,
    /// Upper bound on rows per persistence batch; probe results are split
    /// into chunks of this size before the upserts.
    batch_size: usize,
}

impl LivenessTask {
    pub(crate) fn new(
        providers: Arc<dyn ProviderStore>,
        peer: Arc<dyn PeerApi>,
        batch_size: usize,
    ) -> Self {
        Self {
            providers,
            peer,
            batch_size: batch_size.max(1),
        }
    }

    pub(crate) async fn run(self, shutdown: CancellationToken) {
        let cancel = shutdown.clone();
        crate::periodic::runner::run_with_shutdown("liveness", shutdown, FAILURE_INTERVAL, || {
            self.execute(&cancel)
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.liveness", skip(self, shutdown))]
    pub(crate) async fn execute(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Duration, NodeError> {
        let pubkeys = self.providers.get_all_pubkeys().await?;
        if pubkeys.is_empty() {
            return Ok(SUCCESS_INTERVAL);
        }

        let mut samples = Vec::with_capacity(pubkeys.len());
        let mut prices = Vec::with_capacity(pubkeys.len());

        for pubkey in &pubkeys {
            if shutdown.is_cancelled() {
                tracing::info!("shutdown requested, stopping provider probes");
                return Ok(SUCCESS_INTERVAL);
            }

            let Some(key) = ProviderKey::parse(pubkey) else {
                continue;
            };

            let started = Instant::now();
            let probe = tokio::time::timeout(
                PROBE_TIMEOUT,
                self.peer.get_storage_rates(key.to_bytes(), FAKE_SIZE),
            )
            .await;

            match probe {
                Ok(Ok(rates)) => {
                    record_liveness_probe(true, started.elapsed());
                    samples.push(StatusSample {
                        public_key: pubkey.clone(),
                        is_online: true,
                    });
                    prices.push(ProviderPriceUpdate {
                        public_key: pubkey.clone(),
                        rate_per_mb_per_day: rates.rate_per_mb_day as i64,
                        min_bounty: rates.min_bounty as i64,
                        min_span: rates.min_span as i32,
                        max_span: rates.max_span as i32,
                    });
                }
                Ok(Err(error)) => {
                    record_liveness_probe(false, started.elapsed());
                    tracing::debug!(%pubkey, error = %error, "rates probe failed");
                    samples.push(StatusSample {
                        public_key: pubkey.clone(),
                        is_online: false,
                    });
                }
                Err(_) => {
                    record_liveness_probe(false, started.elapsed());
                    tracing::debug!(%pubkey, "rates probe timed out");
                    samples.push(StatusSample {
                        public_key: pubkey.clone(),
                        is_online: false,
                    });
                }
            }
        }

        for chunk in samples.chunks(self.batch_size) {
            self.providers.add_statuses(chunk).await?;
        }
        for chunk in prices.chunks(self.batch_size) {
            self.providers.update_prices(chunk).await?;
        }

        tracing::info!(
            probed = samples.len(),
            online = prices.len(),
            "updated known providers"
        );

        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use mtp_peer::StorageRates;

    use super::*;
    use crate::periodic::tasks::testutil::{MockPeer, MockStore};

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    fn store_with_provider() -> Arc<MockStore> {
        let store = MockStore::default();
        store.pubkeys.lock().unwrap().push(KEY_A.to_string());
        Arc::new(store)
    }

    #[tokio::test]
    async fn online_provider_yields_status_and_price() {
        let store = store_with_provider();
        let mut peer = MockPeer::default();
        peer.rates.insert(
            KEY_A.to_string(),
            StorageRates {
                available: true,
                rate_per_mb_day: 1_000_000,
                min_bounty: 50_000_000,
                min_span: 3600,
                max_span: 86400,
                space_available_mb: 1024,
            },
        );

        let task = LivenessTask::new(Arc::clone(&store) as _, Arc::new(peer), 100);
        task.execute(&CancellationToken::new()).await.unwrap();

        let samples = store.status_samples.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].len(), 1);
        assert!(samples[0][0].is_online);

        let prices = store.price_updates.lock().unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].rate_per_mb_per_day, 1_000_000);
        assert_eq!(prices[0].max_span, 86400);
    }

    #[tokio::test]
    async fn failing_probe_marks_offline_without_price_update() {
        let store = store_with_provider();
        let peer = MockPeer::default();

        let task = LivenessTask::new(Arc::clone(&store) as _, Arc::new(peer), 100);
        task.execute(&CancellationToken::new()).await.unwrap();

        let samples = store.status_samples.lock().unwrap();
        assert_eq!(samples[0].len(), 1);
        assert!(!samples[0][0].is_online);
        assert!(store.price_updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn liveness_flip_keeps_price_untouched_on_second_tick() {
        let store = store_with_provider();

        let mut online_peer = MockPeer::default();
        online_peer.rates.insert(
            KEY_A.to_string(),
            StorageRates {
                available: true,
                rate_per_mb_day: 42,
                min_bounty: 1,
                min_span: 60,
                max_span: 600,
                space_available_mb: 1,
            },
        );

        LivenessTask::new(Arc::clone(&store) as _, Arc::new(online_peer), 100)
            .execute(&CancellationToken::new())
            .await
            .unwrap();

        LivenessTask::new(Arc::clone(&store) as _, Arc::new(MockPeer::default()), 100)
            .execute(&CancellationToken::new())
            .await
            .unwrap();

        let samples = store.status_samples.lock().unwrap();
        assert!(samples[0][0].is_online);
        assert!(!samples[1][0].is_online);
        // Only the first tick touched the commercial terms.
        assert_eq!(store.price_updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_between_providers() {
        let store = store_with_provider();
        store.pubkeys.lock().unwrap().push(
            "cc5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964".to_string(),
        );

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        LivenessTask::new(Arc::clone(&store) as _, Arc::new(MockPeer::default()), 100)
            .execute(&shutdown)
            .await
            .unwrap();

        // Cancelled before the first probe: nothing persisted.
        assert!(store.status_samples.lock().unwrap().is_empty());
    }
}
