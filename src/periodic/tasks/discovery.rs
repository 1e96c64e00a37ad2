use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use mtp_observability::record_discovery_cycle;
use mtp_repository::ProviderCreate;

use crate::{
    error::NodeError,
    periodic::deps::{ChainApi, ProviderStore, SystemStore},
    types::{LAST_LT_KEY, parse_registration_memo},
    utils::with_timeout,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

const GET_TX_TIMEOUT: Duration = Duration::from_secs(20);

/// Scans the master wallet for registration transactions and inserts the
/// providers they announce. The wallet cursor advances by the highest LT in
/// the batch, so each transaction is considered for registration at most
/// once even across crashes.
pub(crate) struct DiscoveryTask {
    providers: Arc<dyn ProviderStore>,
    system: Arc<dyn SystemStore>,
    chain: Arc<dyn ChainApi>,
    master_address: String,
}

impl DiscoveryTask {
    pub(crate) fn new(
        providers: Arc<dyn ProviderStore>,
        system: Arc<dyn SystemStore>,
        chain: Arc<dyn ChainApi>,
        master_address: String,
    ) -> Self {
        Self {
            providers,
            system,
            chain,
            master_address,
        }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("discovery", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.discovery", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let started = std::time::Instant::now();

        let cursor = self
            .system
            .get_param(LAST_LT_KEY)
            .await?
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0);

        let known: HashSet<String> = self
            .providers
            .get_all_pubkeys()
            .await?
            .into_iter()
            .map(|key| key.to_lowercase())
            .collect();

        let txs = with_timeout(
            "master wallet transaction scan",
            GET_TX_TIMEOUT,
            self.chain.get_transactions(&self.master_address, cursor),
        )
        .await
        .inspect_err(|_| record_discovery_cycle("error", 0, started.elapsed()))?;

        let mut unique: HashMap<String, ProviderCreate> = HashMap::new();
        let mut biggest_lt = cursor;

        for tx in &txs {
            if tx.lt <= cursor {
                continue;
            }
            if biggest_lt < tx.lt {
                biggest_lt = tx.lt;
            }

            let Some(key) = parse_registration_memo(&tx.message) else {
                continue;
            };
            if known.contains(key.as_str()) {
                continue;
            }

            unique.insert(
                key.as_str().to_string(),
                ProviderCreate {
                    public_key: key.as_str().to_string(),
                    address: tx.from.clone(),
                    registered_at: tx.created_at,
                },
            );
        }

        if unique.is_empty() {
            record_discovery_cycle("ok", 0, started.elapsed());
            return Ok(SUCCESS_INTERVAL);
        }

        if biggest_lt > cursor
            && let Err(error) = self
                .system
                .set_param(LAST_LT_KEY, &biggest_lt.to_string())
                .await
        {
            tracing::error!(error = %error, "cannot update master wallet cursor");
        }

        let new_providers: Vec<ProviderCreate> = unique.into_values().collect();
        self.providers.add_providers(&new_providers).await?;

        tracing::info!(count = new_providers.len(), "collected new providers");
        record_discovery_cycle("ok", new_providers.len(), started.elapsed());

        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{TimeZone, Utc};
    use mtp_chain::Transaction;

    use super::*;
    use crate::periodic::tasks::testutil::{MockChain, MockStore, MockSystem};

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";
    const KEY_B: &str = "bb5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";
    const MASTER: &str = "EQ-master";

    fn registration_tx(lt: u64, memo: String) -> Transaction {
        Transaction {
            hash: format!("{lt:02x}"),
            lt,
            op: 0,
            from: format!("EQ-wallet-{lt}"),
            to: MASTER.to_string(),
            message: memo,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn task(store: &Arc<MockStore>, system: &Arc<MockSystem>, txs: Vec<Transaction>) -> DiscoveryTask {
        let mut chain = MockChain::default();
        chain.txs.insert(MASTER.to_string(), txs);
        DiscoveryTask::new(
            Arc::clone(store) as Arc<dyn ProviderStore>,
            Arc::clone(system) as Arc<dyn SystemStore>,
            Arc::new(chain),
            MASTER.to_string(),
        )
    }

    #[tokio::test]
    async fn discovers_provider_and_advances_cursor() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());

        let interval = task(&store, &system, vec![registration_tx(10, format!("tsp-{KEY_A}"))])
            .execute()
            .await
            .unwrap();

        assert_eq!(interval, SUCCESS_INTERVAL);
        let added = store.added_providers.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].public_key, KEY_A);
        assert_eq!(added[0].address, "EQ-wallet-10");
        assert_eq!(
            system.params.lock().unwrap().get(LAST_LT_KEY),
            Some(&"10".to_string())
        );
    }

    #[tokio::test]
    async fn rerun_with_same_fixture_is_idempotent() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());

        for _ in 0..2 {
            task(&store, &system, vec![registration_tx(10, format!("tsp-{KEY_A}"))])
                .execute()
                .await
                .unwrap();
        }

        assert_eq!(store.added_providers.lock().unwrap().len(), 1);
        assert_eq!(
            system.params.lock().unwrap().get(LAST_LT_KEY),
            Some(&"10".to_string())
        );
    }

    #[tokio::test]
    async fn empty_batch_leaves_cursor_unset() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());

        task(&store, &system, Vec::new()).execute().await.unwrap();

        assert!(store.added_providers.lock().unwrap().is_empty());
        assert!(system.params.lock().unwrap().get(LAST_LT_KEY).is_none());
    }

    #[tokio::test]
    async fn malformed_memos_are_skipped() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());

        task(
            &store,
            &system,
            vec![
                registration_tx(5, "tsp-".to_string()),
                registration_tx(6, "tsp-nothex".to_string()),
                registration_tx(7, format!("tsp-{KEY_B}")),
            ],
        )
        .execute()
        .await
        .unwrap();

        let added = store.added_providers.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].public_key, KEY_B);
        // Cursor advanced past the malformed transactions too.
        assert_eq!(
            system.params.lock().unwrap().get(LAST_LT_KEY),
            Some(&"7".to_string())
        );
    }

    #[tokio::test]
    async fn duplicate_memos_in_one_batch_collapse() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());

        task(
            &store,
            &system,
            vec![
                registration_tx(5, format!("tsp-{KEY_A}")),
                registration_tx(6, format!("tsp-{KEY_A}")),
            ],
        )
        .execute()
        .await
        .unwrap();

        assert_eq!(store.added_providers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transactions_at_or_below_cursor_are_ignored() {
        let store = Arc::new(MockStore::default());
        let system = Arc::new(MockSystem::default());
        system
            .params
            .lock()
            .unwrap()
            .insert(LAST_LT_KEY.to_string(), "10".to_string());

        task(&store, &system, vec![registration_tx(10, format!("tsp-{KEY_A}"))])
            .execute()
            .await
            .unwrap();

        assert!(store.added_providers.lock().unwrap().is_empty());
        assert_eq!(
            system.params.lock().unwrap().get(LAST_LT_KEY),
            Some(&"10".to_string())
        );
    }
}
