use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::join_all;
use mtp_observability::record_contract_scan;
use mtp_repository::{ProviderWalletCursor, StorageContractUpsert, WalletCursorUpdate};

use crate::{
    error::NodeError,
    periodic::deps::{ChainApi, ProviderStore},
    types::STORAGE_REWARD_WITHDRAWAL_OP,
    utils::with_timeout,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(15);

const GET_TX_TIMEOUT: Duration = Duration::from_secs(20);

/// A contract observed while scanning wallets, before on-chain enrichment.
#[derive(Debug)]
struct ScannedContract {
    provider_addresses: HashSet<String>,
    last_tx_lt: u64,
}

/// Derives the set of storage contracts per provider by scanning each
/// wallet for reward-withdrawal transactions: the sender of such a message
/// is a storage contract that provider serves.
pub(crate) struct ContractSyncTask {
    providers: Arc<dyn ProviderStore>,
    chain: Arc<dyn ChainApi>,
}

impl ContractSyncTask {
    pub(crate) fn new(providers: Arc<dyn ProviderStore>, chain: Arc<dyn ChainApi>) -> Self {
        Self { providers, chain }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown(
            "contract_sync",
            shutdown,
            FAILURE_INTERVAL,
            || self.execute(),
        )
        .await;
    }

    #[tracing::instrument(name = "periodic.contract_sync", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let started = Instant::now();
        let wallets = self.providers.get_wallets().await?;

        // One scan future per wallet; the chain client's own request pool
        // bounds how many run against the gateway at once.
        let scans = join_all(wallets.iter().map(|wallet| self.scan_wallet(wallet))).await;

        let mut contracts: HashMap<String, ScannedContract> = HashMap::new();
        let mut cursor_updates = Vec::new();

        for (wallet, scan) in wallets.iter().zip(scans) {
            let (scanned, last_lt) = match scan {
                Ok(result) => result,
                Err(error) => {
                    tracing::error!(address = %wallet.address, error = %error, "failed to scan provider transactions");
                    continue;
                }
            };

            for (address, found) in scanned {
                match contracts.get_mut(&address) {
                    Some(existing) => {
                        existing.provider_addresses.extend(found.provider_addresses);
                        if existing.last_tx_lt < found.last_tx_lt {
                            existing.last_tx_lt = found.last_tx_lt;
                        }
                    }
                    None => {
                        contracts.insert(address, found);
                    }
                }
            }

            if last_lt != wallet.last_tx_lt as u64 {
                cursor_updates.push(WalletCursorUpdate {
                    public_key: wallet.public_key.clone(),
                    last_tx_lt: last_lt as i64,
                });
            }
        }

        if contracts.is_empty() {
            record_contract_scan("ok", 0, started.elapsed());
            return Ok(SUCCESS_INTERVAL);
        }

        let addresses: Vec<String> = contracts.keys().cloned().collect();
        let infos = self
            .chain
            .get_storage_contracts_info(&addresses)
            .await
            .inspect_err(|error| {
                tracing::error!(error = %error, "failed to get storage contracts info");
                record_contract_scan("error", 0, started.elapsed());
            })?;

        let mut upserts = Vec::with_capacity(infos.len());
        for info in infos {
            let Some(scanned) = contracts.get(&info.address) else {
                tracing::error!(address = %info.address, "storage contract not found in scanned transactions");
                continue;
            };

            upserts.push(StorageContractUpsert {
                address: info.address.clone(),
                provider_addresses: scanned.provider_addresses.iter().cloned().collect(),
                bag_id: info.bag_id,
                owner_address: info.owner_address,
                size: info.size as i64,
                chunk_size: info.chunk_size as i64,
                last_tx_lt: scanned.last_tx_lt as i64,
            });
        }

        self.providers.update_wallet_cursors(&cursor_updates).await?;
        self.providers.add_storage_contracts(&upserts).await?;

        tracing::info!(count = upserts.len(), "collected new storage contracts");
        record_contract_scan("ok", upserts.len(), started.elapsed());

        Ok(SUCCESS_INTERVAL)
    }

    /// Scans one wallet above its cursor. Returns the contracts seen and
    /// the highest LT observed.
    async fn scan_wallet(
        &self,
        wallet: &ProviderWalletCursor,
    ) -> Result<(HashMap<String, ScannedContract>, u64), NodeError> {
        let cursor = wallet.last_tx_lt as u64;
        let txs = with_timeout(
            "provider wallet transaction scan",
            GET_TX_TIMEOUT,
            self.chain.get_transactions(&wallet.address, cursor),
        )
        .await?;

        let mut contracts: HashMap<String, ScannedContract> = HashMap::new();
        let mut last_lt = cursor;

        for tx in txs {
            if tx.op != STORAGE_REWARD_WITHDRAWAL_OP {
                continue;
            }

            if tx.lt > last_lt {
                last_lt = tx.lt;
            }

            let entry = contracts
                .entry(tx.from.clone())
                .or_insert_with(|| ScannedContract {
                    provider_addresses: HashSet::new(),
                    last_tx_lt: tx.lt,
                });
            entry.provider_addresses.insert(wallet.address.clone());
            if entry.last_tx_lt < tx.lt {
                entry.last_tx_lt = tx.lt;
            }
        }

        Ok((contracts, last_lt))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{TimeZone, Utc};
    use mtp_chain::{StorageContractInfo, Transaction};

    use super::*;
    use crate::periodic::tasks::testutil::{MockChain, MockStore};

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";
    const WALLET: &str = "EQ-provider-wallet";
    const BAG: &str = "cc5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    fn withdrawal_tx(lt: u64, from: &str) -> Transaction {
        Transaction {
            hash: format!("{lt:02x}"),
            lt,
            op: STORAGE_REWARD_WITHDRAWAL_OP,
            from: from.to_string(),
            to: WALLET.to_string(),
            message: String::new(),
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn contract_info(address: &str) -> StorageContractInfo {
        StorageContractInfo {
            address: address.to_string(),
            bag_id: BAG.to_string(),
            owner_address: "EQ-owner".to_string(),
            size: 4096,
            chunk_size: 128,
        }
    }

    #[tokio::test]
    async fn discovers_contracts_and_advances_wallet_cursor() {
        let store = Arc::new(MockStore::default());
        store.wallets.lock().unwrap().push(ProviderWalletCursor {
            public_key: KEY_A.to_string(),
            address: WALLET.to_string(),
            last_tx_lt: 0,
        });

        let mut chain = MockChain::default();
        chain.txs.insert(
            WALLET.to_string(),
            vec![withdrawal_tx(5, "EQ-contract-a"), withdrawal_tx(7, "EQ-contract-b")],
        );
        chain.contracts_info = vec![contract_info("EQ-contract-a"), contract_info("EQ-contract-b")];
        let chain = Arc::new(chain);

        let task = ContractSyncTask::new(Arc::clone(&store) as _, Arc::clone(&chain) as _);
        task.execute().await.unwrap();

        let upserts = store.contract_upserts.lock().unwrap();
        assert_eq!(upserts.len(), 2);
        for upsert in upserts.iter() {
            assert_eq!(upsert.provider_addresses, vec![WALLET.to_string()]);
            assert_eq!(upsert.bag_id, BAG);
        }

        let cursors = store.cursor_updates.lock().unwrap();
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].last_tx_lt, 7);

        // The chain client was asked about exactly the scanned senders.
        let calls = chain.contracts_info_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let mut asked = calls[0].clone();
        asked.sort();
        assert_eq!(asked, vec!["EQ-contract-a", "EQ-contract-b"]);
    }

    #[tokio::test]
    async fn non_withdrawal_transactions_are_ignored() {
        let store = Arc::new(MockStore::default());
        store.wallets.lock().unwrap().push(ProviderWalletCursor {
            public_key: KEY_A.to_string(),
            address: WALLET.to_string(),
            last_tx_lt: 0,
        });

        let mut chain = MockChain::default();
        let mut plain = withdrawal_tx(9, "EQ-someone");
        plain.op = 0;
        chain.txs.insert(WALLET.to_string(), vec![plain]);

        let task = ContractSyncTask::new(Arc::clone(&store) as _, Arc::new(chain));
        task.execute().await.unwrap();

        assert!(store.contract_upserts.lock().unwrap().is_empty());
        assert!(store.cursor_updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_contract_from_two_wallets_merges_providers() {
        let store = Arc::new(MockStore::default());
        {
            let mut wallets = store.wallets.lock().unwrap();
            wallets.push(ProviderWalletCursor {
                public_key: KEY_A.to_string(),
                address: "EQ-wallet-1".to_string(),
                last_tx_lt: 0,
            });
            wallets.push(ProviderWalletCursor {
                public_key: "bb5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964"
                    .to_string(),
                address: "EQ-wallet-2".to_string(),
                last_tx_lt: 0,
            });
        }

        let mut chain = MockChain::default();
        let mut tx1 = withdrawal_tx(3, "EQ-contract-a");
        tx1.to = "EQ-wallet-1".to_string();
        let mut tx2 = withdrawal_tx(8, "EQ-contract-a");
        tx2.to = "EQ-wallet-2".to_string();
        chain.txs.insert("EQ-wallet-1".to_string(), vec![tx1]);
        chain.txs.insert("EQ-wallet-2".to_string(), vec![tx2]);
        chain.contracts_info = vec![contract_info("EQ-contract-a")];

        let task = ContractSyncTask::new(Arc::clone(&store) as _, Arc::new(chain));
        task.execute().await.unwrap();

        let upserts = store.contract_upserts.lock().unwrap();
        assert_eq!(upserts.len(), 1);
        let mut addresses = upserts[0].provider_addresses.clone();
        addresses.sort();
        assert_eq!(addresses, vec!["EQ-wallet-1", "EQ-wallet-2"]);
        assert_eq!(upserts[0].last_tx_lt, 8);
    }
}
