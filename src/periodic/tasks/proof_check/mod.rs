//! Proof verification pipeline: prune relations the chain dropped, refresh
//! provider addresses through the DHT, then challenge every provider for a
//! random piece of every bag it holds.

mod pieces;
mod prune;
mod resolve;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use mtp_observability::record_proof_stage;

use crate::{
    error::NodeError,
    periodic::deps::{ChainApi, PeerApi, ProviderStore},
    types::ReasonCode,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(15);

pub(crate) struct ProofCheckTask {
    providers: Arc<dyn ProviderStore>,
    chain: Arc<dyn ChainApi>,
    peer: Arc<dyn PeerApi>,
}

impl ProofCheckTask {
    pub(crate) fn new(
        providers: Arc<dyn ProviderStore>,
        chain: Arc<dyn ChainApi>,
        peer: Arc<dyn PeerApi>,
    ) -> Self {
        Self {
            providers,
            chain,
            peer,
        }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("proof_check", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    /// Stages run in order and persist as they go: a failure in a later
    /// stage leaves earlier writes committed, and the next tick resumes
    /// from fresh state.
    #[tracing::instrument(name = "periodic.proof_check", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let relations = self.providers.get_relations().await?;

        let stage = Instant::now();
        let active = match prune::prune_rejected(
            self.chain.as_ref(),
            self.providers.as_ref(),
            relations,
        )
        .await
        {
            Ok(active) => {
                record_proof_stage("prune", "ok", stage.elapsed());
                active
            }
            Err(error) => {
                record_proof_stage("prune", "error", stage.elapsed());
                return Err(error);
            }
        };

        let stage = Instant::now();
        let endpoints = match resolve::resolve_provider_addresses(
            Arc::clone(&self.peer),
            self.providers.as_ref(),
            &active,
        )
        .await
        {
            Ok(endpoints) => {
                record_proof_stage("resolve", "ok", stage.elapsed());
                endpoints
            }
            Err(error) => {
                record_proof_stage("resolve", "error", stage.elapsed());
                return Err(error);
            }
        };

        let stage = Instant::now();
        let updates = pieces::check_pieces(Arc::clone(&self.peer), &active, &endpoints).await;
        record_proof_stage("pieces", "ok", stage.elapsed());

        let valid = updates
            .iter()
            .filter(|u| u.reason == ReasonCode::ValidStorageProof.as_i16())
            .count();

        let stage = Instant::now();
        if let Err(error) = self.providers.update_proof_checks(&updates).await {
            record_proof_stage("persist", "error", stage.elapsed());
            return Err(error);
        }
        if let Err(error) = self.providers.update_statuses().await {
            record_proof_stage("persist", "error", stage.elapsed());
            return Err(error);
        }
        record_proof_stage("persist", "ok", stage.elapsed());

        tracing::info!(
            checked = updates.len(),
            valid,
            "updated contract proof checks"
        );

        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use mtp_chain::{ContractProviders, ProviderOnContract};
    use mtp_peer::{TorrentInfo, merkle};
    use mtp_repository::ContractRelation;

    use super::*;
    use crate::periodic::tasks::testutil::{MockChain, MockPeer, MockStore, SessionScript};

    const KEY_P: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";
    const CONTRACT: &str = "EQ-contract-x";
    const PROVIDER_WALLET: &str = "EQ-provider-wallet";

    /// Builds a bag with one piece whose torrent info hashes to the bag id.
    /// Returns (bag_id_hex, torrent_info_bytes, piece_proof_bytes).
    fn valid_bag() -> (String, Vec<u8>, Vec<u8>) {
        let leaf = merkle::piece_leaf_hash(0, b"the only piece");
        let root = merkle::root_from_leaves(&[leaf]);

        let info = TorrentInfo {
            piece_size: 1024,
            file_size: 1024,
            root_hash: root,
            header_size: 0,
            description: "bag".to_string(),
        };

        let bag_id = hex::encode(info.digest().unwrap());
        let proof = merkle::proof_for_leaf(&[leaf], 0).unwrap();

        (
            bag_id,
            info.to_bytes().unwrap(),
            proof.to_bytes().unwrap(),
        )
    }

    fn relation(bag_id: &str) -> ContractRelation {
        ContractRelation {
            provider_public_key: KEY_P.to_string(),
            provider_address: PROVIDER_WALLET.to_string(),
            contract_address: CONTRACT.to_string(),
            bag_id: bag_id.to_string(),
            size: 1024,
        }
    }

    fn chain_backing_relation() -> MockChain {
        let mut chain = MockChain::default();
        chain.providers_info = vec![ContractProviders {
            address: CONTRACT.to_string(),
            balance: u64::MAX,
            providers: vec![ProviderOnContract {
                key: KEY_P.to_string(),
                last_proof_time: 0,
                rate_per_mb_day: 1,
                max_span: 86400,
            }],
            lite_server_error: false,
        }];
        chain
    }

    fn store_with_relation(bag_id: &str) -> Arc<MockStore> {
        let store = MockStore::default();
        store.relations.lock().unwrap().push(relation(bag_id));
        Arc::new(store)
    }

    #[tokio::test]
    async fn valid_piece_yields_valid_storage_proof() {
        let (bag_id, info_bytes, proof_bytes) = valid_bag();
        let store = store_with_relation(&bag_id);
        let mut peer = MockPeer::default();
        peer.sessions.insert(
            KEY_P.to_string(),
            SessionScript {
                ping_ok: true,
                torrent_info: Some(info_bytes),
                piece_proof: Some(proof_bytes),
            },
        );

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain_backing_relation()),
            Arc::new(peer),
        );
        task.execute().await.unwrap();

        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].contract_address, CONTRACT);
        assert_eq!(checks[0].reason, ReasonCode::ValidStorageProof.as_i16());
        assert_eq!(*store.status_aggregations.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn mismatched_info_hash_yields_invalid_header() {
        let (_, info_bytes, proof_bytes) = valid_bag();
        // The relation claims a different bag id than the served info hashes to.
        let other_bag = hex::encode([9u8; 32]);
        let store = store_with_relation(&other_bag);

        let mut peer = MockPeer::default();
        peer.sessions.insert(
            KEY_P.to_string(),
            SessionScript {
                ping_ok: true,
                torrent_info: Some(info_bytes),
                piece_proof: Some(proof_bytes),
            },
        );

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain_backing_relation()),
            Arc::new(peer),
        );
        task.execute().await.unwrap();

        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].reason, ReasonCode::InvalidHeader.as_i16());
    }

    #[tokio::test]
    async fn forged_proof_yields_proof_check_failed() {
        let (bag_id, info_bytes, _) = valid_bag();
        let forged = merkle::proof_for_leaf(&[merkle::piece_leaf_hash(0, b"another piece")], 0)
            .unwrap()
            .to_bytes()
            .unwrap();

        let store = store_with_relation(&bag_id);
        let mut peer = MockPeer::default();
        peer.sessions.insert(
            KEY_P.to_string(),
            SessionScript {
                ping_ok: true,
                torrent_info: Some(info_bytes),
                piece_proof: Some(forged),
            },
        );

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain_backing_relation()),
            Arc::new(peer),
        );
        task.execute().await.unwrap();

        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks[0].reason, ReasonCode::ProofCheckFailed.as_i16());
    }

    #[tokio::test]
    async fn unresolvable_provider_is_marked_ip_not_found() {
        let (bag_id, _, _) = valid_bag();
        let store = store_with_relation(&bag_id);
        // No session fixture: DHT resolution fails for this provider.
        let peer = MockPeer::default();

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain_backing_relation()),
            Arc::new(peer),
        );
        task.execute().await.unwrap();

        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].reason, ReasonCode::IpNotFound.as_i16());
    }

    #[tokio::test]
    async fn underfunded_stale_provider_is_pruned() {
        let (bag_id, _, _) = valid_bag();
        let store = store_with_relation(&bag_id);

        let mut chain = MockChain::default();
        chain.providers_info = vec![ContractProviders {
            address: CONTRACT.to_string(),
            balance: 0,
            providers: vec![ProviderOnContract {
                key: KEY_P.to_string(),
                // Proved long ago, span exhausted, balance empty.
                last_proof_time: 1,
                rate_per_mb_day: 1_000_000,
                max_span: 60,
            }],
            lite_server_error: false,
        }];

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain),
            Arc::new(MockPeer::default()),
        );
        task.execute().await.unwrap();

        assert_eq!(store.rejected.lock().unwrap().len(), 1);
        assert!(store.proof_checks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lite_server_error_keeps_relations_active() {
        let (bag_id, _, _) = valid_bag();
        let store = store_with_relation(&bag_id);

        let mut chain = MockChain::default();
        chain.providers_info = vec![ContractProviders {
            address: CONTRACT.to_string(),
            balance: 0,
            providers: Vec::new(),
            lite_server_error: true,
        }];

        let task = ProofCheckTask::new(
            Arc::clone(&store) as _,
            Arc::new(chain),
            Arc::new(MockPeer::default()),
        );
        task.execute().await.unwrap();

        // The relation survives the prune and falls through to an address
        // failure instead of being rejected.
        assert!(store.rejected.lock().unwrap().is_empty());
        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].reason, ReasonCode::IpNotFound.as_i16());
    }

    #[tokio::test]
    async fn dead_provider_short_circuits_remaining_bags() {
        let (bag_id, _, _) = valid_bag();

        let store = MockStore::default();
        {
            let mut relations = store.relations.lock().unwrap();
            for i in 0..5 {
                let mut r = relation(&bag_id);
                r.contract_address = format!("EQ-contract-{i}");
                relations.push(r);
            }
        }
        let store = Arc::new(store);

        let mut chain = MockChain::default();
        chain.providers_info = (0..5)
            .map(|i| ContractProviders {
                address: format!("EQ-contract-{i}"),
                balance: u64::MAX,
                providers: vec![ProviderOnContract {
                    key: KEY_P.to_string(),
                    last_proof_time: 0,
                    rate_per_mb_day: 1,
                    max_span: 86400,
                }],
                lite_server_error: false,
            })
            .collect();

        let mut peer = MockPeer::default();
        peer.sessions.insert(
            KEY_P.to_string(),
            SessionScript {
                ping_ok: false,
                torrent_info: None,
                piece_proof: None,
            },
        );

        let task = ProofCheckTask::new(Arc::clone(&store) as _, Arc::new(chain), Arc::new(peer));
        task.execute().await.unwrap();

        let checks = store.proof_checks.lock().unwrap();
        assert_eq!(checks.len(), 5);

        // With 5 contracts the failure threshold is zero: one ping failure
        // writes the provider off for the rest of the tick.
        let ping_failures = checks
            .iter()
            .filter(|c| c.reason == ReasonCode::PingFailed.as_i16())
            .count();
        let skipped = checks
            .iter()
            .filter(|c| c.reason == ReasonCode::UnavailableProvider.as_i16())
            .count();
        assert_eq!(ping_failures, 1);
        assert_eq!(skipped, 4);
    }
}
