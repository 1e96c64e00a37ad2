//! Shared in-memory fakes for the worker tests. Each mock records what was
//! written to it and serves whatever fixtures the test preloaded.

#![allow(clippy::unwrap_used)]

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use mtp_chain::{ContractProviders, StorageContractInfo, Transaction};
use mtp_geo::GeoInfo;
use mtp_peer::{
    AddressList, DhtKey, NodeAddr, Piece, StorageRates, TorrentInfoContainer,
};
use mtp_repository::{
    BenchmarkUpsert, ContractRelation, ProofCheckUpdate, ProviderCreate, ProviderGeoUpdate,
    ProviderIp, ProviderIpUpdate, ProviderPriceUpdate, ProviderWalletCursor, StatusSample,
    StorageContractUpsert, TelemetryUpsert, WalletCursorUpdate,
};

use crate::{
    error::NodeError,
    periodic::deps::{ChainApi, GeoApi, PeerApi, ProviderStore, StorageSession, SystemStore},
};

#[derive(Default)]
pub(crate) struct MockStore {
    pub pubkeys: Mutex<Vec<String>>,
    pub wallets: Mutex<Vec<ProviderWalletCursor>>,
    pub relations: Mutex<Vec<ContractRelation>>,
    pub provider_ips: Mutex<Vec<ProviderIp>>,

    pub added_providers: Mutex<Vec<ProviderCreate>>,
    pub cursor_updates: Mutex<Vec<WalletCursorUpdate>>,
    pub price_updates: Mutex<Vec<ProviderPriceUpdate>>,
    pub status_samples: Mutex<Vec<Vec<StatusSample>>>,
    pub contract_upserts: Mutex<Vec<StorageContractUpsert>>,
    pub rejected: Mutex<Vec<ContractRelation>>,
    pub proof_checks: Mutex<Vec<ProofCheckUpdate>>,
    pub ip_updates: Mutex<Vec<ProviderIpUpdate>>,
    pub geo_updates: Mutex<Vec<ProviderGeoUpdate>>,
    pub telemetry_items: Mutex<Vec<TelemetryUpsert>>,
    pub benchmark_items: Mutex<Vec<BenchmarkUpsert>>,

    pub status_aggregations: Mutex<u32>,
    pub uptime_rollups: Mutex<u32>,
    pub rating_recomputes: Mutex<u32>,
}

#[async_trait]
impl ProviderStore for MockStore {
    async fn get_all_pubkeys(&self) -> Result<Vec<String>, NodeError> {
        Ok(self.pubkeys.lock().unwrap().clone())
    }

    async fn add_providers(&self, providers: &[ProviderCreate]) -> Result<(), NodeError> {
        let mut added = self.added_providers.lock().unwrap();
        let mut pubkeys = self.pubkeys.lock().unwrap();
        for p in providers {
            if !pubkeys.contains(&p.public_key) {
                pubkeys.push(p.public_key.clone());
                added.push(p.clone());
            }
        }
        Ok(())
    }

    async fn get_wallets(&self) -> Result<Vec<ProviderWalletCursor>, NodeError> {
        Ok(self.wallets.lock().unwrap().clone())
    }

    async fn update_wallet_cursors(&self, cursors: &[WalletCursorUpdate]) -> Result<(), NodeError> {
        self.cursor_updates.lock().unwrap().extend_from_slice(cursors);
        Ok(())
    }

    async fn update_prices(&self, updates: &[ProviderPriceUpdate]) -> Result<(), NodeError> {
        self.price_updates.lock().unwrap().extend_from_slice(updates);
        Ok(())
    }

    async fn add_statuses(&self, samples: &[StatusSample]) -> Result<(), NodeError> {
        self.status_samples.lock().unwrap().push(samples.to_vec());
        Ok(())
    }

    async fn add_storage_contracts(
        &self,
        contracts: &[StorageContractUpsert],
    ) -> Result<(), NodeError> {
        self.contract_upserts
            .lock()
            .unwrap()
            .extend_from_slice(contracts);
        Ok(())
    }

    async fn get_relations(&self) -> Result<Vec<ContractRelation>, NodeError> {
        Ok(self.relations.lock().unwrap().clone())
    }

    async fn delete_rejected(&self, rejected: &[ContractRelation]) -> Result<u64, NodeError> {
        self.rejected.lock().unwrap().extend_from_slice(rejected);
        Ok(rejected.len() as u64)
    }

    async fn update_proof_checks(&self, checks: &[ProofCheckUpdate]) -> Result<(), NodeError> {
        self.proof_checks.lock().unwrap().extend_from_slice(checks);
        Ok(())
    }

    async fn update_ips(&self, ips: &[ProviderIpUpdate]) -> Result<(), NodeError> {
        self.ip_updates.lock().unwrap().extend_from_slice(ips);
        Ok(())
    }

    async fn get_provider_ips(&self) -> Result<Vec<ProviderIp>, NodeError> {
        Ok(self.provider_ips.lock().unwrap().clone())
    }

    async fn update_geo(&self, updates: &[ProviderGeoUpdate]) -> Result<(), NodeError> {
        self.geo_updates.lock().unwrap().extend_from_slice(updates);
        Ok(())
    }

    async fn update_telemetry(&self, items: &[TelemetryUpsert]) -> Result<(), NodeError> {
        self.telemetry_items.lock().unwrap().extend_from_slice(items);
        Ok(())
    }

    async fn update_benchmarks(&self, items: &[BenchmarkUpsert]) -> Result<(), NodeError> {
        self.benchmark_items.lock().unwrap().extend_from_slice(items);
        Ok(())
    }

    async fn update_statuses(&self) -> Result<(), NodeError> {
        *self.status_aggregations.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_uptime(&self) -> Result<(), NodeError> {
        *self.uptime_rollups.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_rating(&self) -> Result<(), NodeError> {
        *self.rating_recomputes.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockSystem {
    pub params: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SystemStore for MockSystem {
    async fn get_param(&self, key: &str) -> Result<Option<String>, NodeError> {
        Ok(self.params.lock().unwrap().get(key).cloned())
    }

    async fn set_param(&self, key: &str, value: &str) -> Result<(), NodeError> {
        self.params
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockChain {
    /// Transactions per account address; `get_transactions` serves the
    /// inclusive tail like the real client.
    pub txs: HashMap<String, Vec<Transaction>>,
    pub contracts_info: Vec<StorageContractInfo>,
    pub providers_info: Vec<ContractProviders>,

    pub contracts_info_calls: Mutex<Vec<Vec<String>>>,
    pub providers_info_calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ChainApi for MockChain {
    async fn get_transactions(
        &self,
        addr: &str,
        last_lt: u64,
    ) -> Result<Vec<Transaction>, NodeError> {
        Ok(self
            .txs
            .get(addr)
            .map(|txs| txs.iter().filter(|tx| tx.lt >= last_lt).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_storage_contracts_info(
        &self,
        addrs: &[String],
    ) -> Result<Vec<StorageContractInfo>, NodeError> {
        self.contracts_info_calls
            .lock()
            .unwrap()
            .push(addrs.to_vec());
        Ok(self
            .contracts_info
            .iter()
            .filter(|info| addrs.contains(&info.address))
            .cloned()
            .collect())
    }

    async fn get_providers_info(
        &self,
        addrs: &[String],
    ) -> Result<Vec<ContractProviders>, NodeError> {
        self.providers_info_calls
            .lock()
            .unwrap()
            .push(addrs.to_vec());
        Ok(self
            .providers_info
            .iter()
            .filter(|info| addrs.contains(&info.address))
            .cloned()
            .collect())
    }
}

/// Scripted behavior for one storage session in proof-check tests.
#[derive(Clone)]
pub(crate) struct SessionScript {
    pub ping_ok: bool,
    pub torrent_info: Option<Vec<u8>>,
    pub piece_proof: Option<Vec<u8>>,
}

pub(crate) struct MockSession {
    pub script: SessionScript,
}

#[async_trait]
impl StorageSession for MockSession {
    async fn reinit(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    fn is_stale(&self) -> bool {
        false
    }

    async fn ping(&mut self, _timeout: Duration) -> Result<(), NodeError> {
        if self.script.ping_ok {
            Ok(())
        } else {
            Err(NodeError::Peer(mtp_peer::PeerError::Timeout))
        }
    }

    async fn get_torrent_info(
        &mut self,
        _overlay: [u8; 32],
        _timeout: Duration,
    ) -> Result<TorrentInfoContainer, NodeError> {
        match &self.script.torrent_info {
            Some(data) => Ok(TorrentInfoContainer { data: data.clone() }),
            None => Err(NodeError::Peer(mtp_peer::PeerError::Timeout)),
        }
    }

    async fn get_piece(
        &mut self,
        _overlay: [u8; 32],
        _piece_id: u64,
        _timeout: Duration,
    ) -> Result<Piece, NodeError> {
        match &self.script.piece_proof {
            Some(proof) => Ok(Piece {
                proof: proof.clone(),
                data: Vec::new(),
            }),
            None => Err(NodeError::Peer(mtp_peer::PeerError::Timeout)),
        }
    }
}

/// Peer fake: rates per pubkey for liveness, DHT answers and session
/// scripts per provider for the proof pipeline.
#[derive(Default)]
pub(crate) struct MockPeer {
    pub rates: HashMap<String, StorageRates>,
    /// Providers that resolve through the DHT, mapped to a session script.
    pub sessions: HashMap<String, SessionScript>,

    pub probed: Mutex<Vec<String>>,
}

impl MockPeer {
    fn key_hex(key: &[u8; 32]) -> String {
        hex::encode(key)
    }
}

#[async_trait]
impl PeerApi for MockPeer {
    async fn get_storage_rates(
        &self,
        provider_key: [u8; 32],
        _fake_size: u64,
    ) -> Result<StorageRates, NodeError> {
        self.rates
            .get(&Self::key_hex(&provider_key))
            .cloned()
            .ok_or(NodeError::Peer(mtp_peer::PeerError::Timeout))
    }

    async fn verify_storage_adnl_proof(
        &self,
        provider_key: [u8; 32],
        _contract_address: &str,
    ) -> Result<Vec<u8>, NodeError> {
        let hex_key = Self::key_hex(&provider_key);
        if self.sessions.contains_key(&hex_key) {
            Ok(hex_key.into_bytes())
        } else {
            Err(NodeError::Peer(mtp_peer::PeerError::Timeout))
        }
    }

    async fn dht_find_addresses(
        &self,
        key: &[u8],
    ) -> Result<(AddressList, [u8; 32]), NodeError> {
        let hex_key = String::from_utf8_lossy(key).to_string();
        if self.sessions.contains_key(&hex_key) || hex_key.starts_with("daemon:") {
            Ok((
                AddressList {
                    addresses: vec![NodeAddr {
                        ip: "10.0.0.1".to_string(),
                        port: 17555,
                    }],
                },
                [7u8; 32],
            ))
        } else {
            Err(NodeError::Peer(mtp_peer::PeerError::Dht(
                "unknown key".to_string(),
            )))
        }
    }

    async fn dht_find_value(&self, key: DhtKey) -> Result<Vec<u8>, NodeError> {
        let _ = key;
        Ok(b"daemon:record".to_vec())
    }

    async fn probe_addr(
        &self,
        addr: &NodeAddr,
        _public_key: [u8; 32],
        _timeout: Duration,
    ) -> Result<(), NodeError> {
        self.probed.lock().unwrap().push(addr.to_socket_string());
        Ok(())
    }

    async fn connect_storage(
        &self,
        _addr: &NodeAddr,
        public_key: [u8; 32],
    ) -> Result<Box<dyn StorageSession>, NodeError> {
        let _ = public_key;
        // Proof-check tests key sessions by provider pubkey carried through
        // the DHT fixture; a single-session map also works since each test
        // uses one provider.
        let script = self
            .sessions
            .values()
            .next()
            .cloned()
            .ok_or(NodeError::Peer(mtp_peer::PeerError::Closed))?;
        Ok(Box::new(MockSession { script }))
    }
}

#[derive(Default)]
pub(crate) struct MockGeo {
    pub answers: HashMap<String, GeoInfo>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl GeoApi for MockGeo {
    async fn get_ip_info(&self, ip: &str) -> Result<GeoInfo, NodeError> {
        self.calls.lock().unwrap().push(ip.to_string());
        self.answers
            .get(ip)
            .cloned()
            .ok_or_else(|| NodeError::Other(format!("no geo fixture for {ip}")))
    }
}
