//! Interfaces the periodic workers consume, defined on the consumer side so
//! the library crates stay unaware of the worker layer. The impls at the
//! bottom bind the real repository manager and clients; tests substitute
//! hand-rolled mocks.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mtp_chain::{ChainClient, ContractProviders, StorageContractInfo, Transaction};
use mtp_geo::{GeoClient, GeoInfo};
use mtp_peer::{
    AddressList, DhtClient, DhtKey, Gateway, NodeAddr, PeerConnection, Piece, ProviderTransport,
    StorageRates, TorrentInfoContainer,
};
use mtp_repository::{
    BenchmarkUpsert, ContractRelation, ProofCheckUpdate, ProviderCreate, ProviderGeoUpdate,
    ProviderIp, ProviderIpUpdate, ProviderPriceUpdate, ProviderWalletCursor, RepositoryManager,
    StatusSample, StorageContractUpsert, TelemetryUpsert, WalletCursorUpdate,
};

use crate::error::NodeError;

type Result<T> = std::result::Result<T, NodeError>;

#[async_trait]
pub(crate) trait ProviderStore: Send + Sync {
    async fn get_all_pubkeys(&self) -> Result<Vec<String>>;
    async fn add_providers(&self, providers: &[ProviderCreate]) -> Result<()>;
    async fn get_wallets(&self) -> Result<Vec<ProviderWalletCursor>>;
    async fn update_wallet_cursors(&self, cursors: &[WalletCursorUpdate]) -> Result<()>;
    async fn update_prices(&self, updates: &[ProviderPriceUpdate]) -> Result<()>;
    async fn add_statuses(&self, samples: &[StatusSample]) -> Result<()>;
    async fn add_storage_contracts(&self, contracts: &[StorageContractUpsert]) -> Result<()>;
    async fn get_relations(&self) -> Result<Vec<ContractRelation>>;
    async fn delete_rejected(&self, rejected: &[ContractRelation]) -> Result<u64>;
    async fn update_proof_checks(&self, checks: &[ProofCheckUpdate]) -> Result<()>;
    async fn update_ips(&self, ips: &[ProviderIpUpdate]) -> Result<()>;
    async fn get_provider_ips(&self) -> Result<Vec<ProviderIp>>;
    async fn update_geo(&self, updates: &[ProviderGeoUpdate]) -> Result<()>;
    async fn update_telemetry(&self, items: &[TelemetryUpsert]) -> Result<()>;
    async fn update_benchmarks(&self, items: &[BenchmarkUpsert]) -> Result<()>;
    async fn update_statuses(&self) -> Result<()>;
    async fn update_uptime(&self) -> Result<()>;
    async fn update_rating(&self) -> Result<()>;
}

#[async_trait]
pub(crate) trait SystemStore: Send + Sync {
    async fn get_param(&self, key: &str) -> Result<Option<String>>;
    async fn set_param(&self, key: &str, value: &str) -> Result<()>;
}

#[async_trait]
pub(crate) trait ChainApi: Send + Sync {
    async fn get_transactions(&self, addr: &str, last_lt: u64) -> Result<Vec<Transaction>>;
    async fn get_storage_contracts_info(
        &self,
        addrs: &[String],
    ) -> Result<Vec<StorageContractInfo>>;
    async fn get_providers_info(&self, addrs: &[String]) -> Result<Vec<ContractProviders>>;
}

/// One open session against a storage node, used serially for all of a
/// provider's bags.
#[async_trait]
pub(crate) trait StorageSession: Send {
    async fn reinit(&mut self) -> Result<()>;
    fn is_stale(&self) -> bool;
    async fn ping(&mut self, timeout: Duration) -> Result<()>;
    async fn get_torrent_info(
        &mut self,
        overlay: [u8; 32],
        timeout: Duration,
    ) -> Result<TorrentInfoContainer>;
    async fn get_piece(
        &mut self,
        overlay: [u8; 32],
        piece_id: u64,
        timeout: Duration,
    ) -> Result<Piece>;
}

#[async_trait]
pub(crate) trait PeerApi: Send + Sync {
    async fn get_storage_rates(
        &self,
        provider_key: [u8; 32],
        fake_size: u64,
    ) -> Result<StorageRates>;
    async fn verify_storage_adnl_proof(
        &self,
        provider_key: [u8; 32],
        contract_address: &str,
    ) -> Result<Vec<u8>>;
    async fn dht_find_addresses(&self, key: &[u8]) -> Result<(AddressList, [u8; 32])>;
    async fn dht_find_value(&self, key: DhtKey) -> Result<Vec<u8>>;
    /// Opens a throwaway connection and pings it; used to pick the first
    /// reachable address from a DHT answer.
    async fn probe_addr(
        &self,
        addr: &NodeAddr,
        public_key: [u8; 32],
        timeout: Duration,
    ) -> Result<()>;
    async fn connect_storage(
        &self,
        addr: &NodeAddr,
        public_key: [u8; 32],
    ) -> Result<Box<dyn StorageSession>>;
}

#[async_trait]
pub(crate) trait GeoApi: Send + Sync {
    async fn get_ip_info(&self, ip: &str) -> Result<GeoInfo>;
}

/// Everything the periodic layer needs, wired once at bootstrap.
#[derive(Clone)]
pub(crate) struct PeriodicDeps {
    pub(crate) providers: Arc<dyn ProviderStore>,
    pub(crate) system: Arc<dyn SystemStore>,
    pub(crate) chain: Arc<dyn ChainApi>,
    pub(crate) peer: Arc<dyn PeerApi>,
    pub(crate) geo: Arc<dyn GeoApi>,
}

#[async_trait]
impl ProviderStore for RepositoryManager {
    async fn get_all_pubkeys(&self) -> Result<Vec<String>> {
        Ok(self.provider_repository().get_all_pubkeys().await?)
    }

    async fn add_providers(&self, providers: &[ProviderCreate]) -> Result<()> {
        Ok(self.provider_repository().add_providers(providers).await?)
    }

    async fn get_wallets(&self) -> Result<Vec<ProviderWalletCursor>> {
        Ok(self.provider_repository().get_wallets().await?)
    }

    async fn update_wallet_cursors(&self, cursors: &[WalletCursorUpdate]) -> Result<()> {
        Ok(self
            .provider_repository()
            .update_wallet_cursors(cursors)
            .await?)
    }

    async fn update_prices(&self, updates: &[ProviderPriceUpdate]) -> Result<()> {
        Ok(self.provider_repository().update_prices(updates).await?)
    }

    async fn add_statuses(&self, samples: &[StatusSample]) -> Result<()> {
        Ok(self.status_repository().add_statuses(samples).await?)
    }

    async fn add_storage_contracts(&self, contracts: &[StorageContractUpsert]) -> Result<()> {
        Ok(self
            .contract_repository()
            .add_storage_contracts(contracts)
            .await?)
    }

    async fn get_relations(&self) -> Result<Vec<ContractRelation>> {
        Ok(self.contract_repository().get_relations().await?)
    }

    async fn delete_rejected(&self, rejected: &[ContractRelation]) -> Result<u64> {
        Ok(self.contract_repository().delete_rejected(rejected).await?)
    }

    async fn update_proof_checks(&self, checks: &[ProofCheckUpdate]) -> Result<()> {
        Ok(self
            .contract_repository()
            .update_proof_checks(checks)
            .await?)
    }

    async fn update_ips(&self, ips: &[ProviderIpUpdate]) -> Result<()> {
        Ok(self.provider_repository().update_ips(ips).await?)
    }

    async fn get_provider_ips(&self) -> Result<Vec<ProviderIp>> {
        Ok(self.provider_repository().get_provider_ips().await?)
    }

    async fn update_geo(&self, updates: &[ProviderGeoUpdate]) -> Result<()> {
        Ok(self.provider_repository().update_geo(updates).await?)
    }

    async fn update_telemetry(&self, items: &[TelemetryUpsert]) -> Result<()> {
        Ok(self.telemetry_repository().upsert_telemetry(items).await?)
    }

    async fn update_benchmarks(&self, items: &[BenchmarkUpsert]) -> Result<()> {
        Ok(self.benchmark_repository().upsert_benchmarks(items).await?)
    }

    async fn update_statuses(&self) -> Result<()> {
        Ok(self.provider_repository().update_statuses().await?)
    }

    async fn update_uptime(&self) -> Result<()> {
        Ok(self.status_repository().update_uptime().await?)
    }

    async fn update_rating(&self) -> Result<()> {
        Ok(self.provider_repository().update_rating().await?)
    }
}

#[async_trait]
impl SystemStore for RepositoryManager {
    async fn get_param(&self, key: &str) -> Result<Option<String>> {
        Ok(self.system_repository().get_param(key).await?)
    }

    async fn set_param(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.system_repository().set_param(key, value).await?)
    }
}

#[async_trait]
impl ChainApi for ChainClient {
    async fn get_transactions(&self, addr: &str, last_lt: u64) -> Result<Vec<Transaction>> {
        Ok(ChainClient::get_transactions(self, addr, last_lt).await?)
    }

    async fn get_storage_contracts_info(
        &self,
        addrs: &[String],
    ) -> Result<Vec<StorageContractInfo>> {
        Ok(ChainClient::get_storage_contracts_info(self, addrs).await?)
    }

    async fn get_providers_info(&self, addrs: &[String]) -> Result<Vec<ContractProviders>> {
        Ok(ChainClient::get_providers_info(self, addrs).await?)
    }
}

#[async_trait]
impl GeoApi for GeoClient {
    async fn get_ip_info(&self, ip: &str) -> Result<GeoInfo> {
        Ok(GeoClient::get_ip_info(self, ip).await?)
    }
}

/// Concrete peer facade over the transport crate.
pub(crate) struct PeerFacade {
    gateway: Arc<Gateway>,
    dht: Arc<DhtClient>,
    transport: ProviderTransport,
}

impl PeerFacade {
    pub(crate) fn new(
        gateway: Arc<Gateway>,
        dht: Arc<DhtClient>,
        transport: ProviderTransport,
    ) -> Self {
        Self {
            gateway,
            dht,
            transport,
        }
    }
}

#[async_trait]
impl PeerApi for PeerFacade {
    async fn get_storage_rates(
        &self,
        provider_key: [u8; 32],
        fake_size: u64,
    ) -> Result<StorageRates> {
        Ok(self
            .transport
            .get_storage_rates(&provider_key, fake_size)
            .await?)
    }

    async fn verify_storage_adnl_proof(
        &self,
        provider_key: [u8; 32],
        contract_address: &str,
    ) -> Result<Vec<u8>> {
        Ok(self
            .transport
            .verify_storage_adnl_proof(&provider_key, contract_address)
            .await?)
    }

    async fn dht_find_addresses(&self, key: &[u8]) -> Result<(AddressList, [u8; 32])> {
        Ok(self.dht.find_addresses(key).await?)
    }

    async fn dht_find_value(&self, key: DhtKey) -> Result<Vec<u8>> {
        Ok(self.dht.find_value(&key).await?)
    }

    async fn probe_addr(
        &self,
        addr: &NodeAddr,
        public_key: [u8; 32],
        timeout: Duration,
    ) -> Result<()> {
        let mut conn = self
            .gateway
            .connect(&addr.to_socket_string(), public_key)
            .await?;
        Ok(conn.ping(timeout).await?)
    }

    async fn connect_storage(
        &self,
        addr: &NodeAddr,
        public_key: [u8; 32],
    ) -> Result<Box<dyn StorageSession>> {
        let conn = self
            .gateway
            .connect(&addr.to_socket_string(), public_key)
            .await?;
        Ok(Box::new(conn))
    }
}

#[async_trait]
impl StorageSession for PeerConnection {
    async fn reinit(&mut self) -> Result<()> {
        Ok(PeerConnection::reinit(self).await?)
    }

    fn is_stale(&self) -> bool {
        PeerConnection::is_stale(self)
    }

    async fn ping(&mut self, timeout: Duration) -> Result<()> {
        Ok(PeerConnection::ping(self, timeout).await?)
    }

    async fn get_torrent_info(
        &mut self,
        overlay: [u8; 32],
        timeout: Duration,
    ) -> Result<TorrentInfoContainer> {
        Ok(PeerConnection::get_torrent_info(self, overlay, timeout).await?)
    }

    async fn get_piece(
        &mut self,
        overlay: [u8; 32],
        piece_id: u64,
        timeout: Duration,
    ) -> Result<Piece> {
        Ok(PeerConnection::get_piece(self, overlay, piece_id, timeout).await?)
    }
}
