use std::{sync::Arc, time::Duration};

use crate::{
    config::PeerClientConfig,
    dht::DhtClient,
    error::{PeerError, Result},
    gateway::Gateway,
    key_id,
    proto::{Request, Response, StorageRates},
};

/// High-level queries against provider daemons. Each call resolves the
/// daemon through the DHT and opens a fresh session; the registry probes
/// hundreds of providers per tick, so caching sessions here would only pin
/// dead connections.
pub struct ProviderTransport {
    gateway: Arc<Gateway>,
    dht: Arc<DhtClient>,
    query_timeout: Duration,
}

impl ProviderTransport {
    pub fn new(gateway: Arc<Gateway>, dht: Arc<DhtClient>, config: &PeerClientConfig) -> Self {
        Self {
            gateway,
            dht,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        }
    }

    /// Probes a provider daemon for its current terms. `fake_size` is the
    /// advertised bag size; liveness probes pass 1 byte.
    pub async fn get_storage_rates(
        &self,
        provider_key: &[u8; 32],
        fake_size: u64,
    ) -> Result<StorageRates> {
        let mut conn = self.connect_provider(provider_key).await?;
        match conn
            .query(
                "get_storage_rates",
                &Request::GetStorageRates { fake_size },
                self.query_timeout,
            )
            .await?
        {
            Response::StorageRates(rates) => Ok(rates),
            _ => Err(PeerError::UnexpectedResponse),
        }
    }

    /// Asks the provider daemon to prove it runs the storage node serving
    /// `contract_address`. The returned bytes are the DHT lookup key for
    /// that storage node's address list.
    pub async fn verify_storage_adnl_proof(
        &self,
        provider_key: &[u8; 32],
        contract_address: &str,
    ) -> Result<Vec<u8>> {
        let mut conn = self.connect_provider(provider_key).await?;
        match conn
            .query(
                "verify_storage_proof",
                &Request::VerifyStorageProof {
                    contract_address: contract_address.to_string(),
                },
                self.query_timeout,
            )
            .await?
        {
            Response::StorageProof { proof } => Ok(proof),
            _ => Err(PeerError::UnexpectedResponse),
        }
    }

    async fn connect_provider(
        &self,
        provider_key: &[u8; 32],
    ) -> Result<crate::gateway::PeerConnection> {
        let lookup = key_id(provider_key);
        let (list, node_key) = self.dht.find_addresses(&lookup).await?;

        let addr = list
            .addresses
            .first()
            .ok_or_else(|| PeerError::Dht("empty address list for provider".to_string()))?;

        self.gateway
            .connect(&addr.to_socket_string(), node_key)
            .await
    }
}
