//! Stage B: refresh provider addresses through the DHT.

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::join_all;
use mtp_peer::{DhtKey, NodeAddr, key_id};
use mtp_repository::{ContractRelation, ProviderIpUpdate};
use tokio::sync::Semaphore;

use crate::{
    error::NodeError,
    periodic::deps::{PeerApi, ProviderStore},
    types::ProviderKey,
    utils::{try_n_times, with_timeout},
};

const MAX_CONCURRENT_RESOLVES: usize = 30;
const VERIFY_RETRIES: u32 = 3;
const VERIFY_RETRY_GAP: Duration = Duration::from_secs(1);
const VERIFY_TIMEOUT: Duration = Duration::from_secs(14);
const DHT_TIMEOUT: Duration = Duration::from_secs(14);
const PING_TIMEOUT: Duration = Duration::from_secs(7);

/// DHT record name under which provider daemons publish their address key.
const PROVIDER_DHT_NAME: &[u8] = b"storage-provider";

/// Where a provider can currently be reached: the storage node serving its
/// bags and the provider daemon itself.
#[derive(Debug, Clone)]
pub(super) struct ProviderEndpoints {
    pub storage_addr: NodeAddr,
    pub storage_key: [u8; 32],
    pub daemon_addr: NodeAddr,
}

/// Resolves each distinct provider in the active set. Providers that cannot
/// be resolved are simply absent from the returned map; stage C marks all
/// their relations accordingly. Resolved daemon addresses are persisted for
/// the geo pass.
pub(super) async fn resolve_provider_addresses(
    peer: Arc<dyn PeerApi>,
    providers: &dyn ProviderStore,
    relations: &[ContractRelation],
) -> Result<HashMap<String, ProviderEndpoints>, NodeError> {
    if relations.is_empty() {
        tracing::debug!("no storage contracts to process for address refresh");
        return Ok(HashMap::new());
    }

    let mut unique: HashMap<String, &ContractRelation> = HashMap::new();
    for relation in relations {
        unique
            .entry(relation.provider_public_key.to_lowercase())
            .or_insert(relation);
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_RESOLVES));

    let lookups = unique.iter().map(|(pubkey, relation)| {
        let peer = Arc::clone(&peer);
        let semaphore = Arc::clone(&semaphore);
        let pubkey = pubkey.clone();
        let contract_address = relation.contract_address.clone();

        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return None;
            };

            match resolve_one(peer.as_ref(), &pubkey, &contract_address).await {
                Ok(endpoints) => Some((pubkey, endpoints)),
                Err(error) => {
                    tracing::error!(provider_pubkey = %pubkey, error = %error, "failed to resolve provider addresses");
                    None
                }
            }
        }
    });

    let resolved: HashMap<String, ProviderEndpoints> =
        join_all(lookups).await.into_iter().flatten().collect();

    let ip_updates: Vec<ProviderIpUpdate> = resolved
        .iter()
        .map(|(pubkey, endpoints)| ProviderIpUpdate {
            public_key: pubkey.clone(),
            ip: endpoints.daemon_addr.ip.clone(),
            port: i32::from(endpoints.daemon_addr.port),
        })
        .collect();

    providers.update_ips(&ip_updates).await?;

    tracing::info!(count = resolved.len(), "updated provider addresses");

    Ok(resolved)
}

async fn resolve_one(
    peer: &dyn PeerApi,
    pubkey: &str,
    contract_address: &str,
) -> Result<ProviderEndpoints, NodeError> {
    let key = ProviderKey::parse(pubkey)
        .ok_or_else(|| NodeError::Other(format!("invalid provider pubkey: {pubkey}")))?;
    let key_bytes = key.to_bytes();

    let (storage_addr, storage_key) = find_storage_addr(peer, key_bytes, contract_address).await?;
    let daemon_addr = find_daemon_addr(peer, key_bytes).await?;

    Ok(ProviderEndpoints {
        storage_addr,
        storage_key,
        daemon_addr,
    })
}

/// The provider daemon proves which storage node serves the contract; the
/// proof doubles as the DHT lookup key for that node's address list.
async fn find_storage_addr(
    peer: &dyn PeerApi,
    key_bytes: [u8; 32],
    contract_address: &str,
) -> Result<(NodeAddr, [u8; 32]), NodeError> {
    let proof = try_n_times(VERIFY_RETRIES, VERIFY_RETRY_GAP, || {
        with_timeout(
            "storage proof verification",
            VERIFY_TIMEOUT,
            peer.verify_storage_adnl_proof(key_bytes, contract_address),
        )
    })
    .await?;

    let (list, public_key) = with_timeout(
        "storage address lookup",
        DHT_TIMEOUT,
        peer.dht_find_addresses(&proof),
    )
    .await?;

    let addr = list
        .addresses
        .into_iter()
        .next()
        .ok_or_else(|| NodeError::Other("no storage addresses found".to_string()))?;

    Ok((addr, public_key))
}

/// Resolves the provider daemon through its published DHT record and keeps
/// the first address that answers a ping.
async fn find_daemon_addr(peer: &dyn PeerApi, key_bytes: [u8; 32]) -> Result<NodeAddr, NodeError> {
    let record = with_timeout(
        "provider record lookup",
        DHT_TIMEOUT,
        peer.dht_find_value(DhtKey {
            id: key_id(&key_bytes),
            name: PROVIDER_DHT_NAME.to_vec(),
            index: 0,
        }),
    )
    .await?;

    if record.is_empty() {
        return Err(NodeError::Other(
            "empty provider record in dht".to_string(),
        ));
    }

    let (list, public_key) = with_timeout(
        "provider address lookup",
        DHT_TIMEOUT,
        peer.dht_find_addresses(&record),
    )
    .await?;

    for addr in list.addresses {
        match peer.probe_addr(&addr, public_key, PING_TIMEOUT).await {
            Ok(()) => return Ok(addr),
            Err(error) => {
                tracing::debug!(addr = %addr.to_socket_string(), error = %error, "daemon address unreachable");
            }
        }
    }

    Err(NodeError::Other(
        "no reachable provider addresses found".to_string(),
    ))
}
