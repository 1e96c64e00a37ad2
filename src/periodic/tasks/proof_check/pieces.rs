//! Stage C: one random piece check per (provider, bag).

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use futures::future::join_all;
use mtp_observability::record_proof_outcome;
use mtp_peer::{PeerError, TorrentInfo, merkle, overlay_id};
use mtp_repository::{ContractRelation, ProofCheckUpdate};
use rand::Rng;
use tokio::sync::Semaphore;

use super::resolve::ProviderEndpoints;
use crate::{
    error::NodeError,
    periodic::deps::{PeerApi, StorageSession},
    types::ReasonCode,
};

const MAX_CONCURRENT_PROVIDERS: usize = 30;
const PING_TIMEOUT: Duration = Duration::from_secs(7);
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// A provider failing this share of its contracts in a row is written off
/// for the rest of the tick.
const FAILURE_THRESHOLD_PERCENT: usize = 20;

/// Checks every provider's bags over one reused session per provider and
/// returns the proof outcome per relation.
pub(super) async fn check_pieces(
    peer: Arc<dyn PeerApi>,
    relations: &[ContractRelation],
    endpoints: &HashMap<String, ProviderEndpoints>,
) -> Vec<ProofCheckUpdate> {
    if relations.is_empty() {
        return Vec::new();
    }

    let mut by_provider: HashMap<String, Vec<ContractRelation>> = HashMap::new();
    for relation in relations {
        by_provider
            .entry(relation.provider_public_key.to_lowercase())
            .or_default()
            .push(relation.clone());
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PROVIDERS));

    let checks = by_provider.into_iter().map(|(pubkey, contracts)| {
        let peer = Arc::clone(&peer);
        let semaphore = Arc::clone(&semaphore);
        let endpoints = endpoints.get(&pubkey).cloned();

        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return Vec::new();
            };

            match endpoints {
                Some(endpoints) => check_provider(peer.as_ref(), &pubkey, &endpoints, contracts).await,
                None => fill_reason(&contracts, ReasonCode::IpNotFound),
            }
        }
    });

    let updates: Vec<ProofCheckUpdate> = join_all(checks).await.into_iter().flatten().collect();

    for update in &updates {
        record_proof_outcome(update.reason);
    }

    updates
}

fn fill_reason(contracts: &[ContractRelation], reason: ReasonCode) -> Vec<ProofCheckUpdate> {
    let now = Utc::now();
    contracts
        .iter()
        .map(|relation| ProofCheckUpdate {
            contract_address: relation.contract_address.clone(),
            provider_address: relation.provider_address.clone(),
            reason: reason.as_i16(),
            checked_at: now,
        })
        .collect()
}

async fn check_provider(
    peer: &dyn PeerApi,
    pubkey: &str,
    endpoints: &ProviderEndpoints,
    contracts: Vec<ContractRelation>,
) -> Vec<ProofCheckUpdate> {
    tracing::debug!(provider_pubkey = %pubkey, bags = contracts.len(), "start checking provider files");
    let started = std::time::Instant::now();

    let mut session = match peer
        .connect_storage(&endpoints.storage_addr, endpoints.storage_key)
        .await
    {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(provider_pubkey = %pubkey, error = %error, "failed to open storage session");
            return fill_reason(&contracts, ReasonCode::CantCreatePeer);
        }
    };

    let threshold = contracts.len() / 100 * FAILURE_THRESHOLD_PERCENT;
    let mut fails_in_a_row: usize = 0;
    let mut stats: HashMap<i16, usize> = HashMap::new();
    let mut updates = Vec::with_capacity(contracts.len());

    for relation in &contracts {
        let reason = if fails_in_a_row > threshold {
            tracing::info!(bag_id = %relation.bag_id, "skip");
            ReasonCode::UnavailableProvider
        } else {
            check_piece(session.as_mut(), &relation.bag_id).await
        };

        *stats.entry(reason.as_i16()).or_default() += 1;
        if reason == ReasonCode::ValidStorageProof {
            fails_in_a_row = 0;
        } else if reason != ReasonCode::UnavailableProvider {
            fails_in_a_row += 1;
        }

        updates.push(ProofCheckUpdate {
            contract_address: relation.contract_address.clone(),
            provider_address: relation.provider_address.clone(),
            reason: reason.as_i16(),
            checked_at: Utc::now(),
        });
    }

    for (reason, count) in stats {
        tracing::debug!(provider_pubkey = %pubkey, reason, count, "checked provider files");
    }
    tracing::debug!(
        provider_pubkey = %pubkey,
        elapsed_ms = started.elapsed().as_millis(),
        "finished checking provider files"
    );

    updates
}

/// Requests one randomly chosen piece of the bag and validates its Merkle
/// proof against the bag root. Each failure mode maps to its own reason so
/// operators can tell a dead peer from a lying one.
async fn check_piece(session: &mut dyn StorageSession, bag_id: &str) -> ReasonCode {
    // Sessions go quiet fast; refresh before each bag if needed.
    if session.is_stale()
        && let Err(error) = session.reinit().await
    {
        tracing::debug!(bag_id, error = %error, "session reinit failed");
        return ReasonCode::FailedInitialPing;
    }

    if let Err(error) = session.ping(PING_TIMEOUT).await {
        tracing::debug!(bag_id, error = %error, "ping to provider failed");
        return ReasonCode::PingFailed;
    }

    let bag: [u8; 32] = match hex::decode(bag_id) {
        Ok(raw) => match raw.try_into() {
            Ok(bag) => bag,
            Err(_) => return ReasonCode::InvalidBagId,
        },
        Err(error) => {
            tracing::debug!(bag_id, error = %error, "failed to decode bag id");
            return ReasonCode::InvalidBagId;
        }
    };

    let overlay = overlay_id(&bag);

    let container = match session.get_torrent_info(overlay, QUERY_TIMEOUT).await {
        Ok(container) => container,
        Err(NodeError::Peer(PeerError::UnexpectedResponse)) => return ReasonCode::UnknownPeer,
        Err(error) => {
            tracing::debug!(bag_id, error = %error, "failed to get torrent info from provider");
            return ReasonCode::GetInfoFailed;
        }
    };

    let info = match TorrentInfo::from_bytes(&container.data) {
        Ok(info) => info,
        Err(error) => {
            tracing::debug!(bag_id, error = %error, "failed to parse torrent info");
            return ReasonCode::InvalidHeader;
        }
    };

    match info.digest() {
        Ok(digest) if digest == bag => {}
        _ => {
            tracing::debug!(bag_id, "torrent info hash does not match bag id");
            return ReasonCode::InvalidHeader;
        }
    }

    let piece_count = if info.piece_size != 0 {
        info.file_size / u64::from(info.piece_size)
    } else {
        0
    };
    let piece_id = if piece_count != 0 {
        rand::thread_rng().gen_range(0..piece_count)
    } else {
        0
    };

    let piece = match session.get_piece(overlay, piece_id, QUERY_TIMEOUT).await {
        Ok(piece) => piece,
        Err(NodeError::Peer(PeerError::UnexpectedResponse)) => return ReasonCode::UnknownPeer,
        Err(error) => {
            tracing::debug!(bag_id, piece_id, error = %error, "failed to get piece from provider");
            return ReasonCode::CantGetPiece;
        }
    };

    let proof = match mtp_peer::PieceProof::from_bytes(&piece.proof) {
        Ok(proof) => proof,
        Err(error) => {
            tracing::debug!(bag_id, error = %error, "failed to parse piece proof");
            return ReasonCode::CantParseBoc;
        }
    };

    if let Err(error) = merkle::check_proof(&proof, &info.root_hash) {
        tracing::debug!(bag_id, error = %error, "proof check failed");
        return ReasonCode::ProofCheckFailed;
    }

    ReasonCode::ValidStorageProof
}
