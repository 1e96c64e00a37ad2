use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PeerError, Result};

/// A dialable peer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddr {
    pub ip: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn to_socket_string(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressList {
    pub addresses: Vec<NodeAddr>,
}

/// Commercial terms a provider daemon answers a rates probe with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRates {
    pub available: bool,
    pub rate_per_mb_day: u64,
    pub min_bounty: u64,
    pub min_span: u32,
    pub max_span: u32,
    pub space_available_mb: u64,
}

/// Bag metadata as served by a storage node. The bag id is the digest of
/// this structure, which is what the proof-check worker verifies first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    pub piece_size: u32,
    pub file_size: u64,
    pub root_hash: [u8; 32],
    pub header_size: u64,
    pub description: String,
}

impl TorrentInfo {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    /// Content digest of the serialized info; equals the bag id for an
    /// honestly served bag.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes()?);
        Ok(hasher.finalize().into())
    }
}

/// Raw torrent-info bytes as returned by a storage node; parsed and hashed
/// by the caller so a lying peer is caught there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfoContainer {
    pub data: Vec<u8>,
}

/// One step of a Merkle path, bottom to top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: [u8; 32],
    /// Whether the sibling sits to the right of the running hash.
    pub right: bool,
}

/// Merkle inclusion proof for a single piece of a bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceProof {
    pub piece_index: u64,
    pub leaf_hash: [u8; 32],
    pub path: Vec<ProofStep>,
}

impl PieceProof {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// A piece answer: the proof is mandatory, piece bytes are not needed by the
/// registry and stay opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub proof: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Request {
    Ping { nonce: u64 },
    GetStorageRates { fake_size: u64 },
    VerifyStorageProof { contract_address: String },
    GetTorrentInfo { overlay: [u8; 32] },
    GetPiece { overlay: [u8; 32], piece_id: u64 },
    DhtFindAddresses { key: Vec<u8> },
    DhtFindValue { key_id: [u8; 32], name: Vec<u8>, index: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Response {
    Pong { nonce: u64 },
    StorageRates(StorageRates),
    StorageProof { proof: Vec<u8> },
    TorrentInfo(TorrentInfoContainer),
    Piece(Piece),
    DhtAddresses { list: AddressList, public_key: [u8; 32] },
    DhtValue { data: Vec<u8> },
    Error { message: String },
}

impl Response {
    /// Unwraps a remote error into `PeerError::Remote`, passing everything
    /// else through for the caller to match on.
    pub(crate) fn into_ok(self) -> Result<Self> {
        match self {
            Response::Error { message } => Err(PeerError::Remote(message)),
            other => Ok(other),
        }
    }
}
