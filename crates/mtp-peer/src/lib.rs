//! Peer-side transport for the provider registry.
//!
//! Storage nodes and provider daemons are addressed by ed25519 public key.
//! This crate owns the framed TCP transport to them (`gateway`), the DHT
//! resolution of key → address list (`dht`), the high-level provider queries
//! the workers issue (`client`), and the piece-proof verification used by the
//! proof-check pipeline (`merkle`). Wire compatibility with the reference
//! protocol is explicitly out of scope; the message set mirrors its semantics.

mod client;
mod config;
mod dht;
mod error;
mod gateway;
pub mod merkle;
mod proto;

pub use client::ProviderTransport;
pub use config::{DhtSeed, PeerClientConfig};
pub use dht::{DhtClient, DhtKey};
pub use error::PeerError;
pub use gateway::{Gateway, PeerConnection};
pub use proto::{
    AddressList, NodeAddr, Piece, PieceProof, ProofStep, StorageRates, TorrentInfo,
    TorrentInfoContainer,
};

use sha2::{Digest, Sha256};

/// Stable identifier of an ed25519 public key on the network.
pub fn key_id(public_key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"pub.ed25519");
    hasher.update(public_key);
    hasher.finalize().into()
}

/// Overlay identifier for a bag: every piece query is addressed to the
/// overlay derived from the bag id, not to the bag id itself.
pub fn overlay_id(bag_id: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"pub.overlay");
    hasher.update(bag_id);
    hasher.finalize().into()
}
