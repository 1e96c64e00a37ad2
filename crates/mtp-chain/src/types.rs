use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One account transaction with its in-message already unpacked by the
/// gateway. `op` is the first 32 bits of the payload, `message` the snake
/// comment when the payload decodes as text.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub lt: u64,
    #[serde(default)]
    pub op: u32,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageContractInfo {
    pub address: String,
    /// 64-hex lowercase torrent hash.
    pub bag_id: String,
    pub owner_address: String,
    pub size: u64,
    pub chunk_size: u64,
}

/// One provider slot on a storage contract, as stored on-chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOnContract {
    /// 64-hex provider public key.
    pub key: String,
    /// Unix seconds of the last accepted proof; 0 when none yet.
    pub last_proof_time: i64,
    pub rate_per_mb_day: u64,
    pub max_span: u32,
}

#[derive(Debug, Clone)]
pub struct ContractProviders {
    pub address: String,
    /// Contract balance in nanotons.
    pub balance: u64,
    pub providers: Vec<ProviderOnContract>,
    /// Set when the gateway could not answer for this contract; the entry is
    /// kept so callers can tell "empty" from "unknown".
    pub lite_server_error: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountState {
    pub last_tx_lt: u64,
    pub last_tx_hash: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Cursor of the page that precedes this one in the chain walk, absent
    /// once the genesis of the account is reached.
    pub prev_lt: Option<u64>,
    pub prev_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContractProvidersResponse {
    pub balance: u64,
    pub providers: Vec<ProviderOnContract>,
}
