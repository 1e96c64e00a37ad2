use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;

/// New provider extracted from a registration transaction.
#[derive(Debug, Clone)]
pub struct ProviderCreate {
    pub public_key: String,
    pub address: String,
    pub registered_at: DateTime<Utc>,
}

/// Commercial terms returned by a successful rates probe.
#[derive(Debug, Clone)]
pub struct ProviderPriceUpdate {
    pub public_key: String,
    pub rate_per_mb_per_day: i64,
    pub min_bounty: i64,
    pub min_span: i32,
    pub max_span: i32,
}

#[derive(Debug, Clone)]
pub struct StatusSample {
    pub public_key: String,
    pub is_online: bool,
}

/// Wallet scan watermark per provider.
#[derive(Debug, Clone)]
pub struct ProviderWalletCursor {
    pub public_key: String,
    pub address: String,
    pub last_tx_lt: i64,
}

#[derive(Debug, Clone)]
pub struct WalletCursorUpdate {
    pub public_key: String,
    pub last_tx_lt: i64,
}

/// One discovered storage contract fanned out to its accepting providers on
/// insert.
#[derive(Debug, Clone)]
pub struct StorageContractUpsert {
    pub address: String,
    pub provider_addresses: Vec<String>,
    pub bag_id: String,
    pub owner_address: String,
    pub size: i64,
    pub chunk_size: i64,
    pub last_tx_lt: i64,
}

/// A (contract, provider) relation as loaded for the proof-check pipeline.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ContractRelation {
    pub provider_public_key: String,
    pub provider_address: String,
    pub contract_address: String,
    pub bag_id: String,
    pub size: i64,
}

/// One persisted proof outcome, as served by the contracts-status API.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ContractCheckRow {
    pub contract_address: String,
    pub provider_public_key: String,
    pub bag_id: String,
    pub reason: Option<i16>,
    pub reason_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProofCheckUpdate {
    pub contract_address: String,
    pub provider_address: String,
    pub reason: i16,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProviderIpUpdate {
    pub public_key: String,
    pub ip: String,
    pub port: i32,
}

/// (pubkey, ip) pair for the geo-enrichment pass.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ProviderIp {
    pub public_key: String,
    pub ip: String,
}

#[derive(Debug, Clone)]
pub struct ProviderGeoUpdate {
    pub public_key: String,
    /// Raw JSON blob from the geo client, stored verbatim.
    pub ip_info: String,
}

/// Flattened telemetry submission ready for persistence.
#[derive(Debug, Clone, Default)]
pub struct TelemetryUpsert {
    pub public_key: String,
    pub storage_git_hash: String,
    pub provider_git_hash: String,
    pub disk_name: String,
    pub cpu_name: String,
    pub cpu_product_name: String,
    pub uname_sysname: String,
    pub uname_release: String,
    pub uname_version: String,
    pub uname_machine: String,
    /// JSON-encoded per-core load vector.
    pub cpu_load: String,
    /// JSON-encoded ping matrix.
    pub pings: String,
    /// JSON-encoded raw benchmark map carried inside the telemetry payload.
    pub benchmarks: String,
    pub total_space: f64,
    pub used_space: f64,
    pub free_space: f64,
    pub used_provider_space: f64,
    pub total_provider_space: f64,
    pub total_swap: f32,
    pub usage_swap: f32,
    pub swap_usage_percent: f32,
    pub usage_ram: f32,
    pub total_ram: f32,
    pub ram_usage_percent: f32,
    pub cpu_number: i32,
    pub cpu_is_virtual: bool,
    pub max_bag_size_bytes: i64,
    pub x_real_ip: Option<String>,
}

/// Flattened benchmark submission ready for persistence.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkUpsert {
    pub public_key: String,
    pub disk: String,
    pub network: String,
    pub qd64_disk_read_speed: Option<String>,
    pub qd64_disk_write_speed: Option<String>,
    pub benchmark_timestamp: Option<DateTime<Utc>>,
    pub speedtest_download: f64,
    pub speedtest_upload: f64,
    pub speedtest_ping: f64,
    pub country: Option<String>,
    pub isp: Option<String>,
}

/// Search result row: provider joined with its latest telemetry and
/// benchmark. `uptime` is already scaled to percent and `price` to the
/// 200 GB / 30 days display unit.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ProviderRow {
    pub public_key: String,
    pub address: String,
    pub status: Option<i16>,
    pub uptime: Option<f64>,
    pub rating: Option<f64>,
    pub max_span: Option<i32>,
    pub price: Option<i64>,
    pub min_span: Option<i32>,
    pub max_bag_size_bytes: Option<i64>,
    pub registered_at: DateTime<Utc>,
    pub is_send_telemetry: bool,
    pub storage_git_hash: Option<String>,
    pub provider_git_hash: Option<String>,
    pub total_provider_space: Option<f64>,
    pub used_provider_space: Option<f64>,
    pub cpu_name: Option<String>,
    pub cpu_number: Option<i32>,
    pub cpu_is_virtual: Option<bool>,
    pub total_ram: Option<f32>,
    pub usage_ram: Option<f32>,
    pub ram_usage_percent: Option<f32>,
    pub telemetry_updated_at: Option<DateTime<Utc>>,
    pub qd64_disk_read_speed: Option<String>,
    pub qd64_disk_write_speed: Option<String>,
    pub speedtest_download: Option<f64>,
    pub speedtest_upload: Option<f64>,
    pub speedtest_ping: Option<f64>,
    pub country: Option<String>,
    pub isp: Option<String>,
}
