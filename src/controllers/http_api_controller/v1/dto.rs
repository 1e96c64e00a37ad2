//! Wire types of the v1 API. Field names are part of the public contract;
//! agents in the field serialize against them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchProvidersRequest {
    /// Exact pubkeys to fetch; when non-empty, filters are ignored.
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub filters: FiltersDto,
    #[serde(default)]
    pub sort: SortDto,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FiltersDto {
    pub rating_gt: Option<f64>,
    pub rating_lt: Option<f64>,
    pub reg_time_days_gt: Option<i64>,
    pub reg_time_days_lt: Option<i64>,
    pub uptime_gt_percent: Option<f64>,
    pub uptime_lt_percent: Option<f64>,
    pub price_gt: Option<f64>,
    pub price_lt: Option<f64>,
    pub min_span_gt: Option<i64>,
    pub min_span_lt: Option<i64>,
    pub max_span_gt: Option<i64>,
    pub max_span_lt: Option<i64>,
    pub max_bag_size_mb_gt: Option<i64>,
    pub max_bag_size_mb_lt: Option<i64>,
    pub is_send_telemetry: Option<bool>,
    pub total_provider_space_gt: Option<f64>,
    pub total_provider_space_lt: Option<f64>,
    pub used_provider_space_gt: Option<f64>,
    pub used_provider_space_lt: Option<f64>,
    pub storage_git_hash: Option<String>,
    pub provider_git_hash: Option<String>,
    pub cpu_number_gt: Option<i32>,
    pub cpu_number_lt: Option<i32>,
    pub cpu_name: Option<String>,
    pub cpu_is_virtual: Option<bool>,
    pub total_ram_gt: Option<f64>,
    pub total_ram_lt: Option<f64>,
    pub ram_usage_percent_gt: Option<f64>,
    pub ram_usage_percent_lt: Option<f64>,
    pub benchmark_disk_read_speed_gt: Option<i64>,
    pub benchmark_disk_read_speed_lt: Option<i64>,
    pub benchmark_disk_write_speed_gt: Option<i64>,
    pub benchmark_disk_write_speed_lt: Option<i64>,
    pub speedtest_download_gt: Option<f64>,
    pub speedtest_download_lt: Option<f64>,
    pub speedtest_upload_gt: Option<f64>,
    pub speedtest_upload_lt: Option<f64>,
    pub speedtest_ping_gt: Option<f64>,
    pub speedtest_ping_lt: Option<f64>,
    pub country: Option<String>,
    pub isp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SortDto {
    pub column: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TelemetryRequest {
    pub storage: StorageInfo,
    #[serde(default)]
    pub git_hashes: Option<HashMap<String, String>>,
    #[serde(default)]
    pub memory: MemoryInfo,
    #[serde(default)]
    pub swap: MemoryInfo,
    #[serde(default)]
    pub uname: UnameInfo,
    #[serde(default)]
    pub cpu_info: CpuInfo,
    #[serde(default)]
    pub pings: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub benchmark: Option<serde_json::Value>,
    /// Filled from the `X-Real-IP` header by the handler, never from the body.
    #[serde(skip)]
    pub x_real_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StorageInfo {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub disk_name: String,
    #[serde(default)]
    pub total_disk_space: f64,
    #[serde(default)]
    pub used_disk_space: f64,
    #[serde(default)]
    pub free_disk_space: f64,
    #[serde(default)]
    pub provider: ProviderSpaceInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderSpaceInfo {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub used_provider_space: f64,
    #[serde(default)]
    pub total_provider_space: f64,
    #[serde(default)]
    pub max_bag_size_bytes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MemoryInfo {
    #[serde(default)]
    pub total: f32,
    #[serde(default)]
    pub usage: f32,
    #[serde(default)]
    pub usage_percent: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UnameInfo {
    #[serde(default)]
    pub sysname: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub machine: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CpuInfo {
    #[serde(default)]
    pub cpu_load: Vec<f32>,
    #[serde(default)]
    pub number: i32,
    #[serde(default)]
    pub cpu_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct BenchmarksRequest {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub disk: Option<serde_json::Value>,
    #[serde(default)]
    pub network: Option<serde_json::Value>,
    #[serde(default)]
    pub benchmark_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub speedtest: SpeedtestInfo,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SpeedtestInfo {
    #[serde(default)]
    pub download: f64,
    #[serde(default)]
    pub upload: f64,
    #[serde(default)]
    pub ping: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProvidersResponse {
    pub providers: Vec<ProviderDto>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProviderDto {
    pub pubkey: String,
    pub address: String,
    pub status: Option<i16>,
    pub uptime: f64,
    pub rating: f64,
    pub working_time: i64,
    pub max_span: i32,
    pub min_span: i32,
    pub price: i64,
    pub max_bag_size_bytes: i64,
    pub reg_time: i64,
    pub is_send_telemetry: bool,
    pub telemetry: ProviderTelemetryDto,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct ProviderTelemetryDto {
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
    pub updated_at: Option<i64>,
    pub qd64_disk_read_speed: Option<String>,
    pub qd64_disk_write_speed: Option<String>,
    pub speedtest_download: Option<f64>,
    pub speedtest_upload: Option<f64>,
    pub speedtest_ping: Option<f64>,
    pub country: Option<String>,
    pub isp: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContractChecksResponse {
    pub checks: Vec<ContractCheckDto>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContractCheckDto {
    pub contract_address: String,
    pub bag_id: String,
    pub reason: Option<i16>,
    pub reason_label: Option<&'static str>,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}
