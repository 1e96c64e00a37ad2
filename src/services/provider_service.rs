use std::sync::Arc;

use chrono::Utc;
use mtp_repository::{
    ProviderFilters, ProviderRow, ProviderSort, RepositoryManager, SortColumn, SortOrder,
};
use thiserror::Error;

use crate::{
    controllers::http_api_controller::v1::dto::{
        ContractCheckDto, FiltersDto, ProviderDto, ProviderTelemetryDto, SearchProvidersRequest,
        SortDto,
    },
    types::{ProviderKey, ReasonCode},
};

const MAX_PROVIDERS_LIMIT: i64 = 1000;

#[derive(Error, Debug)]
pub(crate) enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Repository(#[from] mtp_repository::RepositoryError),
}

/// Read side of the registry: search and per-provider contract checks.
pub(crate) struct ProviderService {
    repository: Arc<RepositoryManager>,
}

impl ProviderService {
    pub(crate) fn new(repository: Arc<RepositoryManager>) -> Self {
        Self { repository }
    }

    pub(crate) async fn search_providers(
        &self,
        request: SearchProvidersRequest,
    ) -> Result<Vec<ProviderDto>, ServiceError> {
        let rows = if !request.exact.is_empty() {
            if request.exact.len() as i64 > MAX_PROVIDERS_LIMIT {
                return Err(ServiceError::BadRequest(
                    "too many pubkeys in request".to_string(),
                ));
            }

            self.repository
                .provider_repository()
                .get_providers_by_pubkeys(&request.exact)
                .await?
        } else {
            let filters = filters_from_dto(&request.filters);
            let sort = sort_from_dto(&request.sort);

            let limit = if request.limit <= 0 || request.limit > MAX_PROVIDERS_LIMIT {
                MAX_PROVIDERS_LIMIT
            } else {
                request.limit
            };
            let offset = request.offset.max(0);

            self.repository
                .provider_repository()
                .get_providers(&filters, &sort, limit, offset)
                .await?
        };

        Ok(rows.into_iter().map(provider_to_dto).collect())
    }

    pub(crate) async fn get_contract_checks(
        &self,
        pubkey: &str,
    ) -> Result<Vec<ContractCheckDto>, ServiceError> {
        let key = ProviderKey::parse(pubkey)
            .ok_or_else(|| ServiceError::BadRequest("invalid provider pubkey".to_string()))?;

        let rows = self
            .repository
            .contract_repository()
            .get_checks_by_pubkey(key.as_str())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ContractCheckDto {
                contract_address: row.contract_address,
                bag_id: row.bag_id,
                reason: row.reason,
                reason_label: row
                    .reason
                    .and_then(ReasonCode::from_i16)
                    .map(ReasonCode::label),
                checked_at: row.reason_timestamp,
            })
            .collect())
    }
}

fn provider_to_dto(row: ProviderRow) -> ProviderDto {
    let reg_time = row.registered_at.timestamp();
    let working_time = Utc::now().timestamp() - reg_time;

    ProviderDto {
        pubkey: row.public_key,
        address: row.address,
        status: row.status,
        uptime: row.uptime.unwrap_or(0.0),
        rating: row.rating.unwrap_or(0.0),
        working_time,
        max_span: row.max_span.unwrap_or(0),
        min_span: row.min_span.unwrap_or(0),
        price: row.price.unwrap_or(0),
        max_bag_size_bytes: row.max_bag_size_bytes.unwrap_or(0),
        reg_time,
        is_send_telemetry: row.is_send_telemetry,
        telemetry: ProviderTelemetryDto {
            storage_git_hash: row.storage_git_hash,
            provider_git_hash: row.provider_git_hash,
            total_provider_space: row.total_provider_space,
            used_provider_space: row.used_provider_space,
            cpu_name: row.cpu_name,
            cpu_number: row.cpu_number,
            cpu_is_virtual: row.cpu_is_virtual,
            total_ram: row.total_ram,
            usage_ram: row.usage_ram,
            ram_usage_percent: row.ram_usage_percent,
            updated_at: row.telemetry_updated_at.map(|t| t.timestamp()),
            qd64_disk_read_speed: row.qd64_disk_read_speed,
            qd64_disk_write_speed: row.qd64_disk_write_speed,
            speedtest_download: row.speedtest_download,
            speedtest_upload: row.speedtest_upload,
            speedtest_ping: row.speedtest_ping,
            country: row.country,
            isp: row.isp,
        },
    }
}

fn filters_from_dto(dto: &FiltersDto) -> ProviderFilters {
    ProviderFilters {
        rating_gt: dto.rating_gt,
        rating_lt: dto.rating_lt,
        reg_time_days_gt: dto.reg_time_days_gt,
        reg_time_days_lt: dto.reg_time_days_lt,
        uptime_gt_percent: dto.uptime_gt_percent,
        uptime_lt_percent: dto.uptime_lt_percent,
        price_gt: dto.price_gt,
        price_lt: dto.price_lt,
        min_span_gt: dto.min_span_gt,
        min_span_lt: dto.min_span_lt,
        max_span_gt: dto.max_span_gt,
        max_span_lt: dto.max_span_lt,
        max_bag_size_mb_gt: dto.max_bag_size_mb_gt,
        max_bag_size_mb_lt: dto.max_bag_size_mb_lt,
        is_send_telemetry: dto.is_send_telemetry,
        total_provider_space_gt: dto.total_provider_space_gt,
        total_provider_space_lt: dto.total_provider_space_lt,
        used_provider_space_gt: dto.used_provider_space_gt,
        used_provider_space_lt: dto.used_provider_space_lt,
        storage_git_hash: dto.storage_git_hash.clone(),
        provider_git_hash: dto.provider_git_hash.clone(),
        cpu_number_gt: dto.cpu_number_gt,
        cpu_number_lt: dto.cpu_number_lt,
        cpu_name: dto.cpu_name.clone(),
        cpu_is_virtual: dto.cpu_is_virtual,
        total_ram_gt: dto.total_ram_gt,
        total_ram_lt: dto.total_ram_lt,
        ram_usage_percent_gt: dto.ram_usage_percent_gt,
        ram_usage_percent_lt: dto.ram_usage_percent_lt,
        benchmark_disk_read_speed_kib_gt: dto.benchmark_disk_read_speed_gt,
        benchmark_disk_read_speed_kib_lt: dto.benchmark_disk_read_speed_lt,
        benchmark_disk_write_speed_kib_gt: dto.benchmark_disk_write_speed_gt,
        benchmark_disk_write_speed_kib_lt: dto.benchmark_disk_write_speed_lt,
        speedtest_download_gt: dto.speedtest_download_gt,
        speedtest_download_lt: dto.speedtest_download_lt,
        speedtest_upload_gt: dto.speedtest_upload_gt,
        speedtest_upload_lt: dto.speedtest_upload_lt,
        speedtest_ping_gt: dto.speedtest_ping_gt,
        speedtest_ping_lt: dto.speedtest_ping_lt,
        country: dto.country.clone(),
        isp: dto.isp.clone(),
    }
}

fn sort_from_dto(dto: &SortDto) -> ProviderSort {
    let column = dto
        .column
        .as_deref()
        .and_then(SortColumn::parse)
        .unwrap_or_default();

    let order = match dto.order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };

    ProviderSort { column, order }
}
