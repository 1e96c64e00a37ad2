use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::{Expr, OnConflict},
};

use crate::{
    error::Result,
    models::{provider, telemetry, telemetry_history},
    types::TelemetryUpsert,
};

#[derive(Clone)]
pub struct TelemetryRepository {
    conn: Arc<DatabaseConnection>,
}

impl TelemetryRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Replaces the live telemetry row per provider. Superseded rows are
    /// archived to `telemetry_history` first; the provider's advertised
    /// `max_bag_size_bytes` travels inside the telemetry payload and is
    /// forwarded to the provider row.
    pub async fn upsert_telemetry(&self, items: &[TelemetryUpsert]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let keys: Vec<String> = items.iter().map(|t| t.public_key.clone()).collect();

        let superseded = telemetry::Entity::find()
            .filter(telemetry::Column::PublicKey.is_in(keys))
            .all(self.conn.as_ref())
            .await?;

        if !superseded.is_empty() {
            let history_rows = superseded
                .iter()
                .filter_map(|row| {
                    let payload = serde_json::to_string(row).ok()?;
                    Some(telemetry_history::ActiveModel {
                        id: ActiveValue::NotSet,
                        public_key: ActiveValue::Set(row.public_key.clone()),
                        payload: ActiveValue::Set(payload),
                        archived_at: ActiveValue::Set(now),
                    })
                })
                .collect::<Vec<_>>();

            telemetry_history::Entity::insert_many(history_rows)
                .exec(self.conn.as_ref())
                .await?;
        }

        let rows = items.iter().map(|t| telemetry::ActiveModel {
            public_key: ActiveValue::Set(t.public_key.to_lowercase()),
            storage_git_hash: ActiveValue::Set(Some(t.storage_git_hash.clone())),
            provider_git_hash: ActiveValue::Set(Some(t.provider_git_hash.clone())),
            disk_name: ActiveValue::Set(Some(t.disk_name.clone())),
            cpu_name: ActiveValue::Set(Some(t.cpu_name.clone())),
            cpu_product_name: ActiveValue::Set(Some(t.cpu_product_name.clone())),
            uname_sysname: ActiveValue::Set(Some(t.uname_sysname.clone())),
            uname_release: ActiveValue::Set(Some(t.uname_release.clone())),
            uname_version: ActiveValue::Set(Some(t.uname_version.clone())),
            uname_machine: ActiveValue::Set(Some(t.uname_machine.clone())),
            cpu_load: ActiveValue::Set(Some(t.cpu_load.clone())),
            pings: ActiveValue::Set(Some(t.pings.clone())),
            benchmarks: ActiveValue::Set(Some(t.benchmarks.clone())),
            total_space: ActiveValue::Set(Some(t.total_space)),
            used_space: ActiveValue::Set(Some(t.used_space)),
            free_space: ActiveValue::Set(Some(t.free_space)),
            used_provider_space: ActiveValue::Set(Some(t.used_provider_space)),
            total_provider_space: ActiveValue::Set(Some(t.total_provider_space)),
            total_swap: ActiveValue::Set(Some(t.total_swap)),
            usage_swap: ActiveValue::Set(Some(t.usage_swap)),
            swap_usage_percent: ActiveValue::Set(Some(t.swap_usage_percent)),
            usage_ram: ActiveValue::Set(Some(t.usage_ram)),
            total_ram: ActiveValue::Set(Some(t.total_ram)),
            ram_usage_percent: ActiveValue::Set(Some(t.ram_usage_percent)),
            cpu_number: ActiveValue::Set(Some(t.cpu_number)),
            cpu_is_virtual: ActiveValue::Set(Some(t.cpu_is_virtual)),
            x_real_ip: ActiveValue::Set(t.x_real_ip.clone()),
            updated_at: ActiveValue::Set(now),
        });

        telemetry::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::column(telemetry::Column::PublicKey)
                    .update_columns([
                        telemetry::Column::StorageGitHash,
                        telemetry::Column::ProviderGitHash,
                        telemetry::Column::DiskName,
                        telemetry::Column::CpuName,
                        telemetry::Column::CpuProductName,
                        telemetry::Column::UnameSysname,
                        telemetry::Column::UnameRelease,
                        telemetry::Column::UnameVersion,
                        telemetry::Column::UnameMachine,
                        telemetry::Column::CpuLoad,
                        telemetry::Column::Pings,
                        telemetry::Column::Benchmarks,
                        telemetry::Column::TotalSpace,
                        telemetry::Column::UsedSpace,
                        telemetry::Column::FreeSpace,
                        telemetry::Column::UsedProviderSpace,
                        telemetry::Column::TotalProviderSpace,
                        telemetry::Column::TotalSwap,
                        telemetry::Column::UsageSwap,
                        telemetry::Column::SwapUsagePercent,
                        telemetry::Column::UsageRam,
                        telemetry::Column::TotalRam,
                        telemetry::Column::RamUsagePercent,
                        telemetry::Column::CpuNumber,
                        telemetry::Column::CpuIsVirtual,
                        telemetry::Column::XRealIp,
                        telemetry::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.conn.as_ref())
            .await?;

        for t in items {
            provider::Entity::update_many()
                .col_expr(
                    provider::Column::MaxBagSizeBytes,
                    Expr::value(t.max_bag_size_bytes),
                )
                .filter(provider::Column::PublicKey.eq(t.public_key.to_lowercase()))
                .exec(self.conn.as_ref())
                .await?;
        }

        Ok(())
    }

    pub async fn clean_history(&self, days: i32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));

        let result = telemetry_history::Entity::delete_many()
            .filter(telemetry_history::Column::ArchivedAt.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
