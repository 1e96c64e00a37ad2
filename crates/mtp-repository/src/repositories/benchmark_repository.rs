use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::OnConflict,
};

use crate::{
    error::Result,
    models::{benchmark, benchmark_history},
    types::BenchmarkUpsert,
};

#[derive(Clone)]
pub struct BenchmarkRepository {
    conn: Arc<DatabaseConnection>,
}

impl BenchmarkRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Replaces the live benchmark row per provider, archiving superseded
    /// rows to `benchmarks_history`.
    pub async fn upsert_benchmarks(&self, items: &[BenchmarkUpsert]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let keys: Vec<String> = items.iter().map(|b| b.public_key.clone()).collect();

        let superseded = benchmark::Entity::find()
            .filter(benchmark::Column::PublicKey.is_in(keys))
            .all(self.conn.as_ref())
            .await?;

        if !superseded.is_empty() {
            let history_rows = superseded
                .iter()
                .filter_map(|row| {
                    let payload = serde_json::to_string(row).ok()?;
                    Some(benchmark_history::ActiveModel {
                        id: ActiveValue::NotSet,
                        public_key: ActiveValue::Set(row.public_key.clone()),
                        payload: ActiveValue::Set(payload),
                        archived_at: ActiveValue::Set(now),
                    })
                })
                .collect::<Vec<_>>();

            benchmark_history::Entity::insert_many(history_rows)
                .exec(self.conn.as_ref())
                .await?;
        }

        let rows = items.iter().map(|b| benchmark::ActiveModel {
            public_key: ActiveValue::Set(b.public_key.to_lowercase()),
            disk: ActiveValue::Set(Some(b.disk.clone())),
            network: ActiveValue::Set(Some(b.network.clone())),
            qd64_disk_read_speed: ActiveValue::Set(b.qd64_disk_read_speed.clone()),
            qd64_disk_write_speed: ActiveValue::Set(b.qd64_disk_write_speed.clone()),
            benchmark_timestamp: ActiveValue::Set(b.benchmark_timestamp),
            speedtest_download: ActiveValue::Set(Some(b.speedtest_download)),
            speedtest_upload: ActiveValue::Set(Some(b.speedtest_upload)),
            speedtest_ping: ActiveValue::Set(Some(b.speedtest_ping)),
            country: ActiveValue::Set(b.country.clone()),
            isp: ActiveValue::Set(b.isp.clone()),
            updated_at: ActiveValue::Set(now),
        });

        benchmark::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::column(benchmark::Column::PublicKey)
                    .update_columns([
                        benchmark::Column::Disk,
                        benchmark::Column::Network,
                        benchmark::Column::Qd64DiskReadSpeed,
                        benchmark::Column::Qd64DiskWriteSpeed,
                        benchmark::Column::BenchmarkTimestamp,
                        benchmark::Column::SpeedtestDownload,
                        benchmark::Column::SpeedtestUpload,
                        benchmark::Column::SpeedtestPing,
                        benchmark::Column::Country,
                        benchmark::Column::Isp,
                        benchmark::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.conn.as_ref())
            .await?;

        Ok(())
    }

    pub async fn clean_history(&self, days: i32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));

        let result = benchmark_history::Entity::delete_many()
            .filter(benchmark_history::Column::ArchivedAt.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
