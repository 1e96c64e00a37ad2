use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Statement, sea_query::OnConflict,
};

use crate::{
    error::Result,
    models::{status, status_history},
    types::StatusSample,
};

/// Liveness samples: one latest row per provider plus an append-only history
/// feeding the uptime rollup.
#[derive(Clone)]
pub struct StatusRepository {
    conn: Arc<DatabaseConnection>,
}

impl StatusRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    pub async fn add_statuses(&self, samples: &[StatusSample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let started = std::time::Instant::now();
        let result = self.add_statuses_inner(samples).await;

        mtp_observability::record_repository_query(
            "statuses",
            "add_statuses",
            if result.is_ok() { "ok" } else { "error" },
            started.elapsed(),
        );

        result
    }

    async fn add_statuses_inner(&self, samples: &[StatusSample]) -> Result<()> {
        let now = Utc::now();

        let history_rows = samples.iter().map(|sample| status_history::ActiveModel {
            id: ActiveValue::NotSet,
            public_key: ActiveValue::Set(sample.public_key.to_lowercase()),
            is_online: ActiveValue::Set(sample.is_online),
            check_time: ActiveValue::Set(now),
        });

        status_history::Entity::insert_many(history_rows)
            .exec(self.conn.as_ref())
            .await?;

        let latest_rows = samples.iter().map(|sample| status::ActiveModel {
            public_key: ActiveValue::Set(sample.public_key.to_lowercase()),
            is_online: ActiveValue::Set(sample.is_online),
            check_time: ActiveValue::Set(now),
        });

        status::Entity::insert_many(latest_rows)
            .on_conflict(
                OnConflict::column(status::Column::PublicKey)
                    .update_columns([status::Column::IsOnline, status::Column::CheckTime])
                    .to_owned(),
            )
            .exec(self.conn.as_ref())
            .await?;

        Ok(())
    }

    /// Recomputes `providers.uptime` as online / total over the whole status
    /// history. Providers with no samples keep NULL and read back as 0.
    pub async fn update_uptime(&self) -> Result<()> {
        const SQL: &str = r#"
            WITH provider_uptime AS (
                SELECT
                    public_key,
                    count(*) AS total,
                    count(*) filter (where is_online) AS online
                FROM statuses_history
                GROUP BY public_key
            )
            UPDATE providers p
            SET uptime = COALESCE((SELECT pu.online::float8 / pu.total), 0)
            FROM provider_uptime pu
            WHERE p.public_key = pu.public_key
        "#;

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, SQL))
            .await?;

        Ok(())
    }

    pub async fn clean_history(&self, days: i32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));

        let result = status_history::Entity::delete_many()
            .filter(status_history::Column::CheckTime.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
