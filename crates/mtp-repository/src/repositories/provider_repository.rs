use std::{fmt::Write as _, sync::Arc};

use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QuerySelect, Statement, Value,
    sea_query::{Expr, OnConflict},
};

use crate::{
    error::Result,
    models::{provider, provider_history},
    types::{
        ProviderCreate, ProviderGeoUpdate, ProviderIp, ProviderIpUpdate, ProviderPriceUpdate,
        ProviderRow, ProviderWalletCursor, WalletCursorUpdate,
    },
};

/// Search filters, all optional. The unit quirks are part of the public API:
/// price bounds arrive in TON per 200 GB / 30 days, uptime in percent, disk
/// speed bounds in KiB/s which are scaled by 1024 before comparison against
/// the byte-per-second value parsed from benchmark strings.
#[derive(Debug, Clone, Default)]
pub struct ProviderFilters {
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
    pub benchmark_disk_read_speed_kib_gt: Option<i64>,
    pub benchmark_disk_read_speed_kib_lt: Option<i64>,
    pub benchmark_disk_write_speed_kib_gt: Option<i64>,
    pub benchmark_disk_write_speed_kib_lt: Option<i64>,
    pub speedtest_download_gt: Option<f64>,
    pub speedtest_download_lt: Option<f64>,
    pub speedtest_upload_gt: Option<f64>,
    pub speedtest_upload_lt: Option<f64>,
    pub speedtest_ping_gt: Option<f64>,
    pub speedtest_ping_lt: Option<f64>,
    pub country: Option<String>,
    pub isp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    PubKey,
    Uptime,
    WorkingTime,
    #[default]
    Rating,
    Price,
    Location,
}

impl SortColumn {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pubkey" => Some(Self::PubKey),
            "uptime" => Some(Self::Uptime),
            "workingtime" => Some(Self::WorkingTime),
            "rating" => Some(Self::Rating),
            "price" => Some(Self::Price),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    fn to_sql(self) -> &'static str {
        match self {
            Self::PubKey => "p.public_key",
            Self::Uptime => "p.uptime",
            Self::WorkingTime => "p.registered_at",
            Self::Rating => "p.rating",
            Self::Price => "p.rate_per_mb_per_day",
            Self::Location => "(p.ip_info, p.rating)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderSort {
    pub column: SortColumn,
    pub order: SortOrder,
}

const PROVIDERS_SELECT: &str = r#"
    SELECT
        p.public_key,
        p.address,
        p.status,
        p.uptime * 100 as uptime,
        p.rating,
        p.max_span,
        p.rate_per_mb_per_day * 1024 * 200 * 30 as price,
        p.min_span,
        p.max_bag_size_bytes,
        p.registered_at,
        t.public_key is not null as is_send_telemetry,
        t.storage_git_hash,
        t.provider_git_hash,
        t.total_provider_space,
        t.used_provider_space,
        t.cpu_name,
        t.cpu_number,
        t.cpu_is_virtual,
        t.total_ram,
        t.usage_ram,
        t.ram_usage_percent,
        t.updated_at as telemetry_updated_at,
        b.qd64_disk_read_speed,
        b.qd64_disk_write_speed,
        b.speedtest_download,
        b.speedtest_upload,
        b.speedtest_ping,
        b.country,
        b.isp
    FROM providers p
        LEFT JOIN telemetry t ON p.public_key = t.public_key
        LEFT JOIN benchmarks b ON p.public_key = b.public_key
"#;

#[derive(Clone)]
pub struct ProviderRepository {
    conn: Arc<DatabaseConnection>,
}

impl ProviderRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Inserts newly discovered providers. Re-discoveries are no-ops so the
    /// discovery tick stays idempotent.
    pub async fn add_providers(&self, providers: &[ProviderCreate]) -> Result<()> {
        if providers.is_empty() {
            return Ok(());
        }

        let rows = providers.iter().map(|p| provider::ActiveModel {
            public_key: ActiveValue::Set(p.public_key.to_lowercase()),
            address: ActiveValue::Set(p.address.clone()),
            registered_at: ActiveValue::Set(p.registered_at),
            last_tx_lt: ActiveValue::Set(0),
            is_initialized: ActiveValue::Set(false),
            ..Default::default()
        });

        let insert = provider::Entity::insert_many(rows).on_conflict(
            OnConflict::column(provider::Column::PublicKey)
                .do_nothing()
                .to_owned(),
        );

        let started = std::time::Instant::now();
        let result = match insert.exec(self.conn.as_ref()).await {
            Ok(_) => Ok(()),
            // Every row already existed; the conflict clause swallowed them all.
            Err(sea_orm::DbErr::RecordNotInserted) => Ok(()),
            Err(err) => Err(err.into()),
        };

        mtp_observability::record_repository_query(
            "providers",
            "add_providers",
            if result.is_ok() { "ok" } else { "error" },
            started.elapsed(),
        );

        result
    }

    pub async fn get_all_pubkeys(&self) -> Result<Vec<String>> {
        let keys = provider::Entity::find()
            .select_only()
            .column(provider::Column::PublicKey)
            .into_tuple::<String>()
            .all(self.conn.as_ref())
            .await?;

        Ok(keys)
    }

    pub async fn get_wallets(&self) -> Result<Vec<ProviderWalletCursor>> {
        let rows = provider::Entity::find().all(self.conn.as_ref()).await?;

        Ok(rows
            .into_iter()
            .map(|p| ProviderWalletCursor {
                public_key: p.public_key,
                address: p.address,
                last_tx_lt: p.last_tx_lt,
            })
            .collect())
    }

    pub async fn update_wallet_cursors(&self, cursors: &[WalletCursorUpdate]) -> Result<()> {
        for cursor in cursors {
            provider::Entity::update_many()
                .col_expr(provider::Column::LastTxLt, Expr::value(cursor.last_tx_lt))
                .filter(provider::Column::PublicKey.eq(cursor.public_key.to_lowercase()))
                .exec(self.conn.as_ref())
                .await?;
        }

        Ok(())
    }

    /// Applies the terms returned by a liveness probe and flips the provider
    /// to initialized. The previous row is archived first.
    pub async fn update_prices(&self, updates: &[ProviderPriceUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let keys: Vec<String> = updates
            .iter()
            .map(|u| u.public_key.to_lowercase())
            .collect();

        let superseded = provider::Entity::find()
            .filter(provider::Column::PublicKey.is_in(keys))
            .all(self.conn.as_ref())
            .await?;

        if !superseded.is_empty() {
            let history_rows = superseded
                .iter()
                .filter_map(|row| {
                    let payload = serde_json::to_string(row).ok()?;
                    Some(provider_history::ActiveModel {
                        id: ActiveValue::NotSet,
                        public_key: ActiveValue::Set(row.public_key.clone()),
                        payload: ActiveValue::Set(payload),
                        archived_at: ActiveValue::Set(now),
                    })
                })
                .collect::<Vec<_>>();

            provider_history::Entity::insert_many(history_rows)
                .exec(self.conn.as_ref())
                .await?;
        }

        for update in updates {
            provider::Entity::update_many()
                .col_expr(
                    provider::Column::RatePerMbPerDay,
                    Expr::value(update.rate_per_mb_per_day),
                )
                .col_expr(provider::Column::MinBounty, Expr::value(update.min_bounty))
                .col_expr(provider::Column::MinSpan, Expr::value(update.min_span))
                .col_expr(provider::Column::MaxSpan, Expr::value(update.max_span))
                .col_expr(provider::Column::IsInitialized, Expr::value(true))
                .col_expr(provider::Column::UpdatedAt, Expr::value(now))
                .filter(provider::Column::PublicKey.eq(update.public_key.to_lowercase()))
                .exec(self.conn.as_ref())
                .await?;
        }

        Ok(())
    }

    /// Stores resolved endpoints. An already known IP is kept (DHT answers
    /// flap); only the port follows the latest resolution.
    pub async fn update_ips(&self, ips: &[ProviderIpUpdate]) -> Result<()> {
        for ip in ips {
            provider::Entity::update_many()
                .col_expr(
                    provider::Column::Ip,
                    Expr::cust_with_values("COALESCE(ip, ?)", [ip.ip.clone()]),
                )
                .col_expr(provider::Column::Port, Expr::value(ip.port))
                .filter(provider::Column::PublicKey.eq(ip.public_key.to_lowercase()))
                .exec(self.conn.as_ref())
                .await?;
        }

        Ok(())
    }

    pub async fn get_provider_ips(&self) -> Result<Vec<ProviderIp>> {
        const SQL: &str = "SELECT public_key, ip FROM providers WHERE ip IS NOT NULL";

        Ok(ProviderIp::find_by_statement(Statement::from_string(
            DbBackend::Postgres,
            SQL,
        ))
        .all(self.conn.as_ref())
        .await?)
    }

    pub async fn update_geo(&self, updates: &[ProviderGeoUpdate]) -> Result<()> {
        for update in updates {
            provider::Entity::update_many()
                .col_expr(provider::Column::IpInfo, Expr::value(update.ip_info.clone()))
                .filter(provider::Column::PublicKey.eq(update.public_key.to_lowercase()))
                .exec(self.conn.as_ref())
                .await?;
        }

        Ok(())
    }

    /// Recomputes every initialized provider's rating in one statement. The
    /// weights and shape of this expression define the ordering clients see;
    /// any change here reshuffles the public listing.
    pub async fn update_rating(&self) -> Result<()> {
        const SQL: &str = r#"
            WITH params AS (
                SELECT
                    p.public_key,
                    p.registered_at,
                    p.uptime,
                    p.max_span,
                    p.min_span,
                    0 as max_bag_size_bytes,
                    p.rate_per_mb_per_day,
                    t.total_provider_space,
                    t.cpu_number,
                    t.total_ram,
                    b.qd64_disk_write_speed,
                    b.qd64_disk_read_speed,
                    b.speedtest_download,
                    b.speedtest_upload,
                    b.speedtest_ping
                FROM providers p
                    LEFT JOIN telemetry t ON p.public_key = t.public_key
                    LEFT JOIN benchmarks b ON p.public_key = b.public_key
                WHERE p.is_initialized
            )
            UPDATE providers p
            SET rating = (
                (
                    0.0001 * (EXTRACT(EPOCH FROM pr.registered_at) * COALESCE(pr.uptime, 0)) +
                    0.00002 * (COALESCE(pr.max_span, 0) - COALESCE(pr.min_span, 0)) +
                    0.00000000008 * COALESCE(pr.max_bag_size_bytes, 0) +
                    0.000000004 * COALESCE(pr.total_provider_space, 0) +
                    1.9 * LEAST(COALESCE(pr.cpu_number, 0), 128) +
                    0.0000006 * COALESCE(pr.total_ram, 0) +
                    0.00008 * COALESCE(parse_speed_to_int(pr.qd64_disk_write_speed), 0) +
                    0.00008 * COALESCE(parse_speed_to_int(pr.qd64_disk_read_speed), 0) +
                    0.00001 * COALESCE(pr.speedtest_download, 0) +
                    0.00004 * COALESCE(pr.speedtest_upload, 0) +
                    CASE WHEN COALESCE(pr.speedtest_ping, 0) > 0 THEN 400 / pr.speedtest_ping ELSE 1 END
                )
                / GREATEST(LOG(COALESCE(NULLIF(pr.rate_per_mb_per_day / 100, 0), 1)), 1)
            ) / 10000.0
            FROM params pr
            WHERE p.public_key = pr.public_key
        "#;

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, SQL))
            .await?;

        Ok(())
    }

    /// Sets each provider's status to the most frequent reason observed on
    /// its relations within the last 24 hours. Ties break by count first,
    /// NULL reasons last.
    pub async fn update_statuses(&self) -> Result<()> {
        const SQL: &str = r#"
            UPDATE providers p
            SET status = selected_reasons.reason
            FROM (
                WITH collect_statuses AS (
                    SELECT
                        p.address,
                        sc.reason,
                        count(*) as cnt,
                        ROW_NUMBER() OVER (
                            PARTITION BY p.address
                            ORDER BY count(*) DESC,
                                    CASE WHEN sc.reason IS NULL THEN 1 ELSE 0 END ASC
                        ) as rn
                    FROM providers p
                        LEFT JOIN storage_contracts sc ON p.address = sc.provider_address
                    WHERE sc.reason IS NOT NULL AND sc.reason_timestamp > NOW() - INTERVAL '24 hours'
                    GROUP BY p.address, sc.reason
                )
                SELECT address, reason
                FROM collect_statuses
                WHERE rn = 1
            ) selected_reasons
            WHERE p.address = selected_reasons.address
        "#;

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, SQL))
            .await?;

        Ok(())
    }

    pub async fn get_providers(
        &self,
        filters: &ProviderFilters,
        sort: &ProviderSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProviderRow>> {
        let mut values: Vec<Value> = vec![limit.into(), offset.into()];
        let condition = filters_to_condition(filters, &mut values);

        let order = match sort.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let sql = format!(
            "{PROVIDERS_SELECT}
            WHERE p.is_initialized AND p.rating IS NOT NULL AND p.uptime IS NOT NULL
                {condition}
            ORDER BY {} {order}
            LIMIT $1
            OFFSET $2",
            sort.column.to_sql(),
        );

        Ok(ProviderRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            values,
        ))
        .all(self.conn.as_ref())
        .await?)
    }

    pub async fn get_providers_by_pubkeys(&self, pubkeys: &[String]) -> Result<Vec<ProviderRow>> {
        if pubkeys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=pubkeys.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "{PROVIDERS_SELECT} WHERE p.public_key IN ({})",
            placeholders.join(", ")
        );

        let values: Vec<Value> = pubkeys
            .iter()
            .map(|k| k.to_lowercase().into())
            .collect();

        Ok(ProviderRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            values,
        ))
        .all(self.conn.as_ref())
        .await?)
    }

    pub async fn clean_history(&self, days: i32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));

        let result = provider_history::Entity::delete_many()
            .filter(provider_history::Column::ArchivedAt.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

/// Renders the optional filters into `AND ...` SQL. Numeric bounds are
/// formatted inline; user-supplied strings go through bind parameters, whose
/// numbering continues after the `values` already collected ($1 limit,
/// $2 offset).
fn filters_to_condition(filters: &ProviderFilters, values: &mut Vec<Value>) -> String {
    let mut cond = String::new();

    if let Some(v) = filters.rating_gt {
        let _ = write!(cond, " AND p.rating >= {v}");
    }
    if let Some(v) = filters.rating_lt {
        let _ = write!(cond, " AND p.rating <= {v}");
    }
    if let Some(v) = filters.reg_time_days_gt {
        let _ = write!(cond, " AND p.registered_at <= NOW() - INTERVAL '{v} days'");
    }
    if let Some(v) = filters.reg_time_days_lt {
        let _ = write!(cond, " AND p.registered_at >= NOW() - INTERVAL '{v} days'");
    }
    if let Some(v) = filters.uptime_gt_percent {
        let _ = write!(cond, " AND p.uptime >= {}", v / 100.0);
    }
    if let Some(v) = filters.uptime_lt_percent {
        let _ = write!(cond, " AND p.uptime <= {}", v / 100.0);
    }
    if let Some(v) = filters.price_gt {
        // Price arrives in TON per 200 GB / 30 days; stored as nano per MB per day.
        let _ = write!(
            cond,
            " AND p.rate_per_mb_per_day >= {}",
            v * 1_000_000_000.0 / 1024.0 / 200.0 / 30.0
        );
    }
    if let Some(v) = filters.price_lt {
        let _ = write!(
            cond,
            " AND p.rate_per_mb_per_day <= {}",
            v * 1_000_000_000.0 / 1024.0 / 200.0 / 30.0
        );
    }
    if let Some(v) = filters.min_span_gt {
        let _ = write!(cond, " AND p.min_span >= {v}");
    }
    if let Some(v) = filters.min_span_lt {
        let _ = write!(cond, " AND p.min_span <= {v}");
    }
    if let Some(v) = filters.max_span_gt {
        let _ = write!(cond, " AND p.max_span >= {v}");
    }
    if let Some(v) = filters.max_span_lt {
        let _ = write!(cond, " AND p.max_span <= {v}");
    }
    if let Some(v) = filters.max_bag_size_mb_gt {
        let _ = write!(cond, " AND p.max_bag_size_bytes/1024/1024 >= {v}");
    }
    if let Some(v) = filters.max_bag_size_mb_lt {
        let _ = write!(cond, " AND p.max_bag_size_bytes/1024/1024 <= {v} + 1");
    }
    if let Some(v) = filters.is_send_telemetry {
        if v {
            cond.push_str(" AND t.public_key is not null");
        } else {
            cond.push_str(" AND t.public_key is null");
        }
    }
    if let Some(v) = filters.total_provider_space_gt {
        let _ = write!(cond, " AND t.total_provider_space >= {v}");
    }
    if let Some(v) = filters.total_provider_space_lt {
        let _ = write!(cond, " AND t.total_provider_space <= {v}");
    }
    if let Some(v) = filters.used_provider_space_gt {
        let _ = write!(cond, " AND t.used_provider_space >= {v}");
    }
    if let Some(v) = filters.used_provider_space_lt {
        let _ = write!(cond, " AND t.used_provider_space <= {v}");
    }
    if let Some(hash) = &filters.storage_git_hash
        && hash.len() == 7
    {
        values.push(hash.clone().into());
        let _ = write!(cond, " AND t.storage_git_hash = ${}", values.len());
    }
    if let Some(hash) = &filters.provider_git_hash
        && hash.len() == 7
    {
        values.push(hash.clone().into());
        let _ = write!(cond, " AND t.provider_git_hash = ${}", values.len());
    }
    if let Some(v) = filters.cpu_number_gt {
        let _ = write!(cond, " AND t.cpu_number >= {v}");
    }
    if let Some(v) = filters.cpu_number_lt {
        let _ = write!(cond, " AND t.cpu_number <= {v}");
    }
    if let Some(name) = &filters.cpu_name {
        values.push(format!("%{name}%").into());
        let _ = write!(cond, " AND t.cpu_name ILIKE ${}", values.len());
    }
    if let Some(v) = filters.cpu_is_virtual {
        if v {
            cond.push_str(" AND t.cpu_is_virtual");
        } else {
            cond.push_str(" AND (t.cpu_is_virtual IS NULL OR NOT t.cpu_is_virtual)");
        }
    }
    if let Some(v) = filters.total_ram_gt {
        let _ = write!(cond, " AND t.total_ram >= {v}");
    }
    if let Some(v) = filters.total_ram_lt {
        let _ = write!(cond, " AND t.total_ram <= {v}");
    }
    if let Some(v) = filters.ram_usage_percent_gt {
        let _ = write!(cond, " AND t.ram_usage_percent >= {v}");
    }
    if let Some(v) = filters.ram_usage_percent_lt {
        let _ = write!(cond, " AND t.ram_usage_percent <= {v}");
    }
    if let Some(v) = filters.benchmark_disk_read_speed_kib_gt {
        let _ = write!(
            cond,
            " AND parse_speed_to_int(b.qd64_disk_read_speed) >= {}",
            v * 1024
        );
    }
    if let Some(v) = filters.benchmark_disk_read_speed_kib_lt {
        let _ = write!(
            cond,
            " AND parse_speed_to_int(b.qd64_disk_read_speed) <= {}",
            v * 1024
        );
    }
    if let Some(v) = filters.benchmark_disk_write_speed_kib_gt {
        let _ = write!(
            cond,
            " AND parse_speed_to_int(b.qd64_disk_write_speed) >= {}",
            v * 1024
        );
    }
    if let Some(v) = filters.benchmark_disk_write_speed_kib_lt {
        let _ = write!(
            cond,
            " AND parse_speed_to_int(b.qd64_disk_write_speed) <= {}",
            v * 1024
        );
    }
    if let Some(v) = filters.speedtest_download_gt {
        let _ = write!(cond, " AND b.speedtest_download >= {v}");
    }
    if let Some(v) = filters.speedtest_download_lt {
        let _ = write!(cond, " AND b.speedtest_download <= {v}");
    }
    if let Some(v) = filters.speedtest_upload_gt {
        let _ = write!(cond, " AND b.speedtest_upload >= {v}");
    }
    if let Some(v) = filters.speedtest_upload_lt {
        let _ = write!(cond, " AND b.speedtest_upload <= {v}");
    }
    if let Some(v) = filters.speedtest_ping_gt {
        let _ = write!(cond, " AND b.speedtest_ping >= {v}");
    }
    if let Some(v) = filters.speedtest_ping_lt {
        let _ = write!(cond, " AND b.speedtest_ping <= {v}");
    }
    if let Some(country) = &filters.country {
        values.push(format!("%{country}%").into());
        let _ = write!(cond, " AND b.country ILIKE ${}", values.len());
    }
    if let Some(isp) = &filters.isp {
        values.push(format!("%{isp}%").into());
        let _ = write!(cond, " AND b.isp ILIKE ${}", values.len());
    }

    cond
}
