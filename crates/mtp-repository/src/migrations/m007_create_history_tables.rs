use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{
        ColumnDef, DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table,
    },
    schema::{string, text, timestamp_with_time_zone},
    sea_query,
};

#[derive(Iden)]
enum ProvidersHistory {
    Table,
    Id,
    PublicKey,
    Payload,
    ArchivedAt,
}

#[derive(Iden)]
enum TelemetryHistory {
    Table,
    Id,
    PublicKey,
    Payload,
    ArchivedAt,
}

#[derive(Iden)]
enum BenchmarksHistory {
    Table,
    Id,
    PublicKey,
    Payload,
    ArchivedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProvidersHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProvidersHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(ProvidersHistory::PublicKey))
                    .col(text(ProvidersHistory::Payload))
                    .col(timestamp_with_time_zone(ProvidersHistory::ArchivedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_providers_history_archived_at")
                    .table(ProvidersHistory::Table)
                    .col(ProvidersHistory::ArchivedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TelemetryHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TelemetryHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(TelemetryHistory::PublicKey))
                    .col(text(TelemetryHistory::Payload))
                    .col(timestamp_with_time_zone(TelemetryHistory::ArchivedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_telemetry_history_archived_at")
                    .table(TelemetryHistory::Table)
                    .col(TelemetryHistory::ArchivedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BenchmarksHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BenchmarksHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(BenchmarksHistory::PublicKey))
                    .col(text(BenchmarksHistory::Payload))
                    .col(timestamp_with_time_zone(BenchmarksHistory::ArchivedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_benchmarks_history_archived_at")
                    .table(BenchmarksHistory::Table)
                    .col(BenchmarksHistory::ArchivedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(BenchmarksHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(TelemetryHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(ProvidersHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
