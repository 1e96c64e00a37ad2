use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, MigrationTrait, SchemaManager, Table},
    schema::{
        double_null, string, string_null, text_null, timestamp_with_time_zone,
        timestamp_with_time_zone_null,
    },
    sea_query,
};

#[derive(Iden)]
enum Benchmarks {
    Table,
    PublicKey,
    Disk,
    Network,
    Qd64DiskReadSpeed,
    Qd64DiskWriteSpeed,
    BenchmarkTimestamp,
    SpeedtestDownload,
    SpeedtestUpload,
    SpeedtestPing,
    Country,
    Isp,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Benchmarks::Table)
                    .if_not_exists()
                    .col(string(Benchmarks::PublicKey).primary_key())
                    .col(text_null(Benchmarks::Disk))
                    .col(text_null(Benchmarks::Network))
                    .col(string_null(Benchmarks::Qd64DiskReadSpeed))
                    .col(string_null(Benchmarks::Qd64DiskWriteSpeed))
                    .col(timestamp_with_time_zone_null(Benchmarks::BenchmarkTimestamp))
                    .col(double_null(Benchmarks::SpeedtestDownload))
                    .col(double_null(Benchmarks::SpeedtestUpload))
                    .col(double_null(Benchmarks::SpeedtestPing))
                    .col(string_null(Benchmarks::Country))
                    .col(string_null(Benchmarks::Isp))
                    .col(timestamp_with_time_zone(Benchmarks::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Benchmarks::Table).if_exists().to_owned())
            .await
    }
}
