use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table},
    schema::{
        big_integer, big_integer_null, boolean, double_null, integer_null, small_integer_null,
        string, string_null, text_null, timestamp_with_time_zone, timestamp_with_time_zone_null,
    },
    sea_query,
};

#[derive(Iden)]
enum Providers {
    Table,
    PublicKey,
    Address,
    RegisteredAt,
    LastTxLt,
    RatePerMbPerDay,
    MinBounty,
    MinSpan,
    MaxSpan,
    MaxBagSizeBytes,
    Uptime,
    Rating,
    Status,
    Ip,
    Port,
    IpInfo,
    IsInitialized,
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
                    .table(Providers::Table)
                    .if_not_exists()
                    .col(string(Providers::PublicKey).primary_key())
                    .col(string(Providers::Address))
                    .col(timestamp_with_time_zone(Providers::RegisteredAt))
                    .col(big_integer(Providers::LastTxLt).default(0))
                    .col(big_integer_null(Providers::RatePerMbPerDay))
                    .col(big_integer_null(Providers::MinBounty))
                    .col(integer_null(Providers::MinSpan))
                    .col(integer_null(Providers::MaxSpan))
                    .col(big_integer_null(Providers::MaxBagSizeBytes))
                    .col(double_null(Providers::Uptime))
                    .col(double_null(Providers::Rating))
                    .col(small_integer_null(Providers::Status))
                    .col(string_null(Providers::Ip))
                    .col(integer_null(Providers::Port))
                    .col(text_null(Providers::IpInfo))
                    .col(boolean(Providers::IsInitialized).default(false))
                    .col(timestamp_with_time_zone_null(Providers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // The contract-discovery join goes through the wallet address.
        manager
            .create_index(
                Index::create()
                    .name("idx_providers_address")
                    .table(Providers::Table)
                    .col(Providers::Address)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Providers::Table).if_exists().to_owned())
            .await
    }
}
