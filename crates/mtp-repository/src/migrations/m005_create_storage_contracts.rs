use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table},
    schema::{
        big_integer, small_integer_null, string, timestamp_with_time_zone_null,
    },
    sea_query,
};

#[derive(Iden)]
enum StorageContracts {
    Table,
    Address,
    ProviderAddress,
    BagId,
    OwnerAddress,
    Size,
    ChunkSize,
    LastTxLt,
    Reason,
    ReasonTimestamp,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StorageContracts::Table)
                    .if_not_exists()
                    .col(string(StorageContracts::Address))
                    .col(string(StorageContracts::ProviderAddress))
                    .col(string(StorageContracts::BagId))
                    .col(string(StorageContracts::OwnerAddress))
                    .col(big_integer(StorageContracts::Size))
                    .col(big_integer(StorageContracts::ChunkSize))
                    .col(big_integer(StorageContracts::LastTxLt))
                    .col(small_integer_null(StorageContracts::Reason))
                    .col(timestamp_with_time_zone_null(StorageContracts::ReasonTimestamp))
                    .primary_key(
                        Index::create()
                            .col(StorageContracts::Address)
                            .col(StorageContracts::ProviderAddress),
                    )
                    .to_owned(),
            )
            .await?;

        // Status aggregation scans by provider within the 24h reason window.
        manager
            .create_index(
                Index::create()
                    .name("idx_storage_contracts_provider")
                    .table(StorageContracts::Table)
                    .col(StorageContracts::ProviderAddress)
                    .col(StorageContracts::ReasonTimestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StorageContracts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
