use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{
        ColumnDef, DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table,
    },
    schema::{boolean, string, timestamp_with_time_zone},
    sea_query,
};

#[derive(Iden)]
enum Statuses {
    Table,
    PublicKey,
    IsOnline,
    CheckTime,
}

#[derive(Iden)]
enum StatusesHistory {
    Table,
    Id,
    PublicKey,
    IsOnline,
    CheckTime,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Statuses::Table)
                    .if_not_exists()
                    .col(string(Statuses::PublicKey).primary_key())
                    .col(boolean(Statuses::IsOnline))
                    .col(timestamp_with_time_zone(Statuses::CheckTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StatusesHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StatusesHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(StatusesHistory::PublicKey))
                    .col(boolean(StatusesHistory::IsOnline))
                    .col(timestamp_with_time_zone(StatusesHistory::CheckTime))
                    .to_owned(),
            )
            .await?;

        // The uptime rollup groups by pubkey; the sweeper deletes by time.
        manager
            .create_index(
                Index::create()
                    .name("idx_statuses_history_public_key")
                    .table(StatusesHistory::Table)
                    .col(StatusesHistory::PublicKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_statuses_history_check_time")
                    .table(StatusesHistory::Table)
                    .col(StatusesHistory::CheckTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StatusesHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Statuses::Table).if_exists().to_owned())
            .await
    }
}
