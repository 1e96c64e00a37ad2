use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, MigrationTrait, SchemaManager, Table},
    schema::{string, text},
    sea_query,
};

#[derive(Iden)]
enum SystemParams {
    Table,
    Key,
    Value,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemParams::Table)
                    .if_not_exists()
                    .col(string(SystemParams::Key).primary_key())
                    .col(text(SystemParams::Value))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SystemParams::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
