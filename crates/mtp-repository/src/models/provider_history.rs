#![allow(unreachable_pub)]

use sea_orm::{
    entity::prelude::{DeriveRelation, EnumIter},
    prelude::{
        ActiveModelBehavior, DateTimeUtc, DeriveEntityModel, DerivePrimaryKey, PrimaryKeyTrait,
    },
};

/// Snapshot of a provider row taken before a commercial-terms update. The
/// superseded row is kept as a JSON payload rather than a column-for-column
/// copy; history is only read back by humans and the retention sweeper.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "providers_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub public_key: String,
    pub payload: String,
    pub archived_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
