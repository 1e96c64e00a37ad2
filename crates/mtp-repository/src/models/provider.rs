#![allow(unreachable_pub)]

use sea_orm::{
    entity::prelude::{DeriveRelation, EnumIter},
    prelude::{
        ActiveModelBehavior, DateTimeUtc, DeriveEntityModel, DerivePrimaryKey, PrimaryKeyTrait,
    },
};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub public_key: String,
    pub address: String,
    pub registered_at: DateTimeUtc,
    pub last_tx_lt: i64,
    pub rate_per_mb_per_day: Option<i64>,
    pub min_bounty: Option<i64>,
    pub min_span: Option<i32>,
    pub max_span: Option<i32>,
    pub max_bag_size_bytes: Option<i64>,
    pub uptime: Option<f64>,
    pub rating: Option<f64>,
    pub status: Option<i16>,
    pub ip: Option<String>,
    pub port: Option<i32>,
    pub ip_info: Option<String>,
    pub is_initialized: bool,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
