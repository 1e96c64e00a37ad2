#![allow(unreachable_pub)]

use sea_orm::{
    entity::prelude::{DeriveRelation, EnumIter},
    prelude::{
        ActiveModelBehavior, DateTimeUtc, DeriveEntityModel, DerivePrimaryKey, PrimaryKeyTrait,
    },
};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "benchmarks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub public_key: String,
    pub disk: Option<String>,
    pub network: Option<String>,
    pub qd64_disk_read_speed: Option<String>,
    pub qd64_disk_write_speed: Option<String>,
    pub benchmark_timestamp: Option<DateTimeUtc>,
    pub speedtest_download: Option<f64>,
    pub speedtest_upload: Option<f64>,
    pub speedtest_ping: Option<f64>,
    pub country: Option<String>,
    pub isp: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
