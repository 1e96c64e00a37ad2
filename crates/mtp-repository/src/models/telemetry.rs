#![allow(unreachable_pub)]

use sea_orm::{
    entity::prelude::{DeriveRelation, EnumIter},
    prelude::{
        ActiveModelBehavior, DateTimeUtc, DeriveEntityModel, DerivePrimaryKey, PrimaryKeyTrait,
    },
};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "telemetry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub public_key: String,
    pub storage_git_hash: Option<String>,
    pub provider_git_hash: Option<String>,
    pub disk_name: Option<String>,
    pub cpu_name: Option<String>,
    pub cpu_product_name: Option<String>,
    pub uname_sysname: Option<String>,
    pub uname_release: Option<String>,
    pub uname_version: Option<String>,
    pub uname_machine: Option<String>,
    pub cpu_load: Option<String>,
    pub pings: Option<String>,
    pub benchmarks: Option<String>,
    pub total_space: Option<f64>,
    pub used_space: Option<f64>,
    pub free_space: Option<f64>,
    pub used_provider_space: Option<f64>,
    pub total_provider_space: Option<f64>,
    pub total_swap: Option<f32>,
    pub usage_swap: Option<f32>,
    pub swap_usage_percent: Option<f32>,
    pub usage_ram: Option<f32>,
    pub total_ram: Option<f32>,
    pub ram_usage_percent: Option<f32>,
    pub cpu_number: Option<i32>,
    pub cpu_is_virtual: Option<bool>,
    pub x_real_ip: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
