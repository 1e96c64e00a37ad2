use sea_orm_migration::{MigrationTrait, MigratorTrait, async_trait::async_trait};

mod m001_create_providers;
mod m002_create_telemetry;
mod m003_create_benchmarks;
mod m004_create_statuses;
mod m005_create_storage_contracts;
mod m006_create_system_params;
mod m007_create_history_tables;
mod m008_create_parse_speed_fn;

pub struct Migrator;

#[async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_providers::Migration),
            Box::new(m002_create_telemetry::Migration),
            Box::new(m003_create_benchmarks::Migration),
            Box::new(m004_create_statuses::Migration),
            Box::new(m005_create_storage_contracts::Migration),
            Box::new(m006_create_system_params::Migration),
            Box::new(m007_create_history_tables::Migration),
            Box::new(m008_create_parse_speed_fn::Migration),
        ]
    }
}
