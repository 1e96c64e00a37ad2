use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, MigrationTrait, SchemaManager, Table},
    schema::{
        boolean_null, double_null, float_null, integer_null, string, string_null, text_null,
        timestamp_with_time_zone,
    },
    sea_query,
};

#[derive(Iden)]
enum Telemetry {
    Table,
    PublicKey,
    StorageGitHash,
    ProviderGitHash,
    DiskName,
    CpuName,
    CpuProductName,
    UnameSysname,
    UnameRelease,
    UnameVersion,
    UnameMachine,
    CpuLoad,
    Pings,
    Benchmarks,
    TotalSpace,
    UsedSpace,
    FreeSpace,
    UsedProviderSpace,
    TotalProviderSpace,
    TotalSwap,
    UsageSwap,
    SwapUsagePercent,
    UsageRam,
    TotalRam,
    RamUsagePercent,
    CpuNumber,
    CpuIsVirtual,
    XRealIp,
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
                    .table(Telemetry::Table)
                    .if_not_exists()
                    .col(string(Telemetry::PublicKey).primary_key())
                    .col(string_null(Telemetry::StorageGitHash))
                    .col(string_null(Telemetry::ProviderGitHash))
                    .col(string_null(Telemetry::DiskName))
                    .col(string_null(Telemetry::CpuName))
                    .col(string_null(Telemetry::CpuProductName))
                    .col(string_null(Telemetry::UnameSysname))
                    .col(string_null(Telemetry::UnameRelease))
                    .col(string_null(Telemetry::UnameVersion))
                    .col(string_null(Telemetry::UnameMachine))
                    .col(text_null(Telemetry::CpuLoad))
                    .col(text_null(Telemetry::Pings))
                    .col(text_null(Telemetry::Benchmarks))
                    .col(double_null(Telemetry::TotalSpace))
                    .col(double_null(Telemetry::UsedSpace))
                    .col(double_null(Telemetry::FreeSpace))
                    .col(double_null(Telemetry::UsedProviderSpace))
                    .col(double_null(Telemetry::TotalProviderSpace))
                    .col(float_null(Telemetry::TotalSwap))
                    .col(float_null(Telemetry::UsageSwap))
                    .col(float_null(Telemetry::SwapUsagePercent))
                    .col(float_null(Telemetry::UsageRam))
                    .col(float_null(Telemetry::TotalRam))
                    .col(float_null(Telemetry::RamUsagePercent))
                    .col(integer_null(Telemetry::CpuNumber))
                    .col(boolean_null(Telemetry::CpuIsVirtual))
                    .col(string_null(Telemetry::XRealIp))
                    .col(timestamp_with_time_zone(Telemetry::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Telemetry::Table).if_exists().to_owned())
            .await
    }
}
