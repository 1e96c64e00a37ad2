mod config;
pub mod error;
mod manager;
mod migrations;
mod models;
mod repositories;
mod types;

pub use config::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
pub use error::{ConfigError, RepositoryError};
pub use manager::RepositoryManager;
pub use repositories::{
    benchmark_repository::BenchmarkRepository,
    contract_repository::ContractRepository,
    provider_repository::{
        ProviderFilters, ProviderRepository, ProviderSort, SortColumn, SortOrder,
    },
    status_repository::StatusRepository,
    system_repository::SystemRepository,
    telemetry_repository::TelemetryRepository,
};
pub use types::{
    BenchmarkUpsert, ContractCheckRow, ContractRelation, ProofCheckUpdate, ProviderCreate,
    ProviderGeoUpdate, ProviderIp, ProviderIpUpdate, ProviderPriceUpdate, ProviderRow,
    ProviderWalletCursor, StatusSample, StorageContractUpsert, TelemetryUpsert, WalletCursorUpdate,
};
