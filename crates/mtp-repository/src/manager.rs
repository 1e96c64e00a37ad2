use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

pub use crate::config::RepositoryManagerConfig;
use crate::{
    error::RepositoryError,
    migrations::Migrator,
    repositories::{
        benchmark_repository::BenchmarkRepository, contract_repository::ContractRepository,
        provider_repository::ProviderRepository, status_repository::StatusRepository,
        system_repository::SystemRepository, telemetry_repository::TelemetryRepository,
    },
};

pub struct RepositoryManager {
    provider_repository: ProviderRepository,
    telemetry_repository: TelemetryRepository,
    benchmark_repository: BenchmarkRepository,
    status_repository: StatusRepository,
    contract_repository: ContractRepository,
    system_repository: SystemRepository,
}

impl RepositoryManager {
    /// Connects to Postgres and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the connection cannot be established
    /// (database missing, bad credentials) or a migration fails.
    pub async fn connect(config: &RepositoryManagerConfig) -> Result<Self, RepositoryError> {
        let mut opt = ConnectOptions::new(config.connection_string());
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        let conn = Arc::new(Database::connect(opt).await?);

        Migrator::up(conn.as_ref(), None).await?;

        Ok(RepositoryManager {
            provider_repository: ProviderRepository::new(Arc::clone(&conn)),
            telemetry_repository: TelemetryRepository::new(Arc::clone(&conn)),
            benchmark_repository: BenchmarkRepository::new(Arc::clone(&conn)),
            status_repository: StatusRepository::new(Arc::clone(&conn)),
            contract_repository: ContractRepository::new(Arc::clone(&conn)),
            system_repository: SystemRepository::new(Arc::clone(&conn)),
        })
    }

    pub fn provider_repository(&self) -> ProviderRepository {
        self.provider_repository.clone()
    }

    pub fn telemetry_repository(&self) -> TelemetryRepository {
        self.telemetry_repository.clone()
    }

    pub fn benchmark_repository(&self) -> BenchmarkRepository {
        self.benchmark_repository.clone()
    }

    pub fn status_repository(&self) -> StatusRepository {
        self.status_repository.clone()
    }

    pub fn contract_repository(&self) -> ContractRepository {
        self.contract_repository.clone()
    }

    pub fn system_repository(&self) -> SystemRepository {
        self.system_repository.clone()
    }
}
