pub(crate) mod benchmark_repository;
pub(crate) mod contract_repository;
pub(crate) mod provider_repository;
pub(crate) mod status_repository;
pub(crate) mod system_repository;
pub(crate) mod telemetry_repository;
