pub(crate) mod benchmark;
pub(crate) mod benchmark_history;
pub(crate) mod provider;
pub(crate) mod provider_history;
pub(crate) mod status;
pub(crate) mod status_history;
pub(crate) mod storage_contract;
pub(crate) mod system_param;
pub(crate) mod telemetry;
pub(crate) mod telemetry_history;
