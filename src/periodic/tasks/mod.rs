pub(crate) mod contract_sync;
pub(crate) mod discovery;
pub(crate) mod geo_enrich;
pub(crate) mod liveness;
pub(crate) mod proof_check;
pub(crate) mod rating;
pub(crate) mod retention;
pub(crate) mod telemetry_flush;
pub(crate) mod uptime;

#[cfg(test)]
pub(crate) mod testutil;
