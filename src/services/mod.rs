mod ingest_service;
mod provider_service;

pub(crate) use ingest_service::IngestService;
pub(crate) use provider_service::{ProviderService, ServiceError};
