use std::sync::Arc;

use crate::{
    config::Config,
    services::{IngestService, ProviderService},
};

/// Shared state handed to the HTTP controllers. The periodic layer wires
/// its own narrower dependencies and does not go through here.
pub(crate) struct Context {
    config: Arc<Config>,
    provider_service: Arc<ProviderService>,
    ingest_service: Arc<IngestService>,
}

impl Context {
    pub(crate) fn new(
        config: Arc<Config>,
        provider_service: Arc<ProviderService>,
        ingest_service: Arc<IngestService>,
    ) -> Self {
        Self {
            config,
            provider_service,
            ingest_service,
        }
    }

    pub(crate) fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub(crate) fn provider_service(&self) -> &Arc<ProviderService> {
        &self.provider_service
    }

    pub(crate) fn ingest_service(&self) -> &Arc<IngestService> {
        &self.ingest_service
    }
}
