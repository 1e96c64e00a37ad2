mod error;
mod loader;

use mtp_chain::ChainClientConfig;
use mtp_geo::GeoClientConfig;
use mtp_peer::PeerClientConfig;
use mtp_repository::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
use serde::Deserialize;

pub(crate) use error::ConfigError;
pub(crate) use loader::initialize_configuration;

use crate::controllers::http_api_controller::HttpApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "mytonprovider_node=info,mtp_chain=info,mtp_peer=info,mtp_repository=info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9095
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SystemConfig {
    /// Optional 64-hex ed25519 seed for the node's transport identity.
    /// A fresh key is generated when absent.
    #[serde(default)]
    pub key_seed: Option<String>,
    /// History retention horizon in days.
    #[serde(default = "default_history_days")]
    pub store_history_days: i32,
    /// Upper bound on providers probed per liveness tick.
    #[serde(default = "default_liveness_batch_size")]
    pub liveness_batch_size: usize,
}

fn default_history_days() -> i32 {
    90
}

fn default_liveness_batch_size() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChainConfig {
    /// Master wallet receiving registration transactions.
    pub master_address: String,
    #[serde(flatten)]
    pub client: ChainClientConfig,
}

/// Raw deserialized configuration; secrets are resolved in [`ConfigRaw::resolve`].
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigRaw {
    pub system: SystemConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub peer: PeerClientConfig,
    #[serde(default)]
    pub geo: GeoClientConfig,
    pub repository: RepositoryManagerConfigRaw,
    pub http_api: HttpApiConfig,
}

impl ConfigRaw {
    pub(crate) fn resolve(mut self) -> Result<Config, ConfigError> {
        if self.repository.password.is_none() {
            self.repository.password = std::env::var("DB_PASSWORD").ok();
        }

        let repository = self.repository.resolve()?;

        Ok(Config {
            system: self.system,
            logger: self.logger,
            metrics: self.metrics,
            chain: self.chain,
            peer: self.peer,
            geo: self.geo,
            repository,
            http_api: self.http_api,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub system: SystemConfig,
    pub logger: LoggerConfig,
    pub metrics: MetricsConfig,
    pub chain: ChainConfig,
    pub peer: PeerClientConfig,
    pub geo: GeoClientConfig,
    pub repository: RepositoryManagerConfig,
    pub http_api: HttpApiConfig,
}
