use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("missing config file: {0}")]
    MissingConfig(String),

    #[error(transparent)]
    MissingSecret(#[from] mtp_repository::ConfigError),
}
