use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("gateway returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("invalid account address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;
