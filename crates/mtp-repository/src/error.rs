use thiserror::Error;

/// Error types for repository/database operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Wraps all SeaORM errors
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid persisted value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing secret: {0}")]
    MissingSecret(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
