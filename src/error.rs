use thiserror::Error;

/// Top-level application error that composes all subsystem errors
#[derive(Error, Debug)]
pub(crate) enum NodeError {
    /// Database/repository errors
    #[error("Repository error: {0}")]
    Repository(#[from] mtp_repository::RepositoryError),

    /// Lite-server gateway errors
    #[error("Chain error: {0}")]
    Chain(#[from] mtp_chain::ChainError),

    /// Peer transport errors
    #[error("Peer error: {0}")]
    Peer(#[from] mtp_peer::PeerError),

    /// Geolocation client errors
    #[error("Geo error: {0}")]
    Geo(#[from] mtp_geo::GeoError),

    /// A per-call deadline expired
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic application error
    #[error("{0}")]
    Other(String),
}
