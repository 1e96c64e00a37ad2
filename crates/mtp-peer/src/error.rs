use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("query timed out")]
    Timeout,

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("peer answered with unexpected message")]
    UnexpectedResponse,

    #[error("peer error: {0}")]
    Remote(String),

    #[error("dht lookup failed: {0}")]
    Dht(String),

    #[error("response exceeds size limit ({0} bytes)")]
    Oversized(usize),
}

pub type Result<T> = std::result::Result<T, PeerError>;
