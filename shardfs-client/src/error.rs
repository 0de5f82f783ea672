//! Error types for client operations.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error on the connection or local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol error, including in-band `ERREUR` statuses from
    /// the master.
    #[error("protocol error: {0}")]
    Protocol(#[from] shardfs_protocol::ProtocolError),

    /// The local path to upload does not exist.
    #[error("no such path: {path}")]
    NoSuchPath {
        /// The missing path.
        path: std::path::PathBuf,
    },
}
