//! Error types for the storage worker.

use thiserror::Error;

/// Result type for slave operations.
pub type SlaveResult<T> = Result<T, SlaveError>;

/// Errors that can occur in the storage worker.
#[derive(Debug, Error)]
pub enum SlaveError {
    /// I/O error on storage or network.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol error on a connection.
    #[error("protocol error: {0}")]
    Protocol(#[from] shardfs_protocol::ProtocolError),

    /// The requested shard file does not exist.
    #[error("shard not found: {name}")]
    ShardNotFound {
        /// Full physical shard filename.
        name: String,
    },

    /// A shard name that would escape the storage root.
    #[error("invalid shard name: {name:?}")]
    InvalidName {
        /// The offending name.
        name: String,
    },
}
