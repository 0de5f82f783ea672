//! Error types for the coordinator.

use thiserror::Error;

/// Result type for master operations.
pub type MasterResult<T> = Result<T, MasterError>;

/// Errors that can occur in the coordinator.
///
/// Per-slave fan-out failures are not represented here: they are caught
/// and logged at the fan-out site, and the affected shard or slave is
/// skipped (best-effort semantics).
#[derive(Debug, Error)]
pub enum MasterError {
    /// I/O error on storage or network.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol error on a connection.
    #[error("protocol error: {0}")]
    Protocol(#[from] shardfs_protocol::ProtocolError),

    /// A client-supplied name that would escape the storage root.
    #[error("invalid name: {name:?}")]
    InvalidName {
        /// The offending name.
        name: String,
    },
}
