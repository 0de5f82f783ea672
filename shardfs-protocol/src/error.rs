//! Error types for wire protocol operations.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while reading or writing the wire protocol.
///
/// Failing a read mid-sequence leaves the stream unusable; callers are
/// expected to drop the connection rather than resynchronize.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A wire string was not valid UTF-8.
    #[error("invalid UTF-8 in wire string")]
    InvalidUtf8,

    /// A string was too long for the u16 length prefix.
    #[error("string too long for the wire: {len} bytes (max {max})", max = u16::MAX)]
    StringTooLong {
        /// Byte length of the offending string.
        len: usize,
    },

    /// A declared length or count field was negative.
    #[error("negative {field} on the wire: {value}")]
    NegativeField {
        /// Which field carried the bad value.
        field: &'static str,
        /// The value as read.
        value: i64,
    },

    /// A declared payload length does not fit in this platform's
    /// address space.
    #[error("payload length {len} too large to buffer")]
    PayloadTooLarge {
        /// The length as declared on the wire.
        len: u64,
    },

    /// A tree node carried a name that would resolve outside its
    /// destination directory.
    #[error("unsafe node name: {name:?}")]
    UnsafeName {
        /// The offending name.
        name: String,
    },

    /// The peer sent a status string other than the expected one.
    #[error("unexpected status: expected {expected:?}, got {got:?}")]
    UnexpectedStatus {
        /// The status the caller required.
        expected: &'static str,
        /// The status actually received.
        got: String,
    },

    /// The peer reported an in-band error status.
    #[error("peer reported error: {0}")]
    PeerError(String),
}
