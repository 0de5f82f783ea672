//! Binary wire protocol for shardfs.
//!
//! The master, the slaves and the client library all speak the same
//! stream-oriented binary protocol. There is no message envelope: each
//! command string implies a fixed sequence of typed fields that both
//! peers know out-of-band, read until the sequence is exhausted.
//!
//! # Wire Primitives
//!
//! ```text
//! string  ─ u16 big-endian byte length + UTF-8 bytes
//! bool    ─ 1 byte (0 = false, nonzero = true)
//! i32     ─ 4 bytes big-endian signed
//! i64     ─ 8 bytes big-endian signed
//! payload ─ exactly N raw bytes, N declared by a preceding field
//! ```
//!
//! Every exchange begins with a command string. Unknown commands are
//! answered in-band with [`UNKNOWN_COMMAND_REPLY`] and the connection is
//! closed normally.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod command;
mod error;
pub mod naming;
pub mod tree;

pub use command::{ClientCommand, SlaveCommand};
pub use error::{ProtocolError, ProtocolResult};
pub use tree::Node;

/// Reply to a successful CONNECT handshake, on both servers.
pub const STATUS_CONNECTED: &str = "CONNECTE";

/// Success status preceding a payload-bearing response.
pub const STATUS_OK: &str = "OK";

/// Slave reply when a requested shard does not exist.
pub const STATUS_SHARD_MISSING: &str = "ERROR";

/// Slave reply when a shard delete fails.
pub const STATUS_DELETE_FAILED: &str = "ERREUR";

/// Prefix of in-band error statuses on the download paths.
pub const ERROR_PREFIX: &str = "ERREUR";

/// In-band reply to an unrecognized command string.
pub const UNKNOWN_COMMAND_REPLY: &str = "Commande inconnue";
