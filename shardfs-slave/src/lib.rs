//! shardfs storage worker.
//!
//! A slave holds one positional shard of every uploaded file in a flat
//! directory: shard `i` of logical file `name` lives at `name.part<i>`.
//! The TCP server answers the master's slave-facing command set
//! (CONNECT, UPLOAD_PART, DOWNLOAD_PART, LIST, DELETE), one command per
//! connection.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod handlers;
pub mod server;
pub mod store;

pub use error::{SlaveError, SlaveResult};
pub use server::{SlaveServer, SlaveServerConfig};
pub use store::ShardStore;
