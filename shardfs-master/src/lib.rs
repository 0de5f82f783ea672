//! shardfs coordinator.
//!
//! The master owns the client-facing protocol. Uploaded files are split
//! into contiguous shards, one per configured slave in registry order,
//! and reassembled on download. Directory trees take a separate,
//! unsharded path into the master's own storage root.
//!
//! # Architecture
//!
//! ```text
//! client ──► MasterServer ──► ShardCoordinator ──► SlaveLink (per shard)
//!                │                   │
//!                │                   └─► SlaveRegistry (order + liveness)
//!                └─► directory transfer (master-local, no slaves)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
mod error;
mod handlers;
pub mod registry;
pub mod server;
pub mod slave_link;
pub mod split;

pub use config::MasterConfig;
pub use coordinator::ShardCoordinator;
pub use error::{MasterError, MasterResult};
pub use registry::{SlaveEndpoint, SlaveRegistry};
pub use server::MasterServer;
