//! Client library for the shardfs master.
//!
//! One fresh connection per call, mirroring the server's one-command-
//! per-connection model. This is the programmatic surface an
//! interactive shell would sit on top of.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod error;

pub use client::{Listing, MasterClient};
pub use error::{ClientError, ClientResult};
