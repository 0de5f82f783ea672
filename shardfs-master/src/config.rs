//! Master configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of startup probe rounds.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;

/// Default delay between probe rounds.
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_secs(5);

/// Configuration for the master server.
///
/// The slave list is fixed for the lifetime of the process; its order
/// determines shard index assignment.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Address to bind the client-facing listener to.
    pub bind_addr: SocketAddr,
    /// Local storage root: directory-transfer trees and per-download
    /// temporary shard buffers.
    pub storage_root: PathBuf,
    /// Configured slave endpoints as `(address, port)`, in shard-index
    /// order.
    pub slaves: Vec<(String, u16)>,
    /// Maximum startup probe rounds.
    pub probe_attempts: u32,
    /// Delay between probe rounds.
    pub probe_delay: Duration,
    /// Maximum concurrent client connections admitted.
    pub max_connections: usize,
}

impl MasterConfig {
    /// Creates a config with default probe settings and connection cap.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr,
            storage_root: storage_root.into(),
            slaves: Vec::new(),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_delay: DEFAULT_PROBE_DELAY,
            max_connections: 1024,
        }
    }

    /// Sets the slave endpoints, in shard-index order.
    #[must_use]
    pub fn with_slaves(mut self, slaves: Vec<(String, u16)>) -> Self {
        self.slaves = slaves;
        self
    }

    /// Sets the probe retry policy.
    #[must_use]
    pub const fn with_probe_policy(mut self, attempts: u32, delay: Duration) -> Self {
        self.probe_attempts = attempts;
        self.probe_delay = delay;
        self
    }

    /// Sets the connection cap.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}
