//! Slave registry and startup connectivity probe.
//!
//! The registry holds the configured slave endpoints in shard-index
//! order. Endpoints are never added or removed at runtime; only their
//! liveness flags change, and only during probing. The flags are
//! atomics so handler tasks reading them concurrently with a probe see
//! a well-defined value.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::slave_link::SlaveLink;

/// One configured slave endpoint with its liveness flag.
#[derive(Debug)]
pub struct SlaveEndpoint {
    address: String,
    port: u16,
    connected: AtomicBool,
    reconnect_attempts: AtomicU32,
}

impl SlaveEndpoint {
    /// Creates a disconnected endpoint.
    #[must_use]
    pub const fn new(address: String, port: u16) -> Self {
        Self {
            address,
            port,
            connected: AtomicBool::new(false),
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    /// `address:port` form used to open connections.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Current liveness flag, as set by the last probe.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of failed probe attempts so far.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    fn record_probe(&self, connected: bool) {
        if !connected {
            self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        }
        self.connected.store(connected, Ordering::Release);
    }
}

/// Ordered list of configured slaves.
///
/// Ordering is significant: the endpoint at position `i` (0-based)
/// stores shard `i + 1` of every uploaded file.
#[derive(Debug)]
pub struct SlaveRegistry {
    endpoints: Vec<SlaveEndpoint>,
}

impl SlaveRegistry {
    /// Builds the registry from configured `(address, port)` pairs.
    #[must_use]
    pub fn new(slaves: Vec<(String, u16)>) -> Self {
        Self {
            endpoints: slaves
                .into_iter()
                .map(|(address, port)| SlaveEndpoint::new(address, port))
                .collect(),
        }
    }

    /// The configured endpoints in shard-index order.
    #[must_use]
    pub fn endpoints(&self) -> &[SlaveEndpoint] {
        &self.endpoints
    }

    /// Number of configured slaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no slaves are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of endpoints currently flagged connected.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_connected()).count()
    }

    /// Probes every endpoint once: connect, CONNECT handshake, close.
    ///
    /// Sets each liveness flag from the outcome and returns the number
    /// of connected endpoints.
    pub async fn probe_all(&self) -> usize {
        for endpoint in &self.endpoints {
            let addr = endpoint.addr();
            let outcome = async {
                let mut link = SlaveLink::connect(&addr).await?;
                link.handshake().await
            }
            .await;

            match outcome {
                Ok(()) => {
                    info!(slave = %addr, "slave connected");
                    endpoint.record_probe(true);
                }
                Err(e) => {
                    warn!(slave = %addr, error = %e, "slave probe failed");
                    endpoint.record_probe(false);
                }
            }
        }
        self.connected_count()
    }

    /// Probes up to `max_attempts` rounds with `delay` between rounds,
    /// stopping early once every endpoint is connected.
    ///
    /// Returns the final connected count. This runs once at startup;
    /// there is no steady-state health check, so a slave dying later is
    /// only noticed when an operation against it fails.
    pub async fn probe_with_retry(&self, max_attempts: u32, delay: Duration) -> usize {
        let mut connected = 0;
        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "probing slaves");
            connected = self.probe_all().await;
            info!(connected, total = self.len(), "probe round finished");
            if connected == self.len() {
                break;
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        connected
    }
}
