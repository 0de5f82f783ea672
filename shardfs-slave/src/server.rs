//! Storage worker TCP server.
//!
//! Single listener, one spawned task per accepted connection, one
//! command per connection. No read or write timeouts are configured: a
//! stalled peer holds its task until the peer goes away.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::error::SlaveResult;
use crate::handlers;
use crate::store::ShardStore;

/// Configuration for the storage worker server.
#[derive(Debug, Clone)]
pub struct SlaveServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Storage root for shard files.
    pub storage_dir: std::path::PathBuf,
    /// Maximum concurrent connections admitted.
    pub max_connections: usize,
}

impl SlaveServerConfig {
    /// Creates a config with the default connection cap.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, storage_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            bind_addr,
            storage_dir: storage_dir.into(),
            max_connections: 1024,
        }
    }

    /// Sets the connection cap.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

/// Storage worker TCP server, bound and ready to run.
pub struct SlaveServer {
    listener: TcpListener,
    store: ShardStore,
    connections: Arc<Semaphore>,
    shutdown: Arc<Notify>,
}

impl SlaveServer {
    /// Opens the shard store and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be created or the
    /// address cannot be bound.
    pub async fn bind(config: SlaveServerConfig) -> SlaveResult<Self> {
        let store = ShardStore::open(&config.storage_dir).await?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!(
            addr = %listener.local_addr()?,
            root = %store.root().display(),
            "slave server listening"
        );
        Ok(Self {
            listener,
            store,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is gone.
    pub fn local_addr(&self) -> SlaveResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to signal shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the accept loop until shutdown is signaled.
    ///
    /// # Errors
    ///
    /// Returns an error only on listener failure; per-connection errors
    /// are logged and absorbed.
    pub async fn run(self) -> SlaveResult<()> {
        loop {
            // The permit bounds concurrent handlers; it rides in the
            // spawned task and frees on completion. Acquisition races
            // the shutdown signal so a saturated server still stops.
            let permit = tokio::select! {
                acquired = Arc::clone(&self.connections).acquire_owned() => {
                    match acquired {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                () = self.shutdown.notified() => {
                    info!("slave server shutting down");
                    break;
                }
            };

            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((mut stream, peer)) => {
                            debug!(%peer, "connection accepted");
                            let store = self.store.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                match handlers::handle_connection(&mut stream, &store).await {
                                    Ok(()) => {}
                                    Err(e) if is_peer_disconnect(&e) => {
                                        debug!(%peer, "connection closed by peer");
                                    }
                                    Err(e) => {
                                        warn!(%peer, error = %e, "connection failed");
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "accept failed");
                        }
                    }
                }
                () = self.shutdown.notified() => {
                    info!("slave server shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Whether an error is the peer hanging up rather than a real fault.
fn is_peer_disconnect(e: &crate::SlaveError) -> bool {
    use shardfs_protocol::ProtocolError;
    match e {
        crate::SlaveError::Io(io) => io.kind() == std::io::ErrorKind::UnexpectedEof,
        crate::SlaveError::Protocol(ProtocolError::Io(io)) => {
            io.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
