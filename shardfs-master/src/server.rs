//! Client-facing master TCP server.
//!
//! Single listener, one spawned task per accepted connection, one
//! command per connection. Fan-out to the slaves runs synchronously on
//! the handler's task, so a shard round trip blocks that client for
//! its full duration. No read or write timeouts are configured.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::MasterConfig;
use crate::coordinator::ShardCoordinator;
use crate::error::{MasterError, MasterResult};
use crate::handlers::{self, HandlerContext};
use crate::registry::SlaveRegistry;

/// Client-facing master server, bound and ready to run.
pub struct MasterServer {
    listener: TcpListener,
    registry: Arc<SlaveRegistry>,
    ctx: Arc<HandlerContext>,
    connections: Arc<Semaphore>,
    probe_attempts: u32,
    probe_delay: std::time::Duration,
    shutdown: Arc<Notify>,
}

impl MasterServer {
    /// Creates the storage root, builds the slave registry and binds
    /// the listener. Probing is a separate step; see
    /// [`Self::probe_slaves`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be created or the
    /// address cannot be bound.
    pub async fn bind(config: MasterConfig) -> MasterResult<Self> {
        tokio::fs::create_dir_all(&config.storage_root).await?;
        let registry = Arc::new(SlaveRegistry::new(config.slaves.clone()));
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!(
            addr = %listener.local_addr()?,
            root = %config.storage_root.display(),
            slaves = registry.len(),
            "master server listening"
        );

        let coordinator = ShardCoordinator::new(Arc::clone(&registry), &config.storage_root);
        let ctx = Arc::new(HandlerContext {
            coordinator,
            storage_root: config.storage_root,
        });

        Ok(Self {
            listener,
            registry,
            ctx,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            probe_attempts: config.probe_attempts,
            probe_delay: config.probe_delay,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is gone.
    pub fn local_addr(&self) -> MasterResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the slave registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SlaveRegistry> {
        Arc::clone(&self.registry)
    }

    /// Handle to signal shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the startup connectivity probe with the configured retry
    /// policy. Returns the number of connected slaves.
    pub async fn probe_slaves(&self) -> usize {
        self.registry
            .probe_with_retry(self.probe_attempts, self.probe_delay)
            .await
    }

    /// Runs the accept loop until shutdown is signaled.
    ///
    /// # Errors
    ///
    /// Returns an error only on listener failure; per-connection errors
    /// are logged and absorbed.
    pub async fn run(self) -> MasterResult<()> {
        loop {
            // Permit acquisition races the shutdown signal so a server
            // at its connection cap still stops promptly.
            let permit = tokio::select! {
                acquired = Arc::clone(&self.connections).acquire_owned() => {
                    match acquired {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                () = self.shutdown.notified() => {
                    info!("master server shutting down");
                    break;
                }
            };

            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((mut stream, peer)) => {
                            debug!(%peer, "client connected");
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                let _permit = permit;
                                match handlers::handle_connection(&mut stream, &ctx).await {
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
                    info!("master server shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Whether an error is the peer hanging up rather than a real fault.
fn is_peer_disconnect(e: &MasterError) -> bool {
    use shardfs_protocol::ProtocolError;
    match e {
        MasterError::Io(io) => io.kind() == std::io::ErrorKind::UnexpectedEof,
        MasterError::Protocol(ProtocolError::Io(io)) => {
            io.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
