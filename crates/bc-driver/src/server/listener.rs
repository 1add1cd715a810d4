//! Rendezvous listener
//!
//! Accepts incoming connections and spawns a handler for each announcing
//! agent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::registry::AgentRegistry;
use crate::server::handler::handle_connection;

/// Listen backlog of the rendezvous socket
const BACKLOG: u32 = 1024;

/// How long a connection may stay open without announcing
pub const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listener that feeds announcements into an [`AgentRegistry`]
pub struct RendezvousServer {
    /// Registry receiving the announced endpoints
    registry: Arc<AgentRegistry>,
    /// Cancellation token for shutdown
    cancel: CancellationToken,
    /// Deadline for a connection's announce line
    announce_timeout: Duration,
}

impl RendezvousServer {
    /// Create a new rendezvous server
    pub fn new(registry: Arc<AgentRegistry>, cancel: CancellationToken) -> Self {
        Self {
            registry,
            cancel,
            announce_timeout: ANNOUNCE_TIMEOUT,
        }
    }

    /// Override how long a connection may stay silent
    pub fn with_announce_timeout(mut self, announce_timeout: Duration) -> Self {
        self.announce_timeout = announce_timeout;
        self
    }

    /// Bind `bind_addr` with address reuse and start accepting in the background
    pub async fn spawn(registry: Arc<AgentRegistry>, bind_addr: &str) -> Result<RendezvousHandle> {
        let listener = bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Rendezvous server listening on {}", local_addr);

        let cancel = CancellationToken::new();
        let server = Self::new(registry, cancel.clone());
        tokio::spawn(async move { server.run(listener).await });

        Ok(RendezvousHandle { local_addr, cancel })
    }

    /// Accept connections until cancelled
    pub async fn run(&self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Rendezvous server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((socket, peer_addr)) => self.spawn_handler(socket, peer_addr),
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Handle a new incoming connection on its own task
    fn spawn_handler(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::trace!("New connection from {}", peer_addr);

        let registry = Arc::clone(&self.registry);
        let cancel = self.cancel.clone();
        let announce_timeout = self.announce_timeout;

        tokio::spawn(async move {
            let handled = tokio::time::timeout(
                announce_timeout,
                handle_connection(socket, peer_addr, &registry),
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Connection handler cancelled for {}", peer_addr);
                }
                result = handled => {
                    if result.is_err() {
                        tracing::debug!(
                            "Dropping connection from {}: no announce within {:?}",
                            peer_addr,
                            announce_timeout
                        );
                    }
                }
            }
        });
    }
}

/// Bind a listening socket with `SO_REUSEADDR`
async fn bind(bind_addr: &str) -> Result<TcpListener> {
    let addr = lookup_host(bind_addr)
        .await
        .with_context(|| format!("Failed to resolve {}", bind_addr))?
        .next()
        .with_context(|| format!("No address found for {}", bind_addr))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("Failed to bind to {}", addr))?;
    Ok(socket.listen(BACKLOG)?)
}

/// Handle to a running rendezvous server
///
/// Dropping the handle stops the server.
#[derive(Debug)]
pub struct RendezvousHandle {
    /// Bound address
    local_addr: SocketAddr,
    /// Stops the accept loop and pending handlers
    cancel: CancellationToken,
}

impl RendezvousHandle {
    /// Bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound port
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Check whether the server was shut down
    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RendezvousHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
