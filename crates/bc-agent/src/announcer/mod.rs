//! Announcing to the driver's rendezvous listener
//!
//! Every announcement travels over its own short-lived connection: connect,
//! write one line, close.

mod backoff;

pub use backoff::ExponentialBackoff;

use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::codec::FramedWrite;

use bc_core::config::AgentConfig;
use bc_protocol::{AnnounceCodec, Announcement};

use crate::error::ServeError;

/// Sends announce lines to one driver
#[derive(Debug, Clone)]
pub struct Announcer {
    /// Driver rendezvous address (`host:port`)
    driver_address: String,
    /// How long to keep retrying an unreachable driver
    connect_timeout: Duration,
}

impl Announcer {
    /// Create an announcer for the driver at `driver_address`
    pub fn new(driver_address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            driver_address: driver_address.into(),
            connect_timeout,
        }
    }

    /// Create an announcer from the agent configuration
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.driver_address.clone(), config.connect_timeout)
    }

    /// Get the driver address
    pub fn driver_address(&self) -> &str {
        &self.driver_address
    }

    /// Announce the remote-call port under `name`
    pub async fn announce_port(&self, port: u16, name: &str) -> Result<(), ServeError> {
        tracing::info!(
            "Announcing port {} as \"{}\" to {}",
            port,
            name,
            self.driver_address
        );
        self.announce(Announcement::port(port, name)).await
    }

    /// Report a dialog that was dismissed automatically
    pub async fn announce_dialog(&self, title: &str) -> Result<(), ServeError> {
        tracing::debug!("Reporting dialog \"{}\"", title);
        self.announce(Announcement::dialog(title)).await
    }

    /// Send a single announcement over a fresh connection
    pub async fn announce(&self, announcement: Announcement) -> Result<(), ServeError> {
        let stream = self.connect().await?;
        let mut framed = FramedWrite::new(stream, AnnounceCodec::new());
        framed.send(announcement).await?;
        framed.close().await?;
        Ok(())
    }

    /// Connect to the driver, retrying until the connect timeout passes
    async fn connect(&self) -> Result<TcpStream, ServeError> {
        let deadline = Instant::now() + self.connect_timeout;
        let mut backoff = ExponentialBackoff::default();

        loop {
            match TcpStream::connect(&self.driver_address).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    let delay = backoff.next_delay();
                    if Instant::now() + delay >= deadline {
                        return Err(ServeError::DriverUnreachable {
                            address: self.driver_address.clone(),
                            timeout: self.connect_timeout,
                            source: e,
                        });
                    }
                    tracing::debug!(
                        "Driver at {} not reachable: {}. Retrying in {:?}",
                        self.driver_address,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
