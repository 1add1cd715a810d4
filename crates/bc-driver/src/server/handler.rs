//! Rendezvous connection handler
//!
//! Reads the single announce line of one connection and applies it to the
//! registry.

use std::net::SocketAddr;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use bc_core::types::AgentEndpoint;
use bc_protocol::{AnnounceCodec, Announcement};

use crate::registry::AgentRegistry;

/// Outcome of one announce line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// A `PORT:` line added this endpoint
    Registered(AgentEndpoint),
    /// A `DIALOG:` line was logged
    Dialog(String),
    /// The line was not understood, or the connection carried none
    Ignored,
}

/// Read one announce line from `socket` and apply it
pub async fn handle_connection<S>(socket: S, peer: SocketAddr, registry: &AgentRegistry) -> Handled
where
    S: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(socket, AnnounceCodec::new());

    match framed.next().await {
        Some(Ok(announcement)) => apply_announcement(announcement, peer, registry),
        Some(Err(e)) => {
            tracing::warn!("Dropping announce from {}: {}", peer, e);
            Handled::Ignored
        }
        None => {
            tracing::debug!("Connection from {} closed without announcing", peer);
            Handled::Ignored
        }
    }
}

/// Apply a parsed announcement from `peer` to the registry
pub fn apply_announcement(
    announcement: Announcement,
    peer: SocketAddr,
    registry: &AgentRegistry,
) -> Handled {
    match announcement {
        Announcement::Port { port, name } => {
            let address = SocketAddr::new(peer.ip(), port).to_string();
            tracing::debug!("Registered agent \"{}\" at {}", name, address);
            registry.append(address.clone(), name.clone());
            Handled::Registered(AgentEndpoint::new(address, name))
        }
        Announcement::Dialog { title } => {
            tracing::info!("Security Warning \"{}\" was accepted automatically", title);
            Handled::Dialog(title)
        }
        Announcement::Unknown(line) => {
            tracing::debug!("Unknown message \"{}\" from {}", line, peer);
            Handled::Ignored
        }
    }
}
