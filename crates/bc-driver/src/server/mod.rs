//! Rendezvous server implementation

mod handler;
mod listener;

pub use handler::{apply_announcement, handle_connection, Handled};
pub use listener::{RendezvousHandle, RendezvousServer, ANNOUNCE_TIMEOUT};
