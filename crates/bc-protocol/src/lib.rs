//! bc-protocol: Wire formats for backchannel
//!
//! Two protocols live here:
//!
//! - the announce protocol, a single text line an agent sends to the
//!   driver's rendezvous listener (`PORT:<port>:<name>`, `DIALOG:<title>`)
//! - the remote-call protocol, JSON lines exchanged between the driver and
//!   an agent's callback endpoint once it has been resolved

pub mod announce;
pub mod codec;
pub mod error;
pub mod rpc;

pub use announce::{Announcement, MAX_ANNOUNCE_LENGTH};
pub use codec::AnnounceCodec;
pub use error::ProtocolError;
pub use rpc::{RemoteRequest, RemoteResponse, RemoteStatus, PRIMARY_PATH, SERVICES_PATH};
