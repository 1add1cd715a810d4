//! bc-agent: Dial-back agent for backchannel
//!
//! The agent runs inside a controlled application. It binds a remote-call
//! endpoint, announces that endpoint to the driver's rendezvous listener,
//! and serves the driver's requests until told to exit.

pub mod agent;
pub mod announcer;
pub mod error;
pub mod library;
pub mod server;
pub mod state;

pub use agent::{Agent, AgentHandle};
pub use announcer::Announcer;
pub use error::{KeywordError, ServeError};
pub use library::{KeywordLibrary, KeywordSet};
pub use state::AgentState;
