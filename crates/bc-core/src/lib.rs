//! bc-core: Core abstractions and configuration for backchannel
//!
//! This crate provides the shared types, error taxonomy and configuration
//! structures used by the driver and the agent.

pub mod config;
pub mod error;
pub mod options;
pub mod time;
pub mod types;

pub use error::{ConfigError, DriverError, RemoteError};
pub use options::AgentOptions;
pub use types::{AgentEndpoint, Generation};
