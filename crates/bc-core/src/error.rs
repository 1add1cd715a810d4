//! Core error types for backchannel

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Message prefix of every transport failure towards an agent
pub const CONNECTION_BROKEN: &str = "Connection to remote server broken:";

/// Message prefix of every malformed-response failure
pub const PROTOCOL_ERROR: &str = "ProtocolError";

/// Top-level error type for driver operations
#[derive(Error, Debug)]
pub enum DriverError {
    /// No matching agent announced itself in time
    #[error("Agent port not received before timeout ({timeout:?})")]
    AgentTimeout { timeout: Duration },

    /// The application kept answering pings until the deadline
    #[error("Application was not closed before timeout ({timeout:?})")]
    NotClosed { timeout: Duration },

    /// No application has been started or connected yet
    #[error("No application selected: start or connect to an application first")]
    NoApplicationSelected,

    /// Alias was never registered with the driver
    #[error("Unknown application: {0}")]
    UnknownApplication(String),

    /// Remote call failed and was not an expected disconnection
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote-call failures as raised by the transport
///
/// These are raw failures; whether one means "the application went away"
/// is decided by the driver's classification, not here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connecting, writing or reading failed
    #[error("{} {}", CONNECTION_BROKEN, .0)]
    ConnectionBroken(String),

    /// The agent answered with something that is not a valid response
    #[error("{}: {}", PROTOCOL_ERROR, .0)]
    Protocol(String),

    /// The keyword ran on the agent and failed
    #[error("{message}")]
    KeywordFailed { keyword: String, message: String },
}

impl RemoteError {
    /// Failure text as the agent or transport reported it
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
