//! Agent error types

use std::time::Duration;

use thiserror::Error;

use bc_protocol::ProtocolError;

/// Errors raised while serving or announcing
#[derive(Debug, Error)]
pub enum ServeError {
    /// The remote-call endpoint could not be bound
    #[error("Failed to bind remote-call endpoint on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The driver could not be reached before the connect timeout
    #[error("Driver at {address} not reachable within {timeout:?}: {source}")]
    DriverUnreachable {
        address: String,
        timeout: Duration,
        #[source]
        source: std::io::Error,
    },

    /// Writing an announcement failed
    #[error("Failed to announce: {0}")]
    Announce(#[from] ProtocolError),

    /// I/O error on a client connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be encoded
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of a keyword run through a [`KeywordLibrary`](crate::KeywordLibrary)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeywordError {
    /// No keyword with this name exists
    #[error("No keyword with name '{0}' found")]
    NotFound(String),

    /// The keyword ran and failed with this message
    #[error("{0}")]
    Failed(String),
}
