//! Protocol error types

use thiserror::Error;

/// Errors that can occur while reading or writing protocol messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The port field of a `PORT:` announcement is not a valid port number
    #[error("Invalid announced port: {0:?}")]
    InvalidPort(String),

    /// Announce line exceeds the maximum accepted length
    #[error("Announce line too long: exceeds maximum of {max} bytes")]
    LineTooLong { max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
