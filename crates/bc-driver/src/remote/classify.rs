//! Failure classification for remote calls

use bc_core::error::{CONNECTION_BROKEN, PROTOCOL_ERROR};
use bc_core::RemoteError;

/// Classified remote-call failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The application went away mid-call
    ExpectedDisconnection(RemoteError),
    /// Anything else; propagated unchanged
    Unexpected(RemoteError),
}

impl Failure {
    /// Get the underlying error
    pub fn into_inner(self) -> RemoteError {
        match self {
            Failure::ExpectedDisconnection(err) | Failure::Unexpected(err) => err,
        }
    }
}

/// Decide whether a failure means the remote end disconnected.
///
/// Expected disconnections are transport failures, malformed responses and
/// keyword failures whose message reports either of those on the agent side.
pub fn classify(err: RemoteError) -> Failure {
    if is_expected_disconnection(&err) {
        Failure::ExpectedDisconnection(err)
    } else {
        Failure::Unexpected(err)
    }
}

/// Check a failure without consuming it
pub fn is_expected_disconnection(err: &RemoteError) -> bool {
    match err {
        RemoteError::ConnectionBroken(_) => err.message().contains(CONNECTION_BROKEN),
        RemoteError::Protocol(_) => true,
        RemoteError::KeywordFailed { message, .. } => {
            message.contains(CONNECTION_BROKEN) || message.contains(PROTOCOL_ERROR)
        }
    }
}

/// Run a call outcome through [`classify`], swallowing expected disconnections.
///
/// Returns `Ok(None)` when the connection died as expected.
pub fn ignore_disconnection<T>(result: Result<T, RemoteError>) -> Result<Option<T>, RemoteError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => match classify(err) {
            Failure::ExpectedDisconnection(err) => {
                tracing::info!("Connection died as expected");
                tracing::debug!("Disconnection detail: {}", err);
                Ok(None)
            }
            Failure::Unexpected(err) => Err(err),
        },
    }
}
