//! Remote calls into attached applications
//!
//! [`RemoteCall`] is the seam between the driver and the remote-procedure
//! transport. [`RemoteClient`] is the JSON-line implementation used against
//! real agents; tests substitute their own implementations through a
//! [`Connector`].
//!
//! Whether a failed call means "the application went away" is decided in
//! [`classify`] and nowhere else.

mod classify;
mod client;
mod session;

pub use classify::{classify, ignore_disconnection, is_expected_disconnection, Failure};
pub use client::RemoteClient;
pub use session::{Session, SessionTable};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use bc_core::RemoteError;

/// Abstraction over one remote command surface
#[async_trait]
pub trait RemoteCall: Send + Sync {
    /// Run a named keyword with positional and keyword arguments
    async fn call(
        &self,
        keyword: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, RemoteError>;
}

/// Creates remote-call handles for a resolved address
pub trait Connector: Send + Sync {
    /// Handle for the surface at `path` of the agent at `address`.
    ///
    /// Handles connect lazily; creating one never fails.
    fn connect(&self, address: &str, path: &str) -> Arc<dyn RemoteCall>;
}

/// Connector producing JSON-line [`RemoteClient`]s over TCP
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, address: &str, path: &str) -> Arc<dyn RemoteCall> {
        Arc::new(RemoteClient::new(address, path))
    }
}
