//! Sessions with attached applications

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde_json::{json, Map, Value};

use bc_core::{DriverError, RemoteError};
use bc_protocol::rpc::services;

use super::RemoteCall;

/// One resolved, live attachment to an application
///
/// Sessions are never closed explicitly; a dead application shows up as a
/// failing call.
pub struct Session {
    /// Driver-chosen label
    pub alias: String,
    /// Agent address this session talks to
    pub address: String,
    /// Main command surface
    primary: Arc<dyn RemoteCall>,
    /// Service surface (ping, screenshot, environment, exit)
    services: Arc<dyn RemoteCall>,
}

impl Session {
    /// Create a session from its two surface handles
    pub fn new(
        alias: impl Into<String>,
        address: impl Into<String>,
        primary: Arc<dyn RemoteCall>,
        services: Arc<dyn RemoteCall>,
    ) -> Self {
        Self {
            alias: alias.into(),
            address: address.into(),
            primary,
            services,
        }
    }

    /// Run a keyword on the primary surface
    pub async fn run_keyword(
        &self,
        keyword: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, RemoteError> {
        tracing::debug!(alias = %self.alias, "Running keyword {}", keyword);
        self.primary.call(keyword, args, kwargs).await
    }

    /// Run a call on the service surface
    pub async fn run_service(&self, name: &str, args: Vec<Value>) -> Result<Value, RemoteError> {
        self.services.call(name, args, Map::new()).await
    }

    /// Check that the application still answers
    pub async fn ping(&self) -> Result<(), RemoteError> {
        self.run_service(services::PING, Vec::new()).await.map(|_| ())
    }

    /// Ask the application to exit with `code`.
    ///
    /// A successful exit normally surfaces as a broken connection.
    pub async fn system_exit(&self, code: i32) -> Result<(), RemoteError> {
        self.run_service(services::SYSTEM_EXIT, vec![json!(code)])
            .await
            .map(|_| ())
    }

    /// Ask the application to write a screenshot to `path`
    pub async fn take_screenshot(&self, path: &str) -> Result<(), RemoteError> {
        self.run_service(services::TAKE_SCREENSHOT, vec![json!(path)])
            .await
            .map(|_| ())
    }

    /// Get the application's environment description
    pub async fn get_environment(&self) -> Result<Value, RemoteError> {
        self.run_service(services::GET_ENVIRONMENT, Vec::new()).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("alias", &self.alias)
            .field("address", &self.address)
            .finish()
    }
}

/// Alias-keyed sessions plus the currently selected one
pub struct SessionTable {
    /// Sessions indexed by alias
    sessions: DashMap<String, Arc<Session>>,
    /// Alias of the current application
    current: Mutex<Option<String>>,
}

impl SessionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            current: Mutex::new(None),
        }
    }

    /// Register a session and make it current.
    ///
    /// An existing session with the same alias is replaced.
    pub fn register(&self, session: Session) -> Arc<Session> {
        let alias = session.alias.clone();
        let session = Arc::new(session);
        self.sessions.insert(alias.clone(), Arc::clone(&session));
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(alias);
        session
    }

    /// Get a session by alias
    pub fn get(&self, alias: &str) -> Option<Arc<Session>> {
        self.sessions.get(alias).map(|r| Arc::clone(&r))
    }

    /// Get the current session
    pub fn current(&self) -> Result<Arc<Session>, DriverError> {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let alias = current.ok_or(DriverError::NoApplicationSelected)?;
        self.get(&alias)
            .ok_or(DriverError::UnknownApplication(alias))
    }

    /// Alias of the current session, if any
    pub fn current_alias(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make a registered alias current
    pub fn switch(&self, alias: &str) -> Result<Arc<Session>, DriverError> {
        let session = self
            .get(alias)
            .ok_or_else(|| DriverError::UnknownApplication(alias.to_string()))?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(alias.to_string());
        Ok(session)
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.sessions.iter().map(|r| r.key().clone()).collect();
        aliases.sort();
        aliases
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
