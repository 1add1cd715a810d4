//! Driver: the long-lived service object tying everything together
//!
//! A [`Driver`] owns the rendezvous listener, the agent registry it feeds,
//! the resolver waiting on that registry and the table of attached
//! applications. Control operations act on the current application.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use bc_core::config::DriverConfig;
use bc_core::time::current_time_millis;
use bc_core::{AgentOptions, DriverError};
use bc_protocol::{PRIMARY_PATH, SERVICES_PATH};

use crate::registry::AgentRegistry;
use crate::remote::{ignore_disconnection, Connector, Session, SessionTable, TcpConnector};
use crate::resolver::AddressResolver;
use crate::server::{RendezvousHandle, RendezvousServer};
use crate::shutdown::ShutdownWatcher;

/// Exit code used when an application has to be killed
const FORCED_EXIT_CODE: i32 = 1;

/// Test driver controlling dial-back applications
pub struct Driver {
    /// Active configuration
    config: DriverConfig,
    /// Announced agents
    registry: Arc<AgentRegistry>,
    /// Running rendezvous listener
    rendezvous: RendezvousHandle,
    /// Waits for agents on the registry
    resolver: AddressResolver,
    /// Detects application shutdown
    watcher: ShutdownWatcher,
    /// Attached applications
    sessions: SessionTable,
    /// Creates remote-call handles for resolved addresses
    connector: Arc<dyn Connector>,
}

impl Driver {
    /// Start a driver with its own registry and rendezvous listener
    pub async fn start(config: DriverConfig) -> anyhow::Result<Self> {
        Self::start_with_registry(config, Arc::new(AgentRegistry::new())).await
    }

    /// Start a driver over an existing registry.
    ///
    /// Fresh construction forgets every previously announced agent; use
    /// [`Driver::reconfigure`] to keep them.
    pub async fn start_with_registry(
        config: DriverConfig,
        registry: Arc<AgentRegistry>,
    ) -> anyhow::Result<Self> {
        registry.reset();
        let rendezvous =
            RendezvousServer::spawn(Arc::clone(&registry), &config.listen_address()).await?;
        tracing::info!(
            "Agents should dial back with {}=\"{}\"",
            bc_core::options::AGENT_OPTIONS_ENV,
            config.agent_options(rendezvous.port())
        );

        Ok(Self {
            resolver: AddressResolver::new(Arc::clone(&registry)),
            watcher: ShutdownWatcher::default(),
            sessions: SessionTable::new(),
            connector: Arc::new(TcpConnector),
            config,
            registry,
            rendezvous,
        })
    }

    /// Use a different connector for sessions attached from now on
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Apply a new configuration without touching the listener or registry.
    ///
    /// Listener address changes take effect only on a fresh start.
    pub fn reconfigure(&mut self, config: DriverConfig) {
        if config.listen_address() != self.config.listen_address() {
            tracing::warn!(
                "Keeping rendezvous listener on port {}; restart to listen on {}",
                self.port(),
                config.listen_address()
            );
        }
        tracing::debug!("Driver reconfigured, {} known agents kept", self.registry.len());
        self.config = config;
    }

    /// Get the active configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Port of the rendezvous listener
    pub fn port(&self) -> u16 {
        self.rendezvous.port()
    }

    /// Option string to hand to a launched application
    pub fn agent_options(&self) -> AgentOptions {
        self.config.agent_options(self.port())
    }

    /// Get the agent registry
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Get the attached applications
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Stop the rendezvous listener
    pub fn shutdown(&self) {
        self.rendezvous.shutdown();
    }

    /// Mark every known agent stale right before launching an application
    pub fn prepare_launch(&self) {
        self.registry.age_all();
    }

    /// Attach to a launched application that may have announced already
    pub async fn application_started(
        &self,
        alias: &str,
        timeout: Option<Duration>,
        name_contains: Option<&str>,
    ) -> Result<Arc<Session>, DriverError> {
        self.attach(alias, timeout, name_contains, true).await
    }

    /// Attach to an application launched after [`Driver::prepare_launch`].
    ///
    /// Only agents announced after the preparation qualify.
    pub async fn start_application(
        &self,
        alias: &str,
        timeout: Option<Duration>,
        name_contains: Option<&str>,
    ) -> Result<Arc<Session>, DriverError> {
        self.attach(alias, timeout, name_contains, false).await
    }

    /// Attach to an application left running by an earlier run
    pub async fn connect_to_application(
        &self,
        alias: &str,
        timeout: Option<Duration>,
        name_contains: Option<&str>,
    ) -> Result<Arc<Session>, DriverError> {
        self.attach(alias, timeout, name_contains, true).await
    }

    async fn attach(
        &self,
        alias: &str,
        timeout: Option<Duration>,
        name_contains: Option<&str>,
        accept_stale: bool,
    ) -> Result<Arc<Session>, DriverError> {
        let address = match self.config.fixed_application_address() {
            Some(address) => address,
            None => {
                let timeout = timeout.unwrap_or(self.config.timeout);
                self.resolver
                    .resolve(name_contains, accept_stale, timeout)
                    .await?
            }
        };

        let session = Session::new(
            alias,
            address.clone(),
            self.connector.connect(&address, PRIMARY_PATH),
            self.connector.connect(&address, SERVICES_PATH),
        );
        tracing::info!("Connected to application \"{}\" at {}", alias, address);
        Ok(self.sessions.register(session))
    }

    /// Make a previously attached application current
    pub fn switch_to_application(&self, alias: &str) -> Result<(), DriverError> {
        self.sessions.switch(alias)?;
        tracing::debug!("Switched to application \"{}\"", alias);
        Ok(())
    }

    /// Get the current application's session
    pub fn current_session(&self) -> Result<Arc<Session>, DriverError> {
        self.sessions.current()
    }

    /// Run a keyword on the current application
    pub async fn run_keyword(
        &self,
        keyword: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, DriverError> {
        let session = self.current_session()?;
        Ok(session.run_keyword(keyword, args, kwargs).await?)
    }

    /// Run `action`, then wait until the current application has closed.
    ///
    /// The action may lose its connection as the application exits; that is
    /// not an error. If the application still answers after `timeout` a
    /// screenshot is attempted, the application is forced to exit and
    /// [`DriverError::NotClosed`] is returned.
    pub async fn ensure_application_should_close<F, T>(
        &self,
        timeout: Option<Duration>,
        action: F,
    ) -> Result<(), DriverError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        let timeout = timeout.unwrap_or(self.config.timeout);
        let session = self.current_session()?;

        match action.await {
            Ok(_) => {}
            Err(DriverError::Remote(err)) => {
                ignore_disconnection::<()>(Err(err))?;
            }
            Err(err) => return Err(err),
        }

        match self.watcher.wait_for_close(&session, timeout).await {
            Err(err @ DriverError::NotClosed { .. }) => {
                tracing::warn!("Application is not closed before timeout - killing application");
                self.capture_screenshot(&session).await;
                if let Err(e) = ignore_disconnection(session.system_exit(FORCED_EXIT_CODE).await) {
                    tracing::warn!("Forced exit of \"{}\" failed: {}", session.alias, e);
                }
                Err(err)
            }
            other => other,
        }
    }

    /// Ask the current application to exit
    pub async fn system_exit(&self, code: i32) -> Result<(), DriverError> {
        let session = self.current_session()?;
        ignore_disconnection(session.system_exit(code).await)?;
        Ok(())
    }

    /// Log and return the current application's environment
    pub async fn log_system_properties(&self) -> Result<Value, DriverError> {
        let session = self.current_session()?;
        let environment = session.get_environment().await?;

        match &environment {
            Value::Object(properties) => {
                for (key, value) in properties {
                    tracing::info!("{}: {}", key, value);
                }
            }
            other => tracing::info!("{}", other),
        }
        Ok(environment)
    }

    /// Capture a screenshot of the current application into `output_dir`
    pub async fn take_screenshot(&self) -> Result<PathBuf, DriverError> {
        let session = self.current_session()?;
        let path = self.screenshot_path();
        session.take_screenshot(&path.to_string_lossy()).await?;
        tracing::info!("Screenshot saved to {}", path.display());
        Ok(path)
    }

    /// Best-effort screenshot; failures are only logged
    async fn capture_screenshot(&self, session: &Session) {
        let path = self.screenshot_path();
        match session.take_screenshot(&path.to_string_lossy()).await {
            Ok(()) => tracing::info!("Screenshot saved to {}", path.display()),
            Err(e) => tracing::warn!("Could not take screenshot of \"{}\": {}", session.alias, e),
        }
    }

    fn screenshot_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("backchannel-screenshot{}.png", current_time_millis()))
    }
}
