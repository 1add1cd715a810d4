//! Agent lifecycle: bind, announce, serve

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use bc_core::config::AgentConfig;

use crate::announcer::Announcer;
use crate::error::ServeError;
use crate::library::{KeywordLibrary, KeywordSet};
use crate::server::RpcServer;
use crate::state::{AgentState, ExitHook, ScreenshotHook};

/// Agent embedded in a controlled application
pub struct Agent {
    config: AgentConfig,
    library: Arc<dyn KeywordLibrary>,
    screenshot_hook: Option<ScreenshotHook>,
    exit_hook: Option<ExitHook>,
}

impl Agent {
    /// Create an agent serving `library` on the primary surface
    pub fn new(config: AgentConfig, library: Arc<dyn KeywordLibrary>) -> Self {
        Self {
            config,
            library,
            screenshot_hook: None,
            exit_hook: None,
        }
    }

    /// Create an agent without application keywords
    pub fn without_keywords(config: AgentConfig) -> Self {
        Self::new(config, Arc::new(KeywordSet::new()))
    }

    /// Install screenshot support
    pub fn with_screenshot_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Path) -> Result<(), String> + Send + Sync + 'static,
    {
        self.screenshot_hook = Some(Arc::new(hook));
        self
    }

    /// Install the action run after `systemExit`
    pub fn with_exit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_hook = Some(Arc::new(hook));
        self
    }

    /// Bind the remote-call endpoint, start serving and announce it
    pub async fn start(self) -> Result<AgentHandle, ServeError> {
        let address = self.config.listen_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServeError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let announcer = Announcer::from_config(&self.config);
        let state = Arc::new(AgentState::new(
            self.config,
            self.library,
            self.screenshot_hook,
            self.exit_hook,
        ));
        tracing::info!("Agent \"{}\" serving on {}", state.name, local_addr);

        let server = RpcServer::new(Arc::clone(&state));
        tokio::spawn(async move { server.run(listener).await });

        let handle = AgentHandle {
            local_addr,
            state,
            announcer,
        };
        if let Err(e) = handle.announcer.announce_port(local_addr.port(), &handle.state.name).await {
            handle.shutdown();
            return Err(e);
        }
        Ok(handle)
    }
}

/// Handle to a running agent
pub struct AgentHandle {
    /// Bound remote-call address
    local_addr: SocketAddr,
    /// Shared agent state
    state: Arc<AgentState>,
    /// Announcer towards the driver
    announcer: Announcer,
}

impl AgentHandle {
    /// Bound remote-call address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound remote-call port
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Name announced to the driver
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Handle a security dialog shown by the application.
    ///
    /// When the agent is configured to close security dialogs the dialog
    /// counts as dismissed and is reported to the driver. Returns whether it
    /// was dismissed.
    pub async fn security_dialog_shown(&self, title: &str) -> Result<bool, ServeError> {
        if !self.state.config.close_security_dialogs {
            tracing::debug!("Leaving security dialog \"{}\" open", title);
            return Ok(false);
        }
        self.announcer.announce_dialog(title).await?;
        Ok(true)
    }

    /// Stop serving and drop every connection
    pub fn shutdown(&self) {
        self.state.shutdown();
    }

    /// Wait until the agent stops; returns the `systemExit` code, if any
    pub async fn stopped(&self) -> Option<i32> {
        self.state.shutdown_token().cancelled().await;
        self.state.exit_code()
    }
}
