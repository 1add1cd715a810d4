//! Agent state management

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use bc_core::config::AgentConfig;

use crate::library::KeywordLibrary;

/// Called with the requested exit code once every connection is dropped
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Writes a screenshot to the given path
pub type ScreenshotHook = Arc<dyn Fn(&Path) -> Result<(), String> + Send + Sync>;

/// State shared by every connection of one agent
pub struct AgentState {
    /// Configuration
    pub config: AgentConfig,
    /// Name announced to the driver
    pub name: String,
    /// Keywords for the primary surface
    pub library: Arc<dyn KeywordLibrary>,
    /// Screenshot support, if any
    pub screenshot_hook: Option<ScreenshotHook>,
    /// Invoked after `systemExit`
    exit_hook: Option<ExitHook>,
    /// Cancelled on `systemExit` or shutdown
    shutdown: CancellationToken,
    /// Code passed to `systemExit`
    exit_code: Mutex<Option<i32>>,
}

impl AgentState {
    /// Create new agent state
    pub fn new(
        config: AgentConfig,
        library: Arc<dyn KeywordLibrary>,
        screenshot_hook: Option<ScreenshotHook>,
        exit_hook: Option<ExitHook>,
    ) -> Self {
        Self {
            name: config.agent_name(),
            config,
            library,
            screenshot_hook,
            exit_hook,
            shutdown: CancellationToken::new(),
            exit_code: Mutex::new(None),
        }
    }

    /// Token cancelled when the agent stops serving
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Stop serving and drop every open connection
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Record the exit code and stop serving.
    ///
    /// The exit hook runs separately through [`AgentState::run_exit_hook`],
    /// after the requesting connection has been dropped.
    pub fn request_exit(&self, code: i32) {
        tracing::info!("Exit requested with code {}", code);
        *self.exit_code.lock().unwrap_or_else(PoisonError::into_inner) = Some(code);
        self.shutdown.cancel();
    }

    /// Run the exit hook, if one is installed
    pub fn run_exit_hook(&self, code: i32) {
        if let Some(hook) = &self.exit_hook {
            hook(code);
        }
    }

    /// Code passed to `systemExit`, if it was called
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
