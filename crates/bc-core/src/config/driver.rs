//! Driver configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::options::AgentOptions;

/// Configuration for the test driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Interface the rendezvous listener binds to
    pub bind_address: String,

    /// Rendezvous listener port (0 lets the OS pick one)
    pub port: u16,

    /// Host agents are told to dial back to
    pub advertise_host: String,

    /// Host of an application serving on a fixed port
    pub application_host: String,

    /// Fixed application port; when set, attaching skips agent discovery
    pub application_port: Option<u16>,

    /// Default timeout for resolving agents and waiting for shutdown
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Ask agents for verbose logging
    pub debug: bool,

    /// Ask agents to dismiss security dialogs automatically
    pub close_security_dialogs: bool,

    /// Directory diagnostic screenshots are written to
    pub output_dir: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 0,
            advertise_host: "127.0.0.1".to_string(),
            application_host: "127.0.0.1".to_string(),
            application_port: None,
            timeout: Duration::from_secs(60),
            debug: false,
            close_security_dialogs: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl DriverConfig {
    /// Address the rendezvous listener binds to (`bind_address:port`)
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Application address when running in fixed-address mode
    pub fn fixed_application_address(&self) -> Option<String> {
        self.application_port
            .map(|port| format!("{}:{}", self.application_host, port))
    }

    /// Agent options for a listener bound to `driver_port`
    pub fn agent_options(&self, driver_port: u16) -> AgentOptions {
        AgentOptions {
            application_port: self.application_port,
            debug: self.debug,
            close_security_dialogs: self.close_security_dialogs,
            ..AgentOptions::new(self.advertise_host.clone(), driver_port)
        }
    }
}
