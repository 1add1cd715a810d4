//! Agent configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::options::AgentOptions;

/// Configuration for the dial-back agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Driver rendezvous address to announce to (`host:port`)
    pub driver_address: String,

    /// Agent name (optional, defaults to hostname and process id)
    pub name: Option<String>,

    /// Interface the remote-call endpoint binds to
    pub bind_address: String,

    /// Remote-call port (0 lets the OS pick one)
    pub port: u16,

    /// Connection timeout when announcing
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Verbose logging
    pub debug: bool,

    /// Dismiss security dialogs and report them to the driver
    pub close_security_dialogs: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            driver_address: "127.0.0.1:0".to_string(),
            name: None,
            bind_address: "0.0.0.0".to_string(),
            port: 0,
            connect_timeout: Duration::from_secs(10),
            debug: false,
            close_security_dialogs: false,
        }
    }
}

impl AgentConfig {
    /// Build a configuration from the driver-supplied option string
    pub fn from_options(options: &AgentOptions) -> Self {
        Self {
            driver_address: options.driver_address(),
            port: options.application_port.unwrap_or(0),
            debug: options.debug,
            close_security_dialogs: options.close_security_dialogs,
            ..Self::default()
        }
    }

    /// Get the agent name, falling back to `hostname-pid`
    pub fn agent_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!(
                "{}-{}",
                gethostname::gethostname().to_string_lossy(),
                std::process::id()
            )
        })
    }

    /// Address the remote-call endpoint binds to (`bind_address:port`)
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options() {
        let options: AgentOptions = "127.0.0.1:40123:APPORT=8181:DEBUG".parse().unwrap();
        let config = AgentConfig::from_options(&options);
        assert_eq!(config.driver_address, "127.0.0.1:40123");
        assert_eq!(config.port, 8181);
        assert!(config.debug);
        assert!(!config.close_security_dialogs);
        assert_eq!(config.listen_address(), "0.0.0.0:8181");
    }

    #[test]
    fn test_from_options_close_security_dialogs() {
        let options: AgentOptions = "127.0.0.1:40123:CLOSE_SECURITY_DIALOGS".parse().unwrap();
        let config = AgentConfig::from_options(&options);
        assert!(config.close_security_dialogs);
        assert_eq!(config.port, 0);
    }

    #[test]
    fn test_agent_name_fallback_contains_pid() {
        let config = AgentConfig::default();
        assert!(config
            .agent_name()
            .ends_with(&format!("-{}", std::process::id())));

        let named = AgentConfig {
            name: Some("inventory".to_string()),
            ..AgentConfig::default()
        };
        assert_eq!(named.agent_name(), "inventory");
    }
}
