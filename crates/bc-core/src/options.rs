//! Agent option string handed to launched applications
//!
//! The driver makes its rendezvous address discoverable to a launched process
//! through a single option string, exported as [`AGENT_OPTIONS_ENV`]:
//!
//! ```text
//! <driver-host>:<driver-port>[:APPORT=<port>][:DEBUG][:CLOSE_SECURITY_DIALOGS]
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Environment variable carrying the agent option string
pub const AGENT_OPTIONS_ENV: &str = "BACKCHANNEL_AGENT";

/// Options an agent needs to dial back to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    /// Host of the driver's rendezvous listener
    pub driver_host: String,
    /// Port of the driver's rendezvous listener
    pub driver_port: u16,
    /// Fixed port the agent should serve remote calls on
    pub application_port: Option<u16>,
    /// Verbose agent logging
    pub debug: bool,
    /// Dismiss security dialogs automatically
    pub close_security_dialogs: bool,
}

impl AgentOptions {
    /// Options pointing at the given driver address with no flags set
    pub fn new(driver_host: impl Into<String>, driver_port: u16) -> Self {
        Self {
            driver_host: driver_host.into(),
            driver_port,
            application_port: None,
            debug: false,
            close_security_dialogs: false,
        }
    }

    /// `host:port` of the driver's rendezvous listener
    pub fn driver_address(&self) -> String {
        format!("{}:{}", self.driver_host, self.driver_port)
    }
}

impl fmt::Display for AgentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.driver_host, self.driver_port)?;
        if let Some(port) = self.application_port {
            write!(f, ":APPORT={}", port)?;
        }
        if self.debug {
            f.write_str(":DEBUG")?;
        }
        if self.close_security_dialogs {
            f.write_str(":CLOSE_SECURITY_DIALOGS")?;
        }
        Ok(())
    }
}

impl FromStr for AgentOptions {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().split(':');
        let host = fields
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Invalid(format!("Missing driver host in {:?}", s)))?;
        let port = fields
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(|| ConfigError::Invalid(format!("Missing driver port in {:?}", s)))?;

        let mut options = AgentOptions::new(host, port);
        for flag in fields {
            match flag {
                "DEBUG" => options.debug = true,
                "CLOSE_SECURITY_DIALOGS" => options.close_security_dialogs = true,
                _ => {
                    let port = flag
                        .strip_prefix("APPORT=")
                        .and_then(|p| p.parse::<u16>().ok())
                        .ok_or_else(|| {
                            ConfigError::Invalid(format!("Unknown agent option {:?}", flag))
                        })?;
                    options.application_port = Some(port);
                }
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        let options = AgentOptions::new("127.0.0.1", 40123);
        assert_eq!(options.to_string(), "127.0.0.1:40123");
        assert_eq!(options.driver_address(), "127.0.0.1:40123");
    }

    #[test]
    fn test_render_all_flags() {
        let options = AgentOptions {
            application_port: Some(8181),
            debug: true,
            close_security_dialogs: true,
            ..AgentOptions::new("127.0.0.1", 40123)
        };
        assert_eq!(
            options.to_string(),
            "127.0.0.1:40123:APPORT=8181:DEBUG:CLOSE_SECURITY_DIALOGS"
        );
        assert_eq!(options.to_string().parse::<AgentOptions>().unwrap(), options);
    }

    #[test]
    fn test_parse_flags_in_any_order() {
        let options: AgentOptions = "localhost:2000:DEBUG:APPORT=3000".parse().unwrap();
        assert_eq!(options.driver_host, "localhost");
        assert_eq!(options.driver_port, 2000);
        assert_eq!(options.application_port, Some(3000));
        assert!(options.debug);
        assert!(!options.close_security_dialogs);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<AgentOptions>().is_err());
        assert!("localhost".parse::<AgentOptions>().is_err());
        assert!("localhost:port".parse::<AgentOptions>().is_err());
        assert!("localhost:2000:VERBOSE".parse::<AgentOptions>().is_err());
        assert!("localhost:2000:APPORT=x".parse::<AgentOptions>().is_err());
    }
}
