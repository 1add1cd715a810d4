//! Announce messages for the rendezvous listener
//!
//! An agent opens a fresh connection to the driver's rendezvous listener and
//! sends exactly one line per announced endpoint:
//!
//! ```text
//! PORT:<port-number>:<agent-name>      callback port; the name may contain ':'
//! DIALOG:<dialog-title>                informational only
//! <anything else>                      ignored
//! ```
//!
//! The announcing peer's source IP combined with `<port-number>` forms the
//! address the driver dials back.

use std::fmt;

use crate::error::ProtocolError;

/// Maximum accepted length of a single announce line in bytes
pub const MAX_ANNOUNCE_LENGTH: usize = 8 * 1024;

/// Keyword of a port announcement
pub const PORT_KEYWORD: &str = "PORT";

/// Keyword of a dialog notification
pub const DIALOG_KEYWORD: &str = "DIALOG";

/// A parsed announce line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// Agent callback port announcement
    Port {
        /// Port the agent's remote-call endpoint listens on
        port: u16,
        /// Free-text agent name
        name: String,
    },

    /// A security dialog was dismissed automatically by the agent
    Dialog {
        /// Title of the dismissed dialog
        title: String,
    },

    /// Any other line, kept verbatim
    Unknown(String),
}

impl Announcement {
    /// Create a port announcement
    pub fn port(port: u16, name: impl Into<String>) -> Self {
        Self::Port {
            port,
            name: name.into(),
        }
    }

    /// Create a dialog notification
    pub fn dialog(title: impl Into<String>) -> Self {
        Self::Dialog {
            title: title.into(),
        }
    }

    /// Parse a single announce line.
    ///
    /// A trailing `\n` or `\r\n` is ignored. The line is split only on the
    /// first two colons, so agent names and dialog titles keep any colons
    /// they contain. A `PORT` line whose port field is not a valid port number
    /// is an error; every other unrecognized shape becomes [`Announcement::Unknown`].
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (keyword, rest) = line.split_once(':').unwrap_or((line, ""));
        match keyword {
            PORT_KEYWORD => {
                let (port, name) = rest.split_once(':').unwrap_or((rest, ""));
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ProtocolError::InvalidPort(port.to_string()))?;
                Ok(Self::port(port, name))
            }
            DIALOG_KEYWORD => Ok(Self::dialog(rest)),
            _ => Ok(Self::Unknown(line.to_string())),
        }
    }

    /// The leading keyword of this announcement
    pub fn keyword(&self) -> &str {
        match self {
            Announcement::Port { .. } => PORT_KEYWORD,
            Announcement::Dialog { .. } => DIALOG_KEYWORD,
            Announcement::Unknown(line) => line.split(':').next().unwrap_or_default(),
        }
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Announcement::Port { port, name } => write!(f, "{}:{}:{}", PORT_KEYWORD, port, name),
            Announcement::Dialog { title } => write!(f, "{}:{}", DIALOG_KEYWORD, title),
            Announcement::Unknown(line) => f.write_str(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port() {
        let parsed = Announcement::parse("PORT:9999:worker-1\n").unwrap();
        assert_eq!(parsed, Announcement::port(9999, "worker-1"));
    }

    #[test]
    fn test_parse_port_name_with_colons() {
        let parsed = Announcement::parse("PORT:4567:com.example.Main:arg:1").unwrap();
        assert_eq!(parsed, Announcement::port(4567, "com.example.Main:arg:1"));
    }

    #[test]
    fn test_parse_port_without_name() {
        let parsed = Announcement::parse("PORT:4567").unwrap();
        assert_eq!(parsed, Announcement::port(4567, ""));
    }

    #[test]
    fn test_parse_invalid_port() {
        let result = Announcement::parse("PORT:not-a-port:app");
        assert!(matches!(result, Err(ProtocolError::InvalidPort(p)) if p == "not-a-port"));

        let result = Announcement::parse("PORT");
        assert!(matches!(result, Err(ProtocolError::InvalidPort(p)) if p.is_empty()));
    }

    #[test]
    fn test_parse_dialog() {
        let parsed = Announcement::parse("DIALOG:Security Warning: unsigned\r\n").unwrap();
        assert_eq!(parsed, Announcement::dialog("Security Warning: unsigned"));
    }

    #[test]
    fn test_parse_unknown() {
        let parsed = Announcement::parse("HELLO:there").unwrap();
        assert_eq!(parsed, Announcement::Unknown("HELLO:there".to_string()));
        assert_eq!(parsed.keyword(), "HELLO");
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        let parsed = Announcement::parse("port:1234:app").unwrap();
        assert!(matches!(parsed, Announcement::Unknown(_)));
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(
            Announcement::port(8181, "app:main").to_string(),
            "PORT:8181:app:main"
        );
        assert_eq!(Announcement::dialog("Warning").to_string(), "DIALOG:Warning");
    }
}
