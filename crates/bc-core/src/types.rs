//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Age of an announced agent relative to the last launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// Announced since the registry was last aged
    Fresh,
    /// Announced before the registry was last aged
    Stale,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Fresh => write!(f, "fresh"),
            Generation::Stale => write!(f, "stale"),
        }
    }
}

/// One announced agent callback endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentEndpoint {
    /// `host:port` the driver dials to reach the agent
    pub address: String,
    /// Free-text name supplied by the agent
    pub name: String,
    /// Generation tag
    pub generation: Generation,
}

impl AgentEndpoint {
    /// Create a fresh endpoint
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            generation: Generation::Fresh,
        }
    }

    /// Whether the endpoint was announced after the last aging
    pub fn is_fresh(&self) -> bool {
        self.generation == Generation::Fresh
    }

    /// Whether the name contains `pattern` (always true without a pattern)
    pub fn name_matches(&self, pattern: Option<&str>) -> bool {
        pattern.map_or(true, |p| self.name.contains(p))
    }
}

impl fmt::Display for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} ({})", self.name, self.address, self.generation)
    }
}
