//! Remote-call protocol between the driver and an agent
//!
//! Uses JSON-encoded messages, one per line, over TCP. Every agent exposes
//! two surfaces on the same port, selected by the request `path`:
//!
//! - [`PRIMARY_PATH`] carries the application's own keywords
//! - [`SERVICES_PATH`] carries the agent's built-in services (see [`services`])

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path of the primary command surface
pub const PRIMARY_PATH: &str = "/";

/// Path of the administrative services surface
pub const SERVICES_PATH: &str = "/services";

/// Keyword names served on the services surface
pub mod services {
    /// No-op liveness check
    pub const PING: &str = "ping";
    /// Terminate the application with the given exit code
    pub const SYSTEM_EXIT: &str = "systemExit";
    /// Capture a screenshot into the given path
    pub const TAKE_SCREENSHOT: &str = "takeScreenshot";
    /// Return environment and process properties
    pub const GET_ENVIRONMENT: &str = "getEnvironment";
}

/// A keyword invocation sent to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Correlation ID echoed in the response
    pub id: u64,
    /// Surface the keyword belongs to
    pub path: String,
    /// Keyword name
    pub keyword: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keyword arguments
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

/// Outcome of a keyword invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Keyword ran successfully
    Pass,
    /// Keyword raised a failure
    Fail,
}

/// Response to a [`RemoteRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    /// ID of the request this answers
    pub id: u64,
    /// Whether the keyword passed
    pub status: RemoteStatus,
    /// Return value (null when the keyword returns nothing)
    #[serde(default, rename = "return")]
    pub return_value: Value,
    /// Failure message when `status` is `fail`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Log output produced by the keyword
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl RemoteRequest {
    /// Create a request without keyword arguments
    pub fn new(id: u64, path: impl Into<String>, keyword: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id,
            path: path.into(),
            keyword: keyword.into(),
            args,
            kwargs: Map::new(),
        }
    }

    /// Serialize as a single JSON line (newline included)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        to_line(self)
    }
}

impl RemoteResponse {
    /// Successful response carrying a return value
    pub fn pass(id: u64, return_value: Value) -> Self {
        Self {
            id,
            status: RemoteStatus::Pass,
            return_value,
            error: None,
            output: String::new(),
        }
    }

    /// Failed response carrying an error message
    pub fn fail(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            status: RemoteStatus::Fail,
            return_value: Value::Null,
            error: Some(error.into()),
            output: String::new(),
        }
    }

    /// Serialize as a single JSON line (newline included)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        to_line(self)
    }
}

fn to_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}
