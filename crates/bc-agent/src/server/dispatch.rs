//! Request dispatch for the primary and service surfaces

use std::path::Path;

use serde_json::{json, Value};

use bc_protocol::rpc::services;
use bc_protocol::{RemoteRequest, RemoteResponse, PRIMARY_PATH, SERVICES_PATH};

use crate::state::AgentState;

/// What to do after handling a request
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// Send this response
    Reply(RemoteResponse),
    /// Drop the connection without replying and exit with this code
    Exit(i32),
}

/// Handle one request
pub async fn dispatch(state: &AgentState, request: RemoteRequest) -> Dispatch {
    let id = request.id;
    match request.path.as_str() {
        PRIMARY_PATH => {
            tracing::debug!("Running keyword {}", request.keyword);
            match state
                .library
                .run_keyword(&request.keyword, request.args, request.kwargs)
                .await
            {
                Ok(value) => Dispatch::Reply(RemoteResponse::pass(id, value)),
                Err(e) => Dispatch::Reply(RemoteResponse::fail(id, e.to_string())),
            }
        }
        SERVICES_PATH => service(state, request),
        other => Dispatch::Reply(RemoteResponse::fail(id, format!("Unknown path: {}", other))),
    }
}

fn service(state: &AgentState, request: RemoteRequest) -> Dispatch {
    let id = request.id;
    match request.keyword.as_str() {
        services::PING => Dispatch::Reply(RemoteResponse::pass(id, Value::Null)),
        services::GET_ENVIRONMENT => Dispatch::Reply(RemoteResponse::pass(id, environment(state))),
        services::TAKE_SCREENSHOT => {
            let Some(path) = request.args.first().and_then(Value::as_str) else {
                return Dispatch::Reply(RemoteResponse::fail(
                    id,
                    "takeScreenshot expects a file path",
                ));
            };
            let result = match &state.screenshot_hook {
                Some(hook) => hook(Path::new(path)),
                None => Err("Screenshots are not supported by this agent".to_string()),
            };
            match result {
                Ok(()) => Dispatch::Reply(RemoteResponse::pass(id, json!(path))),
                Err(e) => Dispatch::Reply(RemoteResponse::fail(id, e)),
            }
        }
        services::SYSTEM_EXIT => {
            let code = request
                .args
                .first()
                .and_then(Value::as_i64)
                .and_then(|code| i32::try_from(code).ok())
                .unwrap_or(0);
            Dispatch::Exit(code)
        }
        other => Dispatch::Reply(RemoteResponse::fail(
            id,
            format!("No keyword with name '{}' found", other),
        )),
    }
}

/// Environment and process properties of this agent
fn environment(state: &AgentState) -> Value {
    let working_dir = std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();

    json!({
        "agent.name": state.name,
        "agent.version": env!("CARGO_PKG_VERSION"),
        "host.name": gethostname::gethostname().to_string_lossy(),
        "os.arch": std::env::consts::ARCH,
        "os.name": std::env::consts::OS,
        "process.id": std::process::id(),
        "user.dir": working_dir,
    })
}
