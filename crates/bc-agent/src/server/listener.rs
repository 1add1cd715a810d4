//! Remote-call listener
//!
//! Serves JSON-line requests from the driver. Each connection is handled by
//! its own task and may carry any number of requests.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use bc_protocol::{RemoteRequest, RemoteResponse};

use crate::error::ServeError;
use crate::server::dispatch::{dispatch, Dispatch};
use crate::state::AgentState;

/// Remote-call server of one agent
pub struct RpcServer {
    /// Shared agent state
    state: Arc<AgentState>,
}

impl RpcServer {
    /// Create a new server
    pub fn new(state: Arc<AgentState>) -> Self {
        Self { state }
    }

    /// Accept connections until the agent shuts down
    pub async fn run(&self, listener: TcpListener) {
        let shutdown = self.state.shutdown_token().clone();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Remote-call server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!("Driver connected from {}", peer_addr);
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, state).await {
                                    tracing::warn!("Remote-call client error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

async fn handle_client(stream: TcpStream, state: Arc<AgentState>) -> Result<(), ServeError> {
    let shutdown = state.shutdown_token().clone();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            // Dropped without a reply
            _ = shutdown.cancelled() => return Ok(()),
            result = reader.read_line(&mut line) => result?,
        };
        if read == 0 {
            return Ok(()); // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let outcome = match serde_json::from_str::<RemoteRequest>(trimmed) {
            Ok(request) => tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                outcome = dispatch(&state, request) => outcome,
            },
            Err(e) => Dispatch::Reply(RemoteResponse::fail(0, format!("Invalid request: {}", e))),
        };

        match outcome {
            Dispatch::Reply(response) => {
                writer.write_all(response.to_line()?.as_bytes()).await?;
            }
            Dispatch::Exit(code) => {
                state.request_exit(code);
                drop(writer);
                drop(reader);
                state.run_exit_hook(code);
                return Ok(());
            }
        }
    }
}
