//! Agent address resolution
//!
//! Turns "I want an agent whose name contains X" into a concrete callback
//! address by waiting on the [`AgentRegistry`] until a matching announce
//! arrives or the timeout elapses.
//!
//! # Timing
//!
//! Each round waits on the registry's received flag for the full timeout.
//! When the flag fires for an agent that does not match, the resolver sleeps
//! [`RETRY_INTERVAL`] and starts another round, again with the full timeout.
//! An overall elapsed-time check after every non-matching round bounds the
//! loop, but total waiting can still exceed the nominal timeout (at most
//! roughly twice the timeout plus one retry interval) if a round starts just
//! before the deadline and the flag is cleared underneath it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use bc_core::DriverError;

use crate::registry::AgentRegistry;

/// Pause between rounds when the received flag fired for a non-matching agent
pub const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Blocking, timeout-bounded lookup of announced agents
#[derive(Clone)]
pub struct AddressResolver {
    /// Shared registry fed by the rendezvous listener
    registry: Arc<AgentRegistry>,
    /// Pause between non-matching rounds
    retry_interval: Duration,
}

impl AddressResolver {
    /// Create a resolver over the given registry
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            retry_interval: RETRY_INTERVAL,
        }
    }

    /// Override the pause between non-matching rounds
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Wait for an agent and claim its address.
    ///
    /// Candidates are checked newest first; the first one whose name contains
    /// `name_pattern` (any agent when `None`) is removed from the registry
    /// and its address returned. With `accept_stale == false` only agents
    /// announced after the last [`AgentRegistry::age_all`] qualify.
    ///
    /// Fails with [`DriverError::AgentTimeout`] when no matching agent shows
    /// up in time.
    pub async fn resolve(
        &self,
        name_pattern: Option<&str>,
        accept_stale: bool,
        timeout: Duration,
    ) -> Result<String, DriverError> {
        let started = Instant::now();
        let mut received = self.registry.subscribe();

        loop {
            // Forget earlier unrelated announces when nothing is claimable
            self.registry.clear_signal_if_empty(accept_stale);

            let fired = tokio::time::timeout(timeout, async {
                received.wait_for(|flag| *flag).await.is_ok()
            })
            .await
            .unwrap_or(false);
            if !fired {
                tracing::debug!(
                    pattern = ?name_pattern,
                    accept_stale,
                    "No agent announced within {:?}",
                    timeout
                );
                return Err(DriverError::AgentTimeout { timeout });
            }

            if let Some(agent) = self.registry.take_newest(name_pattern, accept_stale) {
                tracing::debug!(
                    "Resolved agent \"{}\" at {} ({})",
                    agent.name,
                    agent.address,
                    agent.generation
                );
                return Ok(agent.address);
            }

            tracing::trace!(pattern = ?name_pattern, "Announced agents do not match yet");
            tokio::time::sleep(self.retry_interval).await;

            if started.elapsed() >= timeout {
                return Err(DriverError::AgentTimeout { timeout });
            }
        }
    }
}
