//! Registry of announced agents
//!
//! Every `PORT:` announcement accepted by the rendezvous listener ends up here
//! as an [`AgentEndpoint`]. Entries keep announce order, so resolvers can
//! prefer the most recently announced agent.
//!
//! # Generations
//!
//! All entries start [`Generation::Fresh`]. Right before a new application is
//! launched, [`AgentRegistry::age_all`] demotes every known entry to
//! [`Generation::Stale`]; a resolver that only accepts fresh entries is then
//! guaranteed to be satisfied by the new application's own announce, not by a
//! leftover from a previous instance.
//!
//! # Signal
//!
//! Alongside the entries the registry carries a "received" flag, set on every
//! append and cleared by aging (and by resolvers that observe nothing to
//! claim). Resolvers wait on it instead of polling the entry list.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use bc_core::types::{AgentEndpoint, Generation};

/// Thread-safe store of announced agent endpoints
///
/// One registry is created per driver and shared by reference between the
/// rendezvous listener and resolvers. A single lock guards the entries; the
/// received flag is only ever updated while that lock is held.
pub struct AgentRegistry {
    /// Entries in announce order
    agents: Mutex<Vec<AgentEndpoint>>,
    /// Set when an entry is appended
    received: watch::Sender<bool>,
}

impl AgentRegistry {
    /// Create an empty registry with the received flag cleared
    pub fn new() -> Self {
        let (received, _) = watch::channel(false);
        Self {
            agents: Mutex::new(Vec::new()),
            received,
        }
    }

    fn agents(&self) -> MutexGuard<'_, Vec<AgentEndpoint>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a fresh entry and raise the received flag
    pub fn append(&self, address: impl Into<String>, name: impl Into<String>) {
        let mut agents = self.agents();
        agents.push(AgentEndpoint::new(address, name));
        self.received.send_replace(true);
    }

    /// Remove one entry matching all three fields.
    ///
    /// When duplicates exist the most recently announced one is removed.
    /// Removing an entry that is not present is ignored and reported by
    /// returning `false`.
    pub fn remove(&self, address: &str, name: &str, generation: Generation) -> bool {
        let mut agents = self.agents();
        let position = agents.iter().rposition(|agent| {
            agent.address == address && agent.name == name && agent.generation == generation
        });
        match position {
            Some(index) => {
                agents.remove(index);
                true
            }
            None => {
                tracing::debug!(
                    "Ignoring removal of unknown agent \"{}\" at {} ({})",
                    name,
                    address,
                    generation
                );
                false
            }
        }
    }

    /// Snapshot of all entries in announce order.
    ///
    /// With `include_stale == false` only fresh entries are returned.
    pub fn list(&self, include_stale: bool) -> Vec<AgentEndpoint> {
        self.agents()
            .iter()
            .filter(|agent| include_stale || agent.is_fresh())
            .cloned()
            .collect()
    }

    /// Demote every entry to stale and clear the received flag
    pub fn age_all(&self) {
        let mut agents = self.agents();
        for agent in agents.iter_mut() {
            agent.generation = Generation::Stale;
        }
        self.received.send_replace(false);
        tracing::debug!("Aged {} known agents", agents.len());
    }

    /// Drop every entry and clear the received flag
    pub fn reset(&self) {
        let mut agents = self.agents();
        agents.clear();
        self.received.send_replace(false);
    }

    /// Claim the newest entry whose name contains `name_pattern`.
    ///
    /// Lookup and removal happen under one lock acquisition, so two callers
    /// can never claim the same entry.
    pub fn take_newest(
        &self,
        name_pattern: Option<&str>,
        include_stale: bool,
    ) -> Option<AgentEndpoint> {
        let mut agents = self.agents();
        let index = agents.iter().rposition(|agent| {
            (include_stale || agent.is_fresh()) && agent.name_matches(name_pattern)
        })?;
        Some(agents.remove(index))
    }

    /// Clear the received flag if no entry is visible with the given filter.
    ///
    /// Returns `true` if the flag was cleared.
    pub fn clear_signal_if_empty(&self, include_stale: bool) -> bool {
        let agents = self.agents();
        let visible = agents
            .iter()
            .any(|agent| include_stale || agent.is_fresh());
        if !visible {
            self.received.send_replace(false);
        }
        !visible
    }

    /// Subscribe to the received flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.received.subscribe()
    }

    /// Current state of the received flag
    pub fn is_signaled(&self) -> bool {
        *self.received.borrow()
    }

    /// Number of entries, fresh and stale
    pub fn len(&self) -> usize {
        self.agents().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.agents().is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
