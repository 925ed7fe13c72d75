// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dependency wiring for the REST server

use crate::{config::ServerConfig, state::AppState};
use anyhow::Result;
use folio_ops::Dispatcher;
use tracing::debug;

/// Default dependency builder: the built-in feature-areas, an in-memory
/// session store and the file-backed document library
pub struct DefaultServerDependencies {
    state: AppState,
}

impl DefaultServerDependencies {
    /// Build default dependencies and start the session sweeper
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let dispatcher = Dispatcher::with_defaults(config.sessions.clone())?;
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    /// Wire a caller-built dispatcher, e.g. one with a custom library. Must
    /// run inside a Tokio runtime.
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        if let Some(store) = dispatcher.sessions() {
            // Exits on its own once the store is dropped
            store.spawn_sweeper();
            debug!(
                ttl_secs = store.config().ttl_secs,
                interval_secs = store.config().sweep_interval_secs,
                "Session sweeper started"
            );
        }
        Self {
            state: AppState::new(config, dispatcher),
        }
    }

    /// Consume the dependency builder and return the resulting app state
    pub fn into_state(self) -> AppState {
        self.state
    }
}
