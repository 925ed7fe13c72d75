// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server state management

use crate::config::ServerConfig;
use crate::error::ServerError;
use folio_ops::{Dispatcher, OperationError};
use std::sync::Arc;

/// Shared server state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Operation dispatcher; owns the registries and the session store
    pub dispatcher: Dispatcher,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get configuration reference
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Convert an operation failure into the error sent to the caller.
    /// With `conceal_forbidden`, a session owned by someone else looks
    /// exactly like a missing one.
    pub fn reject(&self, err: OperationError) -> ServerError {
        match err {
            OperationError::Forbidden(id) if self.config.conceal_forbidden => {
                ServerError::Operation(OperationError::SessionNotFound(id))
            }
            other => ServerError::Operation(other),
        }
    }
}
