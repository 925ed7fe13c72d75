// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio REST API server
//!
//! Exposes every feature-area as `POST /api/v1/tools/:area`, the tool
//! catalog, and explicit session management. Each request is attributed to
//! a caller identity (JWT subject, trusted client header or peer address)
//! which scopes the sessions it can see.

pub mod auth;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
