// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server configuration

use anyhow::Context;
use folio_ops::SessionConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Enable permissive CORS headers for development
    pub enable_cors: bool,

    /// JWT secret for token validation
    pub jwt_secret: Option<String>,

    /// API key for authentication
    pub api_key: Option<String>,

    /// How callers without a JWT are told apart
    pub identity: IdentityPolicy,

    /// Report sessions owned by another client as not found instead of
    /// forbidden
    pub conceal_forbidden: bool,

    /// Session lifecycle and operation limits
    pub sessions: SessionConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3001)),
            enable_cors: false,
            jwt_secret: None,
            api_key: None,
            identity: IdentityPolicy::default(),
            conceal_forbidden: false,
            sessions: SessionConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid server configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }
}

/// Identity resolution for callers that did not present a JWT.
///
/// A valid bearer token always wins; its `sub` claim names the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Every caller is the same client
    Anonymous,
    /// Callers holding the API key may name themselves with the
    /// `x-folio-client` header; everyone else is told apart by peer IP
    ClientHeader,
    /// One client per peer IP address. The port is not part of the identity,
    /// so every connection from one host shares its sessions.
    #[default]
    Peer,
}

impl IdentityPolicy {
    pub fn trusts_client_header(self) -> bool {
        matches!(self, IdentityPolicy::ClientHeader)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per minute per client address; 0 disables the limiter
    pub requests_per_minute: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 600,
        }
    }
}

impl RateLimitConfig {
    pub fn is_enabled(&self) -> bool {
        self.requests_per_minute > 0
    }

    /// Token bucket equivalent of the per-minute budget: one request is
    /// replenished every returned milliseconds, up to a full minute's worth.
    pub fn quota(&self) -> Option<(u64, u32)> {
        if !self.is_enabled() {
            return None;
        }
        let replenish_ms = (60_000 / self.requests_per_minute).max(1);
        let burst = u32::try_from(self.requests_per_minute).unwrap_or(u32::MAX);
        Some((replenish_ms, burst))
    }
}
