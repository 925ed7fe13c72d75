// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio REST API server binary

use clap::Parser;
use folio_logging::CliLoggingArgs;
use folio_rest_server::config::IdentityPolicy;
use folio_rest_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address for the server
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable CORS for development
    #[arg(long)]
    cors: bool,

    /// Require `Authorization: ApiKey <key>`
    #[arg(long, env = "FOLIO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Accept `Authorization: Bearer <jwt>` signed with this secret
    #[arg(long, env = "FOLIO_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// How callers without a JWT are told apart
    #[arg(long, value_enum)]
    identity: Option<IdentityPolicy>,

    /// Report foreign sessions as not found
    #[arg(long)]
    conceal_forbidden: bool,

    /// Idle seconds before a session is evicted
    #[arg(long)]
    session_ttl: Option<u64>,

    /// Maximum number of live sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Seconds one operation may run
    #[arg(long)]
    operation_timeout: Option<u64>,

    /// Create sessions under unknown client-supplied ids
    #[arg(long)]
    adopt_unknown_session_ids: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(ServerConfig, CliLoggingArgs)> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        config.enable_cors |= self.cors;
        if self.api_key.is_some() {
            config.api_key = self.api_key;
        }
        if self.jwt_secret.is_some() {
            config.jwt_secret = self.jwt_secret;
        }
        if let Some(identity) = self.identity {
            config.identity = identity;
        }
        config.conceal_forbidden |= self.conceal_forbidden;
        if let Some(ttl) = self.session_ttl {
            config.sessions.ttl_secs = ttl;
        }
        if let Some(max) = self.max_sessions {
            config.sessions.max_sessions = Some(max);
        }
        if let Some(timeout) = self.operation_timeout {
            config.sessions.operation_timeout_secs = timeout;
        }
        config.sessions.adopt_unknown_ids |= self.adopt_unknown_session_ids;
        Ok((config, self.logging))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, logging) = Args::parse().into_config()?;
    logging.init("folio-server")?;

    tracing::info!(
        bind = %config.bind_addr,
        identity = ?config.identity,
        api_key = config.api_key.as_ref().map(folio_logging::redact),
        jwt = config.jwt_secret.as_ref().map(folio_logging::redact),
        session_ttl_secs = config.sessions.ttl_secs,
        max_sessions = ?config.sessions.max_sessions,
        "Starting Folio REST API server"
    );

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
