// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Authentication and caller identity

use crate::config::{IdentityPolicy, ServerConfig};
use crate::error::ServerError;
use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use folio_ops::Identity;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Header a trusted client uses to name itself
pub const CLIENT_HEADER: &str = "x-folio-client";

/// Routes reachable without credentials
const PUBLIC_PATHS: [&str; 3] = ["/api/v1/healthz", "/api/v1/readyz", "/api/v1/version"];

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub identity: IdentityPolicy,
}

impl AuthConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
            identity: config.identity,
        }
    }

    /// Check if authentication is required
    pub fn requires_auth(&self) -> bool {
        self.api_key.is_some() || self.jwt_secret.is_some()
    }

    /// Validate API key authentication
    pub fn validate_api_key(&self, provided_key: &str) -> Result<(), ServerError> {
        match &self.api_key {
            Some(expected_key) if expected_key == provided_key => Ok(()),
            Some(_) => Err(ServerError::Auth("Invalid API key".to_string())),
            None => Err(ServerError::Auth(
                "API key authentication not configured".to_string(),
            )),
        }
    }

    /// Validate JWT token
    pub fn validate_jwt(&self, token: &str) -> Result<Claims, ServerError> {
        let Some(secret) = &self.jwt_secret else {
            return Err(ServerError::Auth("JWT authentication not configured".to_string()));
        };
        let decoding_key = DecodingKey::from_secret(secret.as_ref());
        let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
            .map_err(|_| ServerError::Auth("Invalid JWT token".to_string()))?;
        Ok(token_data.claims)
    }

    /// Check the `Authorization` header and report what the caller proved
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Credentials, ServerError> {
        let auth_header = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok());
        match auth_header {
            Some(auth) if auth.starts_with("ApiKey ") => {
                self.validate_api_key(auth.trim_start_matches("ApiKey "))?;
                Ok(Credentials::ApiKey)
            }
            Some(auth) if auth.starts_with("Bearer ") => self
                .validate_jwt(auth.trim_start_matches("Bearer "))
                .map(Credentials::Token),
            _ if self.requires_auth() => Err(ServerError::Auth(
                "Missing or invalid authorization header".to_string(),
            )),
            _ => Ok(Credentials::Unauthenticated),
        }
    }

    /// Name the caller. A verified token subject wins. Under the client
    /// header policy an API-key holder may name itself; otherwise callers
    /// are told apart by peer IP unless the policy is anonymous.
    pub fn resolve_identity(
        &self,
        credentials: &Credentials,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Identity {
        match credentials {
            Credentials::Token(claims) => return Identity::new(format!("jwt:{}", claims.sub)),
            Credentials::ApiKey if self.identity.trusts_client_header() => {
                let client = headers
                    .get(CLIENT_HEADER)
                    .and_then(|h| h.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty());
                if let Some(client) = client {
                    return Identity::new(format!("client:{}", client));
                }
            }
            _ => {}
        }
        match (self.identity, peer) {
            (IdentityPolicy::Anonymous, _) | (_, None) => Identity::anonymous(),
            (_, Some(peer)) => Identity::new(format!("peer:{}", peer.ip())),
        }
    }
}

/// What a request proved about itself
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Nothing; only possible when the server requires no credentials
    Unauthenticated,
    ApiKey,
    Token(Claims),
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: usize,  // Expiration time
}

/// Identity of the caller, placed in request extensions by
/// [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Identity);

/// Authentication middleware
pub async fn auth_middleware(auth_config: AuthConfig, mut req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if PUBLIC_PATHS.contains(&path) {
        return next.run(req).await;
    }

    let credentials = match auth_config.authenticate(req.headers()) {
        Ok(credentials) => credentials,
        Err(err) => {
            tracing::debug!(path, error = %err, "Rejected unauthenticated request");
            return err.into_response();
        }
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = auth_config.resolve_identity(&credentials, req.headers(), peer);
    req.extensions_mut().insert(CallerIdentity(identity));
    next.run(req).await
}
