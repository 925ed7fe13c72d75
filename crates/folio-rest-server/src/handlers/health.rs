// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Health check endpoints

use crate::state::AppState;
use crate::ServerResult;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Live sessions; absent when the server runs without a session store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<usize>,
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub feature_areas: Vec<String>,
}

/// Health check endpoint
pub async fn health_check() -> ServerResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sessions: None,
    }))
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    let sessions = match state.dispatcher.sessions() {
        Some(store) => Some(store.len().await),
        None => None,
    };
    Ok(Json(HealthResponse {
        status: "ready".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sessions,
    }))
}

/// Version endpoint
pub async fn version(State(state): State<AppState>) -> ServerResult<Json<VersionResponse>> {
    Ok(Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        feature_areas: state
            .dispatcher
            .registries()
            .areas()
            .into_iter()
            .map(|area| area.to_string())
            .collect(),
    }))
}
