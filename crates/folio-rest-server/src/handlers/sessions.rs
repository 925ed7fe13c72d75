// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Session management endpoints

use crate::auth::CallerIdentity;
use crate::state::AppState;
use crate::ServerResult;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use folio_api_contract::validation::{validate_create_session_request, validate_export_request};
use folio_api_contract::{
    CreateSessionRequest, ExportRequest, ExportResponse, SessionListResponse, SessionSummary,
};
use std::path::PathBuf;

/// Open a session, optionally loaded from a document on disk
pub async fn create_session(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<SessionSummary>)> {
    let Json(request) = payload?;
    validate_create_session_request(&request)?;
    let summary = state
        .dispatcher
        .create_session(&identity, request.path.map(PathBuf::from))
        .await
        .map_err(|err| state.reject(err))?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// The caller's own sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
) -> ServerResult<Json<SessionListResponse>> {
    let items = state
        .dispatcher
        .list_sessions(&identity)
        .await
        .map_err(|err| state.reject(err))?;
    let total = items.len() as u32;
    Ok(Json(SessionListResponse { items, total }))
}

/// Get a specific session
pub async fn get_session(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
    Path(session_id): Path<String>,
) -> ServerResult<Json<SessionSummary>> {
    let summary = state
        .dispatcher
        .session_summary(&session_id, &identity)
        .await
        .map_err(|err| state.reject(err))?;
    Ok(Json(summary))
}

/// Close a session. An operation in flight on it finishes first.
pub async fn delete_session(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
    Path(session_id): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .dispatcher
        .close_session(&session_id, &identity)
        .await
        .map_err(|err| state.reject(err))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Write the session's current document to disk
pub async fn export_session(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
    Path(session_id): Path<String>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> ServerResult<Json<ExportResponse>> {
    let Json(request) = payload?;
    validate_export_request(&request)?;
    let exported = state
        .dispatcher
        .export_session(
            &session_id,
            &identity,
            PathBuf::from(request.output_path),
            request.format.as_deref(),
        )
        .await
        .map_err(|err| state.reject(err))?;
    Ok(Json(exported))
}
