// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Tool catalog and tool call endpoints

use crate::auth::CallerIdentity;
use crate::state::AppState;
use crate::ServerResult;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use folio_api_contract::validation::validate_tool_call_request;
use folio_api_contract::{ToolCallRequest, ToolCallResponse, ToolCatalog};
use std::sync::Arc;

/// Every feature-area with its operations and argument schemas
pub async fn list_tools(State(state): State<AppState>) -> ServerResult<Json<ToolCatalog>> {
    Ok(Json(state.dispatcher.catalog()))
}

/// Invoke one operation of a feature-area
pub async fn call_tool(
    State(state): State<AppState>,
    Extension(CallerIdentity(identity)): Extension<CallerIdentity>,
    Path(area): Path<String>,
    payload: Result<Json<ToolCallRequest>, JsonRejection>,
) -> ServerResult<Json<ToolCallResponse>> {
    let Json(request) = payload?;
    validate_tool_call_request(&request)?;
    let response = state
        .dispatcher
        .dispatch(Arc::new(identity), &area, request)
        .await
        .map_err(|err| state.reject(err))?;
    Ok(Json(response))
}
