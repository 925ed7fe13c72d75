// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Validation helpers for API contract types

use crate::error::ApiContractError;
use crate::types::*;
use validator::Validate;

/// Validate a tool call request
pub fn validate_tool_call_request(request: &ToolCallRequest) -> Result<(), ApiContractError> {
    request.validate()?;
    if let Some(path) = &request.path {
        validate_document_path(path)?;
    }
    if let Some(path) = &request.output_path {
        validate_document_path(path)?;
    }
    Ok(())
}

pub fn validate_create_session_request(
    request: &CreateSessionRequest,
) -> Result<(), ApiContractError> {
    request.validate()?;
    if let Some(path) = &request.path {
        validate_document_path(path)?;
    }
    Ok(())
}

pub fn validate_export_request(request: &ExportRequest) -> Result<(), ApiContractError> {
    request.validate()?;
    validate_document_path(&request.output_path)
}

/// Reject paths that cannot name a document file
pub fn validate_document_path(path: &str) -> Result<(), ApiContractError> {
    if path.trim().is_empty() {
        return Err(ApiContractError::InvalidPath(path.to_string(), "path is blank"));
    }
    if path.contains('\0') {
        return Err(ApiContractError::InvalidPath(
            path.to_string(),
            "path contains a NUL byte",
        ));
    }
    if path.ends_with('/') || path.ends_with('\\') {
        return Err(ApiContractError::InvalidPath(
            path.to_string(),
            "path names a directory",
        ));
    }
    Ok(())
}
