// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for API contract validation and the wire error format

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during API contract validation and parsing
#[derive(Debug, Error)]
pub enum ApiContractError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path '{0}': {1}")]
    InvalidPath(String, &'static str),
}

/// Machine-readable failure category carried by every error response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownFeatureArea,
    UnknownOperation,
    MissingParameter,
    InvalidParameter,
    SessionNotFound,
    Forbidden,
    SessionLimitReached,
    DocumentLoadFailure,
    DocumentSaveFailure,
    HandlerExecutionFailure,
    Timeout,
    Unauthorized,
    RateLimited,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownFeatureArea => "unknown_feature_area",
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::SessionNotFound => "session_not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::SessionLimitReached => "session_limit_reached",
            ErrorKind::DocumentLoadFailure => "document_load_failure",
            ErrorKind::DocumentSaveFailure => "document_save_failure",
            ErrorKind::HandlerExecutionFailure => "handler_execution_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problem+JSON error response format as per RFC 7807
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub detail: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub errors: HashMap<String, Vec<String>>,
}
