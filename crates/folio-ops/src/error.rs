// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy of the operation layer

use crate::registry::FeatureArea;
use folio_api_contract::ErrorKind;
use folio_document::DocumentError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Operation result type
pub type OperationResult<T> = Result<T, OperationError>;

/// Failure of one call, as surfaced to the caller
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Unknown feature area '{name}'; valid areas: {}", .valid.join(", "))]
    UnknownFeatureArea { name: String, valid: Vec<String> },

    #[error("Unknown operation '{name}' for {area}; valid operations: {}", .valid.join(", "))]
    UnknownOperation {
        area: FeatureArea,
        name: String,
        valid: Vec<String>,
    },

    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("Session '{0}' belongs to another client")]
    Forbidden(String),

    #[error("Session limit of {limit} reached and every session is busy")]
    SessionLimitReached { limit: usize },

    #[error("Failed to load document {}: {source}", .path.display())]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to save document {}: {source}", .path.display())]
    DocumentSave {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("Operation '{operation}' failed: {source}")]
    HandlerExecution {
        operation: String,
        #[source]
        source: HandlerError,
    },

    #[error("'{operation}' did not finish within {}s", .after.as_secs_f64())]
    Timeout { operation: String, after: Duration },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::UnknownFeatureArea { .. } => ErrorKind::UnknownFeatureArea,
            OperationError::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            OperationError::MissingParameter(_) => ErrorKind::MissingParameter,
            OperationError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            OperationError::SessionNotFound(_) => ErrorKind::SessionNotFound,
            OperationError::Forbidden(_) => ErrorKind::Forbidden,
            OperationError::SessionLimitReached { .. } => ErrorKind::SessionLimitReached,
            OperationError::DocumentLoad { .. } => ErrorKind::DocumentLoadFailure,
            OperationError::DocumentSave { .. } => ErrorKind::DocumentSaveFailure,
            OperationError::HandlerExecution { .. } => ErrorKind::HandlerExecutionFailure,
            OperationError::Timeout { .. } => ErrorKind::Timeout,
            OperationError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap a handler failure. Caller input errors pass through unchanged;
    /// everything else carries the operation name.
    pub fn from_handler(operation: &str, err: HandlerError) -> Self {
        match err {
            HandlerError::MissingParameter(name) => OperationError::MissingParameter(name),
            HandlerError::InvalidParameter { name, reason } => {
                OperationError::InvalidParameter { name, reason }
            }
            HandlerError::Operation(inner) => *inner,
            other => OperationError::HandlerExecution {
                operation: operation.to_string(),
                source: other,
            },
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        OperationError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors a handler body can raise
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A failure already classified by the operation layer, e.g. an export
    /// write error surfacing as a save failure
    #[error(transparent)]
    Operation(Box<OperationError>),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        HandlerError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Handler result type
pub type HandlerResult = Result<crate::finalize::HandlerOutput, HandlerError>;

/// Registry construction errors. These are configuration mistakes and are
/// raised when registries are built, never while serving a call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Operation '{name}' is registered twice in {area}")]
    DuplicateOperation { area: FeatureArea, name: String },

    #[error("Feature area {0} is registered twice")]
    DuplicateArea(FeatureArea),
}
