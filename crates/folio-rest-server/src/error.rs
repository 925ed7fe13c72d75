// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server error types and handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_api_contract::{ApiContractError, ErrorKind, ProblemDetails};
use folio_ops::{OperationError, RegistryError};
use std::collections::HashMap;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ApiContractError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Handler registration error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limited")]
    RateLimited,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownFeatureArea | ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::UnknownOperation
        | ErrorKind::MissingParameter
        | ErrorKind::InvalidParameter => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::SessionLimitReached => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::DocumentLoadFailure | ErrorKind::HandlerExecutionFailure => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::DocumentSaveFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn title_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::UnknownFeatureArea => "Unknown Feature Area",
        ErrorKind::UnknownOperation => "Unknown Operation",
        ErrorKind::MissingParameter => "Missing Parameter",
        ErrorKind::InvalidParameter => "Invalid Parameter",
        ErrorKind::SessionNotFound => "Session Not Found",
        ErrorKind::Forbidden => "Forbidden",
        ErrorKind::SessionLimitReached => "Session Limit Reached",
        ErrorKind::DocumentLoadFailure => "Document Load Failed",
        ErrorKind::DocumentSaveFailure => "Document Save Failed",
        ErrorKind::HandlerExecutionFailure => "Operation Failed",
        ErrorKind::Timeout => "Operation Timed Out",
        ErrorKind::Unauthorized => "Authentication Failed",
        ErrorKind::RateLimited => "Rate Limited",
        ErrorKind::Internal => "Internal Server Error",
    }
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::Operation(err) => err.kind(),
            ServerError::Auth(_) => ErrorKind::Unauthorized,
            ServerError::Validation(_) | ServerError::BadRequest(_) => ErrorKind::InvalidParameter,
            ServerError::Registry(_) | ServerError::Internal(_) => ErrorKind::Internal,
            ServerError::RateLimited => ErrorKind::RateLimited,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }

    /// Convert error to Problem+JSON response
    pub fn to_problem(&self) -> ProblemDetails {
        let kind = self.kind();
        let mut errors = HashMap::new();
        let detail = match self {
            ServerError::Operation(err) => {
                match err {
                    OperationError::UnknownFeatureArea { valid, .. }
                    | OperationError::UnknownOperation { valid, .. } => {
                        errors.insert("valid".to_string(), valid.clone());
                    }
                    OperationError::MissingParameter(name) => {
                        errors.insert(name.clone(), vec!["required".to_string()]);
                    }
                    OperationError::InvalidParameter { name, reason } => {
                        errors.insert(name.clone(), vec![reason.clone()]);
                    }
                    _ => {}
                }
                err.to_string()
            }
            ServerError::Auth(msg) | ServerError::BadRequest(msg) | ServerError::Internal(msg) => {
                msg.clone()
            }
            ServerError::Validation(err) => err.to_string(),
            ServerError::Registry(err) => err.to_string(),
            ServerError::RateLimited => "Too many requests".to_string(),
        };

        ProblemDetails {
            problem_type: format!(
                "https://docs.example.com/errors/{}",
                kind.as_str().replace('_', "-")
            ),
            title: title_for(kind).to_string(),
            status: Some(status_for(kind).as_u16()),
            detail,
            kind,
            errors,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let problem = self.to_problem();
        if problem.kind == ErrorKind::Internal {
            tracing::error!(error = %self, "Request failed");
        }
        let status = problem
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

/// Convert any error to ServerError
impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

/// Convert IO errors
impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_ops::FeatureArea;

    #[test]
    fn operation_errors_map_to_statuses() {
        let cases = [
            (OperationError::SessionNotFound("s".into()), StatusCode::NOT_FOUND),
            (OperationError::Forbidden("s".into()), StatusCode::FORBIDDEN),
            (
                OperationError::MissingParameter("text".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                OperationError::SessionLimitReached { limit: 2 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                OperationError::Timeout {
                    operation: "add".into(),
                    after: std::time::Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn unknown_operation_problem_lists_valid_names() {
        let problem = ServerError::from(OperationError::UnknownOperation {
            area: FeatureArea::Bookmark,
            name: "rename".into(),
            valid: vec!["add".into(), "delete".into()],
        })
        .to_problem();
        assert_eq!(problem.kind, ErrorKind::UnknownOperation);
        assert_eq!(problem.status, Some(400));
        assert_eq!(problem.problem_type, "https://docs.example.com/errors/unknown-operation");
        assert_eq!(problem.errors["valid"], vec!["add", "delete"]);
    }

    #[test]
    fn invalid_parameter_problem_names_the_field() {
        let problem = ServerError::from(OperationError::InvalidParameter {
            name: "index".into(),
            reason: "out of range".into(),
        })
        .to_problem();
        assert_eq!(problem.errors["index"], vec!["out of range"]);
        assert_eq!(problem.detail, "Invalid parameter 'index': out of range");
    }

    #[test]
    fn auth_and_rate_limit_problems() {
        assert_eq!(
            ServerError::Auth("Invalid API key".into()).to_problem().status,
            Some(401)
        );
        let limited = ServerError::RateLimited.to_problem();
        assert_eq!(limited.kind, ErrorKind::RateLimited);
        assert_eq!(limited.status, Some(429));
    }
}
