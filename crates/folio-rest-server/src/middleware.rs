// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Custom middleware

use crate::error::ServerError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Interval at which idle per-client rate limiter buckets are dropped
pub const LIMITER_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Rewrite the rate limiter's plain-text rejection as a problem document so
/// every error response has the same shape
pub async fn rate_limited_as_problem(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }
    tracing::warn!("Rate limit exceeded");
    let retry_after = response.headers().get(header::RETRY_AFTER).cloned();
    let mut problem = ServerError::RateLimited.into_response();
    if let Some(retry_after) = retry_after {
        problem.headers_mut().insert(header::RETRY_AFTER, retry_after);
    }
    problem
}
