// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use crate::auth::{auth_middleware, AuthConfig};
use crate::config::ServerConfig;
use crate::dependencies::DefaultServerDependencies;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::middleware::{rate_limited_as_problem, LIMITER_CLEANUP_INTERVAL};
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    middleware::{from_fn, map_response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

/// REST API server
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = DefaultServerDependencies::new(config.clone()).await?.into_state();
        Ok(Self::with_state(config, state))
    }

    /// Construct a server from an already-built app state (used for custom dependencies)
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let app = Self::build_app(state, &config);
        Self { config, app }
    }

    /// Build the Axum application with routes and middleware
    fn build_app(state: AppState, config: &ServerConfig) -> Router {
        let cors = if config.enable_cors {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            CorsLayer::new()
                .allow_origin(vec![
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://127.0.0.1:3000"),
                ])
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::HeaderName::from_static(crate::auth::CLIENT_HEADER),
                ])
        };

        // Per peer IP token bucket; the cleanup task ends with the router
        let rate_limit = config
            .rate_limit
            .quota()
            .and_then(|(replenish_ms, burst)| {
                GovernorConfigBuilder::default()
                    .per_millisecond(replenish_ms)
                    .burst_size(burst)
                    .finish()
            })
            .map(|governor| {
                let governor = Arc::new(governor);
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let limiter = Arc::downgrade(governor.limiter());
                    runtime.spawn(async move {
                        let mut ticker = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
                        ticker.tick().await;
                        loop {
                            ticker.tick().await;
                            let Some(limiter) = limiter.upgrade() else {
                                break;
                            };
                            limiter.retain_recent();
                            debug!(clients = limiter.len(), "Pruned rate limiter state");
                        }
                    });
                }
                GovernorLayer { config: governor }
            });

        // Preflight requests are answered by CORS before auth sees them
        let middleware_stack = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
            .layer(map_response(rate_limited_as_problem))
            .option_layer(rate_limit)
            .layer(from_fn({
                let auth_config = AuthConfig::from_config(config);
                move |req, next| auth_middleware(auth_config.clone(), req, next)
            }));

        let api_routes = Router::new()
            // Health and status endpoints
            .route("/healthz", get(handlers::health::health_check))
            .route("/readyz", get(handlers::health::readiness_check))
            .route("/version", get(handlers::health::version))
            // Tool catalog and invocation
            .route("/tools", get(handlers::tools::list_tools))
            .route("/tools/:area", post(handlers::tools::call_tool))
            // Session management
            .route(
                "/sessions",
                get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
            )
            .route(
                "/sessions/:id",
                get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
            )
            .route(
                "/sessions/:id/export",
                post(handlers::sessions::export_session),
            );

        Router::new()
            .nest("/api/v1", api_routes)
            .with_state(state)
            .layer(middleware_stack)
    }

    /// The application router, for driving the server in-process
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Run the server
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        info!("Starting server on {}", listener.local_addr()?);
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| ServerError::Internal(format!("REST server error: {err}")))
    }

    /// Get the bind address
    pub fn addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    } else {
        // No signal handler available; serve until the task is dropped
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn server(config: ServerConfig) -> Server {
        Server::new(config).await.unwrap()
    }

    /// Requests as they arrive from `axum::serve`, tagged with the peer
    fn from_peer(peer: &str, builder: axum::http::request::Builder) -> axum::http::request::Builder {
        let addr: SocketAddr = peer.parse().unwrap();
        builder.extension(ConnectInfo(addr))
    }

    fn get(peer: &str, uri: &str) -> Request<Body> {
        from_peer(peer, Request::get(uri)).body(Body::empty()).unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_is_public_even_with_api_key() {
        let app = server(ServerConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        })
        .await
        .router();

        let response = app
            .clone()
            .oneshot(get("127.0.0.1:4000", "/api/v1/healthz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let response = app
            .oneshot(get("127.0.0.1:4000", "/api/v1/tools"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn malformed_body_is_a_problem_document() {
        let app = server(ServerConfig::default()).await.router();
        let response = app
            .oneshot(
                from_peer("127.0.0.1:4000", Request::post("/api/v1/tools/paragraph"))
                    .header("content-type", "application/json")
                    .body(Body::from("{\"operation\": 7}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["kind"], "invalid_parameter");
    }

    #[tokio::test]
    async fn rate_limit_rejects_excess_requests_per_peer() {
        let app = server(ServerConfig {
            rate_limit: crate::config::RateLimitConfig {
                requests_per_minute: 1,
            },
            ..Default::default()
        })
        .await
        .router();
        let healthz = |peer: &str| get(peer, "/api/v1/healthz");
        assert_eq!(
            app.clone().oneshot(healthz("10.0.0.1:4000")).await.unwrap().status(),
            StatusCode::OK
        );
        let limited = app.clone().oneshot(healthz("10.0.0.1:4001")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json(limited).await["kind"], "rate_limited");
        // Another address has its own budget
        assert_eq!(
            app.oneshot(healthz("10.0.0.2:4000")).await.unwrap().status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn default_identity_separates_peers_and_ignores_client_header() {
        let app = server(ServerConfig::default()).await.router();
        let created = app
            .clone()
            .oneshot(
                from_peer("10.0.0.1:4000", Request::post("/api/v1/sessions"))
                    .header("content-type", "application/json")
                    .header(crate::auth::CLIENT_HEADER, "alice")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = json(created).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/sessions/{}", id);

        // Claiming to be alice from another address does not help
        let spoofed = app
            .clone()
            .oneshot(
                from_peer("10.0.0.2:4000", Request::get(uri.as_str()))
                    .header(crate::auth::CLIENT_HEADER, "alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(spoofed.status(), StatusCode::FORBIDDEN);

        // A new connection from the owner's host still owns it
        let owner = app.oneshot(get("10.0.0.1:5000", &uri)).await.unwrap();
        assert_eq!(owner.status(), StatusCode::OK);
    }
}
