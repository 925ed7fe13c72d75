// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only
#![allow(dead_code)]

use std::time::Duration;

use folio_rest_server::config::IdentityPolicy;
use folio_rest_server::{Server, ServerConfig};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// API key the test servers accept unless a test configures another
pub const TEST_API_KEY: &str = "test-key";

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    api_key: Option<String>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base, path)
    }

    /// A request from the client named by `x-folio-client`, carrying the
    /// server's API key so the name is honoured
    pub fn request(&self, method: reqwest::Method, who: &str, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header("x-folio-client", who);
        match &self.api_key {
            Some(key) => builder.header("authorization", format!("ApiKey {}", key)),
            None => builder,
        }
    }

    /// POST a tool call as `who`
    pub async fn call(&self, who: &str, area: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let response = self
            .request(reqwest::Method::POST, who, &format!("/tools/{}", area))
            .json(&body)
            .send()
            .await
            .expect("send tool call");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    pub async fn get(&self, who: &str, path: &str) -> (reqwest::StatusCode, Value) {
        let response = self
            .request(reqwest::Method::GET, who, path)
            .send()
            .await
            .expect("send get");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }
}

/// Start a server on an ephemeral port and wait until it answers
pub async fn spawn_server(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to ephemeral port");
    let addr = listener.local_addr().expect("port");

    let mut config = ServerConfig {
        bind_addr: addr,
        api_key: Some(TEST_API_KEY.to_string()),
        identity: IdentityPolicy::ClientHeader,
        ..Default::default()
    };
    configure(&mut config);
    let api_key = config.api_key.clone();

    let server = Server::new(config).await.expect("server");
    let handle = tokio::spawn(async move {
        server.serve(listener).await.expect("server run");
    });

    let base = format!("http://{}", addr);
    wait_for_health(&base).await;
    TestServer {
        base,
        client: reqwest::Client::new(),
        api_key,
        handle,
    }
}

async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    let healthz = format!("{}/api/v1/healthz", base_url);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(response) = client.get(&healthz).send().await {
            if response.status().is_success() {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("server did not become healthy at {}", healthz);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
