// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use common::spawn_server;
use folio_rest_server::config::IdentityPolicy;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn session_round_trip_over_http() {
    let server = spawn_server(|_| {}).await;
    let dir = tempfile::tempdir().unwrap();

    let (status, first) = server
        .call(
            "alice",
            "paragraph",
            json!({ "operation": "add", "open_session": true, "arguments": { "text": "first" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["persisted"], json!({ "mode": "resident" }));
    assert_eq!(first["revision"], 1);
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (status, second) = server
        .call(
            "alice",
            "paragraph",
            json!({ "operation": "Add", "session_id": session_id, "arguments": { "text": "second" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second["revision"], 2);

    let out = dir.path().join("out.txt");
    let response = server
        .request(
            reqwest::Method::POST,
            "alice",
            &format!("/sessions/{}/export", session_id),
        )
        .json(&json!({ "output_path": out.display().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exported: serde_json::Value = response.json().await.unwrap();
    assert_eq!(exported["format"], "text");
    assert_eq!(exported["revision"], 2);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "first\n\nsecond\n");

    // Bob can neither read nor operate on Alice's session
    let (status, problem) = server.get("bob", &format!("/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(problem["kind"], "forbidden");
    let (status, problem) = server
        .call(
            "bob",
            "paragraph",
            json!({ "operation": "list", "session_id": session_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!problem.to_string().contains("first"));

    let (_, bobs) = server.get("bob", "/sessions").await;
    assert_eq!(bobs["total"], 0);
    let (_, alices) = server.get("alice", "/sessions").await;
    assert_eq!(alices["total"], 1);
    assert_eq!(alices["items"][0]["id"], session_id.as_str());

    let response = server
        .request(
            reqwest::Method::DELETE,
            "alice",
            &format!("/sessions/{}", session_id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, problem) = server.get("alice", &format!("/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["kind"], "session_not_found");
}

#[tokio::test]
async fn concealed_forbidden_reads_as_not_found() {
    let server = spawn_server(|config| config.conceal_forbidden = true).await;
    let response = server
        .request(reqwest::Method::POST, "alice", "/sessions")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let session: serde_json::Value = response.json().await.unwrap();
    let id = session["id"].as_str().unwrap();

    let (foreign_status, foreign) = server.get("bob", &format!("/sessions/{}", id)).await;
    let (missing_status, missing) = server.get("bob", "/sessions/no-such-session").await;
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign["kind"], missing["kind"]);
}

#[tokio::test]
async fn unknown_names_list_the_valid_ones() {
    let server = spawn_server(|_| {}).await;

    let (status, problem) = server.call("a", "chart", json!({ "operation": "add" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["kind"], "unknown_feature_area");
    assert!(problem["errors"]["valid"]
        .as_array()
        .unwrap()
        .contains(&json!("paragraph")));

    let (status, problem) = server
        .call("a", "bookmark", json!({ "operation": "rename", "path": "/tmp/x.json" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["kind"], "unknown_operation");
    assert_eq!(
        problem["errors"]["valid"],
        json!(["add", "delete", "get", "list"])
    );

    let (status, problem) = server.call("a", "paragraph", json!({ "operation": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["kind"], "invalid_parameter");
}

#[tokio::test]
async fn file_mode_saves_only_modifications() {
    let server = spawn_server(|_| {}).await;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    let output = dir.path().join("copy.txt");
    std::fs::write(&source, "hello\n").unwrap();

    let (status, read) = server
        .call(
            "a",
            "text",
            json!({
                "operation": "statistics",
                "path": source.display().to_string(),
                "output_path": output.display().to_string()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{read}");
    assert_eq!(read["persisted"], json!({ "mode": "none" }));
    assert_eq!(read["result"]["value"]["words"], 1);
    assert!(!output.exists());

    let (status, written) = server
        .call(
            "a",
            "paragraph",
            json!({
                "operation": "add",
                "path": source.display().to_string(),
                "arguments": { "text": "world" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{written}");
    assert_eq!(written["persisted"]["mode"], "saved");
    assert!(written.get("session_id").is_none());
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "hello\n\nworld\n");

    let (status, problem) = server
        .call(
            "a",
            "document",
            json!({ "operation": "info", "path": dir.path().join("absent.json").display().to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(problem["kind"], "document_load_failure");
    assert!(problem["detail"].as_str().unwrap().contains("absent.json"));
}

#[tokio::test]
async fn client_header_is_ignored_without_credentials() {
    let server = spawn_server(|config| {
        config.api_key = None;
        config.identity = IdentityPolicy::default();
    })
    .await;

    let (status, created) = server
        .call("alice", "text", json!({ "operation": "statistics", "open_session": true }))
        .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    let session_id = created["session_id"].as_str().unwrap();

    // Every loopback caller is the same peer, whatever name it claims
    let (status, _) = server.get("bob", &format!("/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = server.get("mallory", "/sessions").await;
    assert_eq!(listed["total"], 1);
}

fn bearer(secret: &str, sub: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }
    let claims = Claims {
        sub,
        exp: chrono::Utc::now().timestamp() + 600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

#[tokio::test]
async fn credentials_are_required_and_name_the_caller() {
    let server = spawn_server(|config| {
        config.api_key = Some("k3y".into());
        config.jwt_secret = Some("s3cret".into());
    })
    .await;

    let response = server.client.get(server.url("/tools")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .get(server.url("/tools"))
        .header("authorization", "ApiKey k3y")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .post(server.url("/sessions"))
        .header("authorization", bearer("s3cret", "alice"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let session: serde_json::Value = response.json().await.unwrap();
    let path = server.url(&format!("/sessions/{}", session["id"].as_str().unwrap()));

    // The client header cannot override a verified subject
    let response = server
        .client
        .get(&path)
        .header("authorization", bearer("s3cret", "bob"))
        .header("x-folio-client", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .get(&path)
        .header("authorization", bearer("s3cret", "alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .get(&path)
        .header("authorization", bearer("wrong", "alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_and_status_endpoints() {
    let server = spawn_server(|_| {}).await;

    let (status, catalog) = server.get("a", "/tools").await;
    assert_eq!(status, StatusCode::OK);
    let areas: Vec<_> = catalog["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["area"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        areas,
        vec!["document", "paragraph", "table", "bookmark", "properties", "text"]
    );

    let (status, version) = server.get("a", "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["feature_areas"].as_array().unwrap().len(), 6);

    server
        .call("a", "text", json!({ "operation": "statistics", "open_session": true }))
        .await;
    let (status, ready) = server.get("a", "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["sessions"], 1);
}
