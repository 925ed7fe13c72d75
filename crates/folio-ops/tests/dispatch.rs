// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end behavior of the dispatcher against real files

use folio_api_contract::{ErrorKind, Persistence, ToolCallRequest};
use folio_ops::{Dispatcher, Identity, IdentityAccessor, OperationError, SessionConfig};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn dispatcher() -> Dispatcher {
    Dispatcher::with_defaults(SessionConfig::default()).unwrap()
}

fn who(name: &str) -> Arc<dyn IdentityAccessor> {
    Arc::new(Identity::new(name))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn call(operation: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        operation: operation.to_string(),
        arguments: args(arguments),
        ..Default::default()
    }
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn session_add_add_export_preserves_order() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let alice = who("alice");

    let first = d
        .dispatch(
            Arc::clone(&alice),
            "paragraph",
            ToolCallRequest {
                open_session: true,
                ..call("add", json!({ "text": "first" }))
            },
        )
        .await
        .unwrap();
    let session_id = first.session_id.clone().unwrap();
    assert!(first.modified);
    assert_eq!(first.persisted, Persistence::Resident);
    assert_eq!(first.revision, Some(1));

    let second = d
        .dispatch(
            Arc::clone(&alice),
            "Paragraph",
            ToolCallRequest {
                session_id: Some(session_id.clone()),
                ..call("ADD", json!({ "text": "second" }))
            },
        )
        .await
        .unwrap();
    assert_eq!(second.revision, Some(2));
    assert_eq!(second.operation, "add");

    let out = dir.path().join("out.txt");
    let exported = d
        .dispatch(
            Arc::clone(&alice),
            "document",
            ToolCallRequest {
                session_id: Some(session_id.clone()),
                ..call("export", json!({ "path": out.display().to_string() }))
            },
        )
        .await
        .unwrap();
    assert!(!exported.modified);
    assert_eq!(exported.persisted, Persistence::None);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "first\n\nsecond\n");

    // Another identity cannot see it
    let err = d
        .dispatch(
            who("bob"),
            "paragraph",
            ToolCallRequest {
                session_id: Some(session_id.clone()),
                ..call("list", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(!err.to_string().contains("first"));
}

#[tokio::test]
async fn file_mode_read_only_call_never_writes_output() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    write(&source, "hello\n");

    let response = d
        .dispatch(
            who("alice"),
            "paragraph",
            ToolCallRequest {
                path: Some(source.display().to_string()),
                output_path: Some(output.display().to_string()),
                ..call("list", json!({}))
            },
        )
        .await
        .unwrap();
    assert!(!response.modified);
    assert_eq!(response.persisted, Persistence::None);
    assert!(response.session_id.is_none());
    assert!(!output.exists());
}

#[tokio::test]
async fn file_mode_modification_saves_to_output_then_source() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    write(&source, "hello\n");

    let response = d
        .dispatch(
            who("alice"),
            "paragraph",
            ToolCallRequest {
                path: Some(source.display().to_string()),
                output_path: Some(output.display().to_string()),
                ..call("add", json!({ "text": "world" }))
            },
        )
        .await
        .unwrap();
    assert_eq!(
        response.persisted,
        Persistence::Saved {
            path: output.display().to_string()
        }
    );
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "hello\n\nworld\n");
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "hello\n");

    d.dispatch(
        who("alice"),
        "paragraph",
        ToolCallRequest {
            path: Some(source.display().to_string()),
            ..call("update", json!({ "index": 0, "text": "bye" }))
        },
    )
    .await
    .unwrap();
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "bye\n");
}

#[tokio::test]
async fn read_only_session_call_leaves_files_untouched() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("doc.txt");
    write(&source, "stable\n");
    let before = std::fs::metadata(&source).unwrap().modified().unwrap();

    let summary = d
        .create_session(&Identity::new("alice"), Some(source.clone()))
        .await
        .unwrap();
    for (area, op) in [("text", "statistics"), ("paragraph", "get"), ("document", "outline")] {
        let response = d
            .dispatch(
                who("alice"),
                area,
                ToolCallRequest {
                    session_id: Some(summary.id.clone()),
                    output_path: Some(source.display().to_string()),
                    ..call(op, json!({ "index": 0 }))
                },
            )
            .await
            .unwrap();
        assert!(!response.modified, "{} {} modified the document", area, op);
        assert_eq!(response.revision, Some(0));
    }
    assert_eq!(std::fs::metadata(&source).unwrap().modified().unwrap(), before);
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "stable\n");
}

#[tokio::test]
async fn unknown_area_and_operation_report_valid_names() {
    let d = dispatcher();
    let err = d.dispatch(who("a"), "chart", call("add", json!({}))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFeatureArea);

    let err = d
        .dispatch(who("a"), "bookmark", call("rename", json!({})))
        .await
        .unwrap_err();
    match err {
        OperationError::UnknownOperation { valid, .. } => {
            assert_eq!(valid, vec!["add", "delete", "get", "list"]);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn missing_path_and_parameters() {
    let d = dispatcher();
    let err = d
        .dispatch(who("a"), "paragraph", call("list", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::InvalidParameter { ref name, .. } if name == "path"));

    let session = d.create_session(&Identity::new("a"), None).await.unwrap();
    let err = d
        .dispatch(
            who("a"),
            "paragraph",
            ToolCallRequest {
                session_id: Some(session.id),
                ..call("add", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingParameter);
}

#[tokio::test]
async fn load_failure_names_the_path() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.json");
    write(&broken, "{ not json");
    let err = d
        .dispatch(
            who("a"),
            "document",
            ToolCallRequest {
                path: Some(broken.display().to_string()),
                ..call("info", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DocumentLoadFailure);
    assert!(err.to_string().contains("broken.json"));
}

#[tokio::test]
async fn unknown_session_id_is_not_adopted_by_default() {
    let d = dispatcher();
    let err = d
        .dispatch(
            who("a"),
            "paragraph",
            ToolCallRequest {
                session_id: Some("made-up".into()),
                ..call("list", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);
}

#[tokio::test]
async fn adopted_session_id_is_created_on_first_reference() {
    let d = Dispatcher::with_defaults(SessionConfig {
        adopt_unknown_ids: true,
        ..Default::default()
    })
    .unwrap();
    let response = d
        .dispatch(
            who("a"),
            "paragraph",
            ToolCallRequest {
                session_id: Some("client-chosen".into()),
                ..call("add", json!({ "text": "x" }))
            },
        )
        .await
        .unwrap();
    assert_eq!(response.session_id.as_deref(), Some("client-chosen"));

    let err = d
        .dispatch(
            who("b"),
            "paragraph",
            ToolCallRequest {
                session_id: Some("client-chosen".into()),
                ..call("list", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn swept_session_id_is_not_resurrected_when_adopting() {
    let d = Dispatcher::with_defaults(SessionConfig {
        adopt_unknown_ids: true,
        ..Default::default()
    })
    .unwrap();
    let alice = who("alice");
    let first = d
        .dispatch(
            Arc::clone(&alice),
            "paragraph",
            ToolCallRequest {
                open_session: true,
                ..call("add", json!({ "text": "first" }))
            },
        )
        .await
        .unwrap();
    let session_id = first.session_id.unwrap();

    let swept = d.sessions().unwrap().sweep(Duration::ZERO).await;
    assert_eq!(swept, vec![session_id.clone()]);

    let err = d
        .dispatch(
            Arc::clone(&alice),
            "paragraph",
            ToolCallRequest {
                session_id: Some(session_id.clone()),
                ..call("add", json!({ "text": "second" }))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);

    // Explicitly closed ids stay closed too
    let closed = d.create_session(&Identity::new("alice"), None).await.unwrap();
    d.close_session(&closed.id, &Identity::new("alice")).await.unwrap();
    let err = d
        .dispatch(
            alice,
            "paragraph",
            ToolCallRequest {
                session_id: Some(closed.id.clone()),
                ..call("list", json!({}))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);
    assert!(d.sessions().unwrap().is_empty().await);
}

#[tokio::test]
async fn closed_session_is_gone_and_export_reports_revision() {
    let d = dispatcher();
    let alice = Identity::new("alice");
    let dir = tempfile::tempdir().unwrap();
    let session = d.create_session(&alice, None).await.unwrap();
    d.dispatch(
        Arc::new(alice.clone()),
        "table",
        ToolCallRequest {
            session_id: Some(session.id.clone()),
            ..call("add", json!({ "data": [["a", "b"], ["1", "2"]] }))
        },
    )
    .await
    .unwrap();

    let target = dir.path().join("export.md");
    let exported = d
        .export_session(&session.id, &alice, target.clone(), None)
        .await
        .unwrap();
    assert_eq!(exported.format, "markdown");
    assert_eq!(exported.revision, 1);
    assert!(std::fs::read_to_string(&target).unwrap().contains("| a | b |"));

    assert!(matches!(
        d.export_session(&session.id, &Identity::new("bob"), target, None).await,
        Err(OperationError::Forbidden(_))
    ));

    d.close_session(&session.id, &alice).await.unwrap();
    assert!(d.list_sessions(&alice).await.unwrap().is_empty());
    let err = d.session_summary(&session.id, &alice).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);
}

#[tokio::test]
async fn handler_failures_carry_operation_name() {
    let d = dispatcher();
    let session = d.create_session(&Identity::new("a"), None).await.unwrap();
    let err = d
        .dispatch(
            who("a"),
            "bookmark",
            ToolCallRequest {
                session_id: Some(session.id),
                ..call("delete", json!({ "name": "nowhere" }))
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerExecutionFailure);
    assert_eq!(
        err.to_string(),
        "Operation 'delete' failed: Bookmark 'nowhere' not found"
    );
}

#[tokio::test]
async fn catalog_describes_every_operation() {
    let catalog = dispatcher().catalog();
    let total: usize = catalog.tools.iter().map(|t| t.operations.len()).sum();
    assert_eq!(total, 3 + 7 + 6 + 4 + 3 + 3);
    let find = catalog
        .tools
        .iter()
        .find(|t| t.area == "text")
        .and_then(|t| t.operations.iter().find(|o| o.name == "find"))
        .unwrap();
    assert!(find.read_only);
    assert!(find.arguments.iter().any(|a| a.name == "text" && a.required));
}
