//! Full editor sessions driven through the server loop.

use presence_types::ExitStatus;
use serde_json::json;

use crate::common::{ASSETS, Session};

#[tokio::test]
async fn open_edit_close_then_clean_exit() {
    let mut session = Session::start().await;

    let reply = session.initialize("Neovim").await;
    assert_eq!(reply["result"]["serverInfo"]["name"], "presence-lsp");
    assert_eq!(reply["result"]["capabilities"]["textDocumentSync"]["change"], 2);
    assert_eq!(
        *session.presence.logins.lock().unwrap(),
        vec!["1352048301633044521"]
    );

    session
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {
                "uri": "file:///home/me/proj/main.go",
                "languageId": "go",
                "version": 1,
                "text": "package main",
            }}),
        )
        .await;
    let sent = session.wait_for_updates(1).await;
    assert_eq!(sent[0].state, "Viewing main.go");
    assert_eq!(sent[0].details, "In proj");
    let small = sent[0].small.clone().unwrap();
    assert_eq!(small.image, format!("{ASSETS}/icons/go.png"));
    assert_eq!(sent[0].large.clone().unwrap().text, "neovim");

    session
        .notify(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": "file:///home/me/proj/main.go", "version": 2},
                "contentChanges": [{
                    "range": {"start": {"line": 4, "character": 0}, "end": {"line": 4, "character": 0}},
                    "text": "x",
                }],
            }),
        )
        .await;
    let sent = session.wait_for_updates(2).await;
    assert_eq!(sent[1].state, "Editing main.go:5");

    session
        .notify(
            "textDocument/didClose",
            json!({"textDocument": {"uri": "file:///home/me/proj/main.go"}}),
        )
        .await;
    let sent = session.wait_for_updates(3).await;
    assert_eq!(sent[2].state, "No file open");
    assert!(sent[2].small.is_none());

    let reply = session.request("shutdown", json!(null)).await;
    assert!(reply["result"].is_null());
    assert!(*session.presence.logged_out.lock().unwrap());

    session.notify("exit", json!(null)).await;
    assert_eq!(session.finish().await, ExitStatus::Clean);
}

#[tokio::test]
async fn whole_document_change_reports_generic_edit() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    session
        .notify(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": "file:///home/me/proj/notes.unknown", "version": 2},
                "contentChanges": [{"text": "whole file"}],
            }),
        )
        .await;

    let sent = session.wait_for_updates(1).await;
    assert_eq!(sent[0].state, "Editing notes.unknown");
    assert_eq!(sent[0].small.clone().unwrap().text, "Coding in text");
}

#[tokio::test]
async fn exit_without_shutdown_is_abnormal() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    session.notify("exit", json!(null)).await;
    assert_eq!(session.finish().await, ExitStatus::Abnormal);
}

#[tokio::test]
async fn stream_closed_without_exit_is_abnormal() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    assert_eq!(session.finish().await, ExitStatus::Abnormal);
}

#[tokio::test]
async fn documents_before_initialize_are_dropped() {
    let mut session = Session::start().await;

    session
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {"uri": "file:///a.rs", "languageId": "rust"}}),
        )
        .await;
    session.initialize("helix").await;
    session
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {"uri": "file:///b.rs", "languageId": "rust"}}),
        )
        .await;

    let sent = session.wait_for_updates(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].state, "Viewing b.rs");
}
