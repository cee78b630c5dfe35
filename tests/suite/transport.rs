//! Protocol-level error handling.

use presence_types::ExitStatus;
use serde_json::json;

use crate::common::Session;

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let mut session = Session::start().await;

    let reply = session.request("shutdown", json!(null)).await;
    assert_eq!(reply["error"]["code"], -32002);

    session.initialize("helix").await;
    let reply = session.request("shutdown", json!(null)).await;
    assert!(reply.get("error").is_none());
}

#[tokio::test]
async fn unknown_requests_get_method_not_found() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    let reply = session
        .request("textDocument/hover", json!({"textDocument": {"uri": "file:///a.rs"}}))
        .await;
    assert_eq!(reply["error"]["code"], -32601);
}

#[tokio::test]
async fn invalid_initialize_params_are_reported() {
    let mut session = Session::start().await;

    let reply = session
        .request("initialize", json!({"clientInfo": "not an object"}))
        .await;
    assert_eq!(reply["error"]["code"], -32602);

    let reply = session.initialize("helix").await;
    assert!(reply["result"]["capabilities"].is_object());
}

#[tokio::test]
async fn second_initialize_is_rejected() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    let reply = session.initialize("neovim").await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(session.presence.logins.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_notification_does_not_stop_the_loop() {
    let mut session = Session::start().await;
    session.initialize("helix").await;

    session.notify("textDocument/didOpen", json!({})).await;
    session.notify("textDocument/didChange", json!(null)).await;
    session
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {"uri": "file:///srv/lib.rs", "languageId": "rust"}}),
        )
        .await;

    let sent = session.wait_for_updates(1).await;
    assert_eq!(sent[0].state, "Viewing lib.rs");
}

#[tokio::test]
async fn unparseable_frame_gets_parse_error_reply() {
    let mut session = Session::start().await;
    session.send_raw(b"Content-Length: 5\r\n\r\n{oops").await;

    let reply = session.recv().await;
    assert_eq!(reply["error"]["code"], -32700);
    assert!(reply["id"].is_null());

    session.initialize("helix").await;
    session.notify("exit", json!(null)).await;
    assert_eq!(session.finish().await, ExitStatus::Abnormal);
}
