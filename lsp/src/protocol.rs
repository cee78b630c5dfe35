//! LSP message shapes handled by the server.

use std::path::PathBuf;

use presence_types::DocumentChange;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const SERVER_NOT_INITIALIZED: i64 = -32002;

/// Incremental document sync (`TextDocumentSyncKind.Incremental`).
const SYNC_INCREMENTAL: u8 = 2;

#[derive(Debug, PartialEq)]
pub enum Incoming {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// Reply to a server-initiated request; we never send any.
    Response,
}

/// Classify a JSON-RPC message, or `None` if it is none of the three kinds.
pub fn parse_incoming(message: &Value) -> Option<Incoming> {
    let id = message.get("id").filter(|id| !id.is_null());
    let method = message.get("method").and_then(Value::as_str);
    let params = message.get("params").cloned();

    match (id, method) {
        (Some(id), Some(method)) => Some(Incoming::Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        }),
        (None, Some(method)) => Some(Incoming::Notification {
            method: method.to_string(),
            params,
        }),
        (Some(_), None) if message.get("result").is_some() || message.get("error").is_some() => {
            Some(Incoming::Response)
        }
        _ => None,
    }
}

pub fn success(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn failure(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

pub fn initialize_result(server_name: &str, version: &str) -> Value {
    json!({
        "capabilities": {
            "textDocumentSync": { "openClose": true, "change": SYNC_INCREMENTAL },
        },
        "serverInfo": { "name": server_name, "version": version },
    })
}

/// Deserialize params, treating a missing `params` member as `null`.
pub fn decode_params<T: for<'de> Deserialize<'de>>(params: Option<Value>) -> serde_json::Result<T> {
    serde_json::from_value(params.unwrap_or(Value::Null))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
    #[serde(default)]
    pub root_uri: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
}

#[derive(Debug, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceFolder {
    pub uri: String,
}

impl InitializeParams {
    pub fn editor_name(&self) -> &str {
        self.client_info
            .as_ref()
            .map_or("", |info| info.name.as_str())
    }

    /// Workspace root: `rootUri`, then `rootPath`, then the first workspace folder.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        if let Some(path) = self.root_uri.as_deref().and_then(uri_to_path) {
            return Some(path);
        }
        if let Some(path) = self.root_path.as_deref().filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        self.workspace_folders
            .as_deref()
            .and_then(<[WorkspaceFolder]>::first)
            .and_then(|folder| uri_to_path(&folder.uri))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub text_document: OpenedDocument,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedDocument {
    pub uri: String,
    #[serde(default)]
    pub language_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
    pub text_document: DocumentId,
    #[serde(default)]
    pub content_changes: Vec<Value>,
}

impl DidChangeParams {
    /// Shape of the first content change.
    pub fn change(&self) -> DocumentChange {
        let Some(first) = self.content_changes.first() else {
            return DocumentChange::Unknown;
        };
        if let Some(range) = first.get("range").filter(|range| !range.is_null()) {
            return range["start"]["line"]
                .as_u64()
                .and_then(|line| u32::try_from(line).ok())
                .map_or(DocumentChange::Unknown, |line| DocumentChange::RangedEdit {
                    line,
                });
        }
        if first.get("text").is_some_and(Value::is_string) {
            DocumentChange::WholeReplace
        } else {
            DocumentChange::Unknown
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DidCloseParams {
    #[serde(rename = "textDocument")]
    pub text_document: DocumentId,
}

#[derive(Debug, Deserialize)]
pub struct DocumentId {
    pub uri: String,
}

fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Display name of the document behind `uri`: the last path segment,
/// percent-decoded for `file://` URIs.
pub fn file_name(uri: &str) -> String {
    if let Some(name) = uri_to_path(uri)
        .as_deref()
        .and_then(std::path::Path::file_name)
    {
        return name.to_string_lossy().into_owned();
    }
    uri.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(uri)
        .to_string()
}
