//! Dispatch loop: reads framed messages, drives the engine, writes replies.

use anyhow::Result;
use presence_engine::Engine;
use presence_types::{EditorName, ExitStatus};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::codec::{Frame, FrameReader, FrameWriter};
use crate::protocol::{
    self, DidChangeParams, DidCloseParams, DidOpenParams, INVALID_PARAMS, INVALID_REQUEST,
    Incoming, InitializeParams, METHOD_NOT_FOUND, PARSE_ERROR, SERVER_NOT_INITIALIZED,
};

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "presence-lsp";

/// Serve one editor session over `input`/`output` until `exit` or EOF.
///
/// Each document notification runs as its own task in a [`JoinSet`]; on the
/// way out every outstanding task is aborted and joined before the writer is
/// drained.
pub async fn serve<R, W>(engine: Engine, input: R, output: W) -> Result<ExitStatus>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::channel::<Value>(WRITER_CHANNEL_CAPACITY);
    let writer = tokio::spawn(async move {
        let mut writer = FrameWriter::new(output);
        while let Some(message) = out_rx.recv().await {
            if let Err(e) = writer.write_frame(&message).await {
                tracing::warn!("Failed to write to client: {e:#}");
                break;
            }
        }
    });

    let mut dispatcher = Dispatcher {
        engine,
        out: out_tx,
        tasks: JoinSet::new(),
        initialize_seen: false,
    };
    let mut reader = FrameReader::new(input);

    let status = loop {
        dispatcher.reap();
        match reader.read_frame().await {
            Ok(Some(Frame::Message(message))) => {
                if let Some(status) = dispatcher.dispatch(&message).await {
                    break status;
                }
            }
            Ok(Some(Frame::Malformed(e))) => {
                tracing::warn!("Discarding unparseable message: {e}");
                dispatcher
                    .send(protocol::failure(&Value::Null, PARSE_ERROR, &e))
                    .await;
            }
            Ok(None) => {
                tracing::warn!("Client closed the stream without exit");
                break dispatcher.engine.exit();
            }
            Err(e) => {
                tracing::error!("Transport failure: {e:#}");
                break dispatcher.engine.exit();
            }
        }
    };

    let Dispatcher {
        out, mut tasks, ..
    } = dispatcher;
    tasks.shutdown().await;
    drop(out);
    if let Err(e) = writer.await {
        tracing::warn!("Writer task failed: {e}");
    }
    Ok(status)
}

struct Dispatcher {
    engine: Engine,
    out: mpsc::Sender<Value>,
    tasks: JoinSet<()>,
    initialize_seen: bool,
}

impl Dispatcher {
    async fn send(&self, message: Value) {
        if self.out.send(message).await.is_err() {
            tracing::debug!("Writer closed; dropping outgoing message");
        }
    }

    /// Collect finished handler tasks so the set does not grow unbounded.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined
                && e.is_panic()
            {
                tracing::error!("Handler task panicked: {e}");
            }
        }
    }

    /// Handle one message; `Some` ends the session.
    async fn dispatch(&mut self, message: &Value) -> Option<ExitStatus> {
        match protocol::parse_incoming(message) {
            Some(Incoming::Request { id, method, params }) => {
                self.request(id, &method, params).await;
                None
            }
            Some(Incoming::Notification { method, params }) => self.notification(&method, params),
            Some(Incoming::Response) => {
                tracing::trace!("Ignoring response from client");
                None
            }
            None => {
                tracing::warn!("Ignoring message that is neither request nor notification");
                if let Some(id) = message.get("id") {
                    self.send(protocol::failure(id, INVALID_REQUEST, "invalid request"))
                        .await;
                }
                None
            }
        }
    }

    async fn request(&mut self, id: Value, method: &str, params: Option<Value>) {
        tracing::debug!(method, "Request");
        if method == "initialize" {
            self.initialize(id, params).await;
            return;
        }
        if !self.initialize_seen {
            self.send(protocol::failure(
                &id,
                SERVER_NOT_INITIALIZED,
                "server not initialized",
            ))
            .await;
            return;
        }
        match method {
            "shutdown" => {
                // Inline so a following `exit` sees the shutdown.
                self.engine.shutdown().await;
                self.send(protocol::success(&id, Value::Null)).await;
            }
            _ => {
                self.send(protocol::failure(
                    &id,
                    METHOD_NOT_FOUND,
                    &format!("method not found: {method}"),
                ))
                .await;
            }
        }
    }

    async fn initialize(&mut self, id: Value, params: Option<Value>) {
        if self.initialize_seen {
            self.send(protocol::failure(&id, INVALID_REQUEST, "already initialized"))
                .await;
            return;
        }
        let params: InitializeParams = match protocol::decode_params(params) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("Invalid initialize params: {e}");
                self.send(protocol::failure(&id, INVALID_PARAMS, &e.to_string()))
                    .await;
                return;
            }
        };
        self.initialize_seen = true;

        let editor = EditorName::new(params.editor_name());
        let root = params.workspace_root();
        let engine = self.engine.clone();
        let out = self.out.clone();
        // Login may retry for a long time; keep reading meanwhile.
        self.tasks.spawn(async move {
            engine.initialize(editor, root).await;
            let result =
                protocol::initialize_result(SERVER_NAME, env!("CARGO_PKG_VERSION"));
            if out.send(protocol::success(&id, result)).await.is_err() {
                tracing::debug!("Writer closed before initialize reply");
            }
        });
    }

    fn notification(&mut self, method: &str, params: Option<Value>) -> Option<ExitStatus> {
        match method {
            "exit" => return Some(self.engine.exit()),
            "initialized" => tracing::debug!("Client initialized"),
            "textDocument/didOpen" => {
                let params: DidOpenParams = decode_or_warn(method, params)?;
                let engine = self.engine.clone();
                self.tasks.spawn(async move {
                    let document = params.text_document;
                    let file = protocol::file_name(&document.uri);
                    engine.did_open(&file, &document.language_id).await;
                });
            }
            "textDocument/didChange" => {
                let params: DidChangeParams = decode_or_warn(method, params)?;
                let engine = self.engine.clone();
                self.tasks.spawn(async move {
                    let file = protocol::file_name(&params.text_document.uri);
                    engine.did_change(&file, params.change()).await;
                });
            }
            "textDocument/didClose" => {
                let params: DidCloseParams = decode_or_warn(method, params)?;
                let engine = self.engine.clone();
                self.tasks.spawn(async move {
                    let file = protocol::file_name(&params.text_document.uri);
                    engine.did_close(&file).await;
                });
            }
            _ if method.starts_with("$/") => tracing::trace!(method, "Ignoring notification"),
            _ => tracing::debug!(method, "Unhandled notification"),
        }
        None
    }
}

fn decode_or_warn<T: for<'de> serde::Deserialize<'de>>(
    method: &str,
    params: Option<Value>,
) -> Option<T> {
    match protocol::decode_params(params) {
        Ok(params) => Some(params),
        Err(e) => {
            tracing::warn!(method, "Ignoring notification with invalid params: {e}");
            None
        }
    }
}
