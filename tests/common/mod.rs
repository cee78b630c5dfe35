//! Shared test utilities and fixtures
//!
//! A [`Session`] runs the real server loop and engine over an in-memory pipe,
//! with the presence service, git and icon probe replaced by fakes.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use presence_config::PresenceConfig;
use presence_engine::{Classifier, Engine, EngineParts};
use presence_lsp_server::codec::{Frame, FrameReader, FrameWriter};
use presence_providers::{
    GitError, GitInfo, GitResolver, ImageProbe, LanguageMapsDocument, Presence, PresenceClient,
    PresenceError, ProviderFut, load_language_maps,
};
use presence_types::{ActivityPayload, ApplicationId, ExitStatus};
use serde_json::{Value, json};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ASSETS: &str = "https://assets.test";

const WAIT_STEP: Duration = Duration::from_millis(10);
const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct RecordingPresence {
    pub logins: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<ActivityPayload>>,
    pub logged_out: Mutex<bool>,
}

impl RecordingPresence {
    pub fn sent(&self) -> Vec<ActivityPayload> {
        self.sent.lock().unwrap().clone()
    }
}

impl PresenceClient for RecordingPresence {
    fn login<'a>(&'a self, app_id: &'a ApplicationId) -> ProviderFut<'a, Result<(), PresenceError>> {
        Box::pin(async move {
            self.logins.lock().unwrap().push(app_id.as_str().to_string());
            Ok(())
        })
    }

    fn set_activity<'a>(
        &'a self,
        payload: &'a ActivityPayload,
    ) -> ProviderFut<'a, Result<(), PresenceError>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        })
    }

    fn logout(&self) -> ProviderFut<'_, Result<(), PresenceError>> {
        Box::pin(async move {
            *self.logged_out.lock().unwrap() = true;
            Ok(())
        })
    }
}

pub struct NoGit;

impl GitResolver for NoGit {
    fn resolve<'a>(&'a self, _root: &'a Path) -> ProviderFut<'a, Result<GitInfo, GitError>> {
        Box::pin(async { Err(GitError::NotInstalled("git")) })
    }
}

pub struct AllLive;

impl ImageProbe for AllLive {
    fn is_live<'a>(&'a self, _url: &'a str) -> ProviderFut<'a, bool> {
        Box::pin(async { true })
    }
}

/// Serve a small language table the way the real source publishes it.
pub async fn language_maps_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/languages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ExtMap": {".go": "go", ".rs": "rust", ".py": "python"},
            "RegexMap": {"^Dockerfile$": "docker"},
        })))
        .mount(&server)
        .await;
    server
}

pub async fn fetch_classifier(server: &MockServer) -> Classifier {
    let http = presence_providers::http_client().unwrap();
    let maps: LanguageMapsDocument =
        load_language_maps(&format!("{}/languages.json", server.uri()), &http)
            .await
            .unwrap();
    Classifier::new(maps)
}

pub fn test_config() -> PresenceConfig {
    let mut config = PresenceConfig::default();
    config.update_interval = Duration::ZERO;
    config.assets_url = ASSETS.to_string();
    config
}

pub struct Session {
    writer: WriteHalf<DuplexStream>,
    reader: FrameReader<ReadHalf<DuplexStream>>,
    pub server: JoinHandle<anyhow::Result<ExitStatus>>,
    pub presence: Arc<RecordingPresence>,
    next_id: u64,
}

impl Session {
    pub async fn start() -> Self {
        let maps = language_maps_server().await;
        let classifier = fetch_classifier(&maps).await;
        Self::with_classifier(test_config(), classifier)
    }

    pub fn with_classifier(config: PresenceConfig, classifier: Classifier) -> Self {
        let presence = Arc::new(RecordingPresence::default());
        let engine = Engine::new(EngineParts {
            config,
            classifier,
            presence: Presence::new(presence.clone(), Duration::from_millis(10)),
            git: Arc::new(NoGit),
            probe: Arc::new(AllLive),
        });

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let server = tokio::spawn(presence_lsp_server::serve(engine, server_read, server_write));
        let (client_read, client_write) = tokio::io::split(client_io);

        Self {
            writer: client_write,
            reader: FrameReader::new(client_read),
            server,
            presence,
            next_id: 0,
        }
    }

    pub async fn send(&mut self, message: &Value) {
        FrameWriter::new(&mut self.writer)
            .write_frame(message)
            .await
            .unwrap();
    }

    /// Write bytes as-is, bypassing the framing codec.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        self.send(&json!({"jsonrpc": "2.0", "method": method, "params": params}))
            .await;
    }

    /// Send a request and wait for the reply with the same id.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        self.send(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        loop {
            let reply = self.recv().await;
            if reply["id"] == id {
                return reply;
            }
        }
    }

    pub async fn recv(&mut self) -> Value {
        let frame = tokio::time::timeout(WAIT_LIMIT, self.reader.read_frame())
            .await
            .expect("timed out waiting for server message")
            .unwrap()
            .expect("server closed the stream");
        match frame {
            Frame::Message(value) => value,
            Frame::Malformed(e) => panic!("server sent malformed JSON: {e}"),
        }
    }

    pub async fn initialize(&mut self, editor: &str) -> Value {
        let reply = self
            .request(
                "initialize",
                json!({
                    "processId": null,
                    "clientInfo": {"name": editor},
                    "rootUri": "file:///home/me/proj",
                    "capabilities": {},
                }),
            )
            .await;
        self.notify("initialized", json!({})).await;
        reply
    }

    /// Wait until the presence fake has received `count` payloads.
    pub async fn wait_for_updates(&self, count: usize) -> Vec<ActivityPayload> {
        let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
        loop {
            let sent = self.presence.sent();
            if sent.len() >= count {
                return sent;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {count} updates, got {sent:?}"
            );
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Close the client side and wait for the server loop to finish.
    pub async fn finish(self) -> ExitStatus {
        let Self { writer, reader, server, .. } = self;
        drop(writer);
        drop(reader);
        tokio::time::timeout(WAIT_LIMIT, server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap()
    }
}
