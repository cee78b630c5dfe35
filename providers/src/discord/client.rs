//! Discord RPC client over the local IPC socket.

use std::path::PathBuf;
use std::time::Duration;

use presence_types::{ActivityPayload, ApplicationId};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use super::activity::{activity_json, set_activity_command};
use super::codec::{IpcChannel, Opcode};
use crate::{PresenceClient, PresenceError, ProviderFut};

const REPLY_TIMEOUT_SECS: u64 = 5;

/// Number of `discord-ipc-N` sockets the desktop client may listen on.
const SOCKET_SLOTS: u32 = 10;

/// Sub-directories used by sandboxed (flatpak/snap) Discord installs.
#[cfg(unix)]
const SANDBOX_SUBDIRS: &[&str] = &["app/com.discordapp.Discord", "snap.discord"];

trait IpcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IpcStream for T {}

type Channel = IpcChannel<Box<dyn IpcStream>>;

#[derive(Default)]
struct ClientState {
    app_id: Option<ApplicationId>,
    channel: Option<Channel>,
}

/// Talks to the Discord desktop client.
///
/// The connection is guarded by an async mutex: a command and its reply are
/// one exchange and must not interleave with another caller's.
pub struct DiscordIpcClient {
    state: Mutex<ClientState>,
    socket_dirs: Vec<PathBuf>,
    reply_timeout: Duration,
}

impl Default for DiscordIpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscordIpcClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_socket_dirs(default_socket_dirs())
    }

    /// Look for sockets only under `dirs` (ignored on Windows, which uses named pipes).
    #[must_use]
    pub fn with_socket_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            state: Mutex::new(ClientState::default()),
            socket_dirs: dirs,
            reply_timeout: Duration::from_secs(REPLY_TIMEOUT_SECS),
        }
    }

    async fn connect(&self, app_id: &ApplicationId) -> Result<Channel, PresenceError> {
        let stream = self.open_stream().await?;
        let mut channel = IpcChannel::new(stream);
        let handshake = json!({ "v": 1, "client_id": app_id.as_str() });
        channel.send(Opcode::Handshake, &handshake).await?;

        let ready = tokio::time::timeout(self.reply_timeout, await_reply(&mut channel, None))
            .await
            .map_err(|_| PresenceError::Timeout(self.reply_timeout))??;
        tracing::debug!(
            user = ready["data"]["user"]["username"].as_str().unwrap_or("unknown"),
            "Discord IPC handshake complete"
        );
        Ok(channel)
    }

    #[cfg(unix)]
    async fn open_stream(&self) -> Result<Box<dyn IpcStream>, PresenceError> {
        for path in socket_candidates(&self.socket_dirs) {
            match tokio::net::UnixStream::connect(&path).await {
                Ok(stream) => {
                    tracing::debug!(path = %path.display(), "Connected to Discord IPC socket");
                    return Ok(Box::new(stream));
                }
                Err(e) => tracing::trace!(path = %path.display(), "IPC socket unavailable: {e}"),
            }
        }
        Err(PresenceError::NotRunning)
    }

    #[cfg(windows)]
    async fn open_stream(&self) -> Result<Box<dyn IpcStream>, PresenceError> {
        use tokio::net::windows::named_pipe::ClientOptions;

        for slot in 0..SOCKET_SLOTS {
            let pipe = format!(r"\\?\pipe\discord-ipc-{slot}");
            match ClientOptions::new().open(&pipe) {
                Ok(client) => {
                    tracing::debug!(pipe = %pipe, "Connected to Discord IPC pipe");
                    return Ok(Box::new(client));
                }
                Err(e) => tracing::trace!(pipe = %pipe, "IPC pipe unavailable: {e}"),
            }
        }
        Err(PresenceError::NotRunning)
    }

    #[cfg(not(any(unix, windows)))]
    async fn open_stream(&self) -> Result<Box<dyn IpcStream>, PresenceError> {
        Err(PresenceError::NotRunning)
    }

    async fn exchange(&self, channel: &mut Channel, activity: Option<Value>) -> Result<(), PresenceError> {
        let nonce = uuid::Uuid::new_v4().to_string();
        let command = set_activity_command(activity, std::process::id(), &nonce);
        channel.send(Opcode::Frame, &command).await?;
        tokio::time::timeout(self.reply_timeout, await_reply(channel, Some(&nonce)))
            .await
            .map_err(|_| PresenceError::Timeout(self.reply_timeout))??;
        Ok(())
    }
}

impl PresenceClient for DiscordIpcClient {
    fn login<'a>(&'a self, app_id: &'a ApplicationId) -> ProviderFut<'a, Result<(), PresenceError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.channel = None;
            let channel = self.connect(app_id).await?;
            state.channel = Some(channel);
            state.app_id = Some(app_id.clone());
            Ok(())
        })
    }

    fn set_activity<'a>(
        &'a self,
        payload: &'a ActivityPayload,
    ) -> ProviderFut<'a, Result<(), PresenceError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut channel = match state.channel.take() {
                Some(channel) => channel,
                None => {
                    let app_id = state.app_id.clone().ok_or(PresenceError::NotLoggedIn)?;
                    tracing::debug!("Reconnecting to Discord IPC");
                    self.connect(&app_id).await?
                }
            };
            // A failed exchange leaves the channel dropped so the next update reconnects.
            self.exchange(&mut channel, Some(activity_json(payload)))
                .await?;
            state.channel = Some(channel);
            Ok(())
        })
    }

    fn logout(&self) -> ProviderFut<'_, Result<(), PresenceError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.app_id = None;
            let Some(mut channel) = state.channel.take() else {
                return Ok(());
            };
            if let Err(e) = self.exchange(&mut channel, None).await {
                tracing::debug!("Failed to clear activity before logout: {e}");
            }
            channel.send(Opcode::Close, &json!({})).await
        })
    }
}

/// Read frames until the reply we are waiting for arrives.
///
/// `nonce: None` waits for the handshake `READY` dispatch. Pings are answered
/// inline; unrelated dispatches are skipped.
async fn await_reply(channel: &mut Channel, nonce: Option<&str>) -> Result<Value, PresenceError> {
    loop {
        let (opcode, body) = channel.recv().await?;
        match opcode {
            Opcode::Frame => {
                let evt = body["evt"].as_str();
                let matches = match nonce {
                    Some(expected) => body["nonce"].as_str() == Some(expected),
                    None => evt == Some("READY") || evt == Some("ERROR"),
                };
                if !matches {
                    tracing::trace!(evt = evt.unwrap_or(""), "Skipping unrelated IPC dispatch");
                    continue;
                }
                if evt == Some("ERROR") {
                    return Err(PresenceError::Rejected {
                        code: body["data"]["code"].as_i64().unwrap_or(0),
                        message: body["data"]["message"]
                            .as_str()
                            .unwrap_or("unknown error")
                            .to_string(),
                    });
                }
                return Ok(body);
            }
            Opcode::Ping => channel.send(Opcode::Pong, &body).await?,
            Opcode::Pong | Opcode::Handshake => {}
            Opcode::Close => {
                return Err(PresenceError::Closed {
                    code: body["code"].as_i64().unwrap_or(0),
                    message: body["message"].as_str().unwrap_or("").to_string(),
                });
            }
        }
    }
}

#[cfg(unix)]
fn default_socket_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .collect();
    dirs.push(PathBuf::from("/tmp"));
    dirs.dedup();
    dirs
}

#[cfg(not(unix))]
fn default_socket_dirs() -> Vec<PathBuf> {
    Vec::new()
}

#[cfg(unix)]
fn socket_candidates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in dirs {
        let roots = std::iter::once(dir.clone()).chain(SANDBOX_SUBDIRS.iter().map(|sub| dir.join(sub)));
        for root in roots {
            for slot in 0..SOCKET_SLOTS {
                candidates.push(root.join(format!("discord-ipc-{slot}")));
            }
        }
    }
    candidates
}
