//! The activity state machine.
//!
//! Document notifications and timer fires all funnel through one mutex around
//! [`MachineState`]: each caller mutates the state and renders its payload
//! inside the critical section, then sends it through the debounce gate with
//! the lock released.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use presence_config::PresenceConfig;
use presence_providers::{GitInfo, GitResolver, ImageProbe, Presence};
use presence_types::{
    ActivityKind, ActivityPayload, ApplicationId, Button, DocumentChange, EditorName, ExitStatus,
    ImagePair, Slot, SlotUsage,
};

use crate::classifier::Classifier;
use crate::gate::Debouncer;
use crate::template::Substitutions;
use crate::timer::OneShotTimer;

const NO_FILE_ACTION: &str = "No file open";
const CHANGE_FALLBACK_LANGUAGE: &str = "text";
const REPOSITORY_BUTTON_LABEL: &str = "View Repository";
const FALLBACK_ICON: &str = "text";

/// Collaborators and configuration the engine is built from.
pub struct EngineParts {
    pub config: PresenceConfig,
    pub classifier: Classifier,
    pub presence: Presence,
    pub git: Arc<dyn GitResolver>,
    pub probe: Arc<dyn ImageProbe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Active,
    ShutdownPending,
    Exited,
}

#[derive(Debug, Clone, Default)]
struct Session {
    editor: EditorName,
    workspace: String,
    git: GitInfo,
    /// Unix seconds; `None` while idle or before the first event.
    started_at: Option<i64>,
}

#[derive(Debug, Clone)]
struct DocumentState {
    file: String,
    language: String,
    line: Option<u32>,
    kind: ActivityKind,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            file: String::new(),
            language: String::new(),
            line: None,
            kind: ActivityKind::Viewing,
        }
    }
}

#[derive(Debug, Default)]
struct MachineState {
    phase: Phase,
    session: Session,
    document: DocumentState,
}

/// Point-in-time copy of the machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub editor: String,
    pub workspace: String,
    pub remote_url: String,
    pub branch: String,
    pub started_at: Option<i64>,
    pub file: String,
    pub language: String,
    pub line: Option<u32>,
    pub kind: ActivityKind,
}

struct Inner {
    config: PresenceConfig,
    classifier: Classifier,
    presence: Presence,
    git: Arc<dyn GitResolver>,
    probe: Arc<dyn ImageProbe>,
    gate: Debouncer,
    idle: OneShotTimer,
    view: OneShotTimer,
    state: Mutex<MachineState>,
}

/// Cheap handle to the shared state machine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    #[must_use]
    pub fn new(parts: EngineParts) -> Self {
        let gate = Debouncer::new(parts.config.update_interval);
        Self {
            inner: Arc::new(Inner {
                config: parts.config,
                classifier: parts.classifier,
                presence: parts.presence,
                git: parts.git,
                probe: parts.probe,
                gate,
                idle: OneShotTimer::new("idle"),
                view: OneShotTimer::new("view"),
                state: Mutex::new(MachineState::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MachineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            phase: state.phase,
            editor: state.session.editor.as_str().to_string(),
            workspace: state.session.workspace.clone(),
            remote_url: state.session.git.remote_url.clone(),
            branch: state.session.git.branch.clone(),
            started_at: state.session.started_at,
            file: state.document.file.clone(),
            language: state.document.language.clone(),
            line: state.document.line,
            kind: state.document.kind,
        }
    }

    /// Open the session: log in (retrying until it succeeds), then resolve
    /// workspace and git metadata.
    ///
    /// Blocks for as long as the presence service is unreachable.
    pub async fn initialize(&self, editor: EditorName, root: Option<PathBuf>) {
        if self.phase() != Phase::Uninitialized {
            tracing::warn!("Ignoring repeated initialize");
            return;
        }

        let app_id = ApplicationId::resolve(&editor, &self.inner.config.application_id);
        tracing::info!(editor = %editor, app_id = %app_id, "Initializing presence session");
        self.inner.presence.login(&app_id).await;

        let workspace = root.as_deref().map(workspace_name).unwrap_or_default();
        let git = match root.as_deref() {
            Some(root) if self.inner.config.git_info => self.resolve_git(root).await,
            _ => GitInfo::default(),
        };

        {
            let mut state = self.lock();
            if state.phase == Phase::Uninitialized {
                state.session = Session {
                    editor,
                    workspace,
                    git,
                    started_at: None,
                };
                state.document = DocumentState::default();
                state.phase = Phase::Active;
                return;
            }
        }
        // Shutdown or exit arrived while login was still retrying; its logout
        // ran before this login finished.
        tracing::info!("Session ended during initialize; logging out");
        self.inner.presence.logout().await;
    }

    async fn resolve_git(&self, root: &Path) -> GitInfo {
        match self.inner.git.resolve(root).await {
            Ok(info) => {
                tracing::info!(remote = %info.remote_url, branch = %info.branch, "Resolved git metadata");
                info
            }
            Err(e) => {
                tracing::warn!(root = %root.display(), "Git metadata unavailable: {e}");
                GitInfo::default()
            }
        }
    }

    pub async fn did_open(&self, file: &str, language_id: &str) {
        let payload = {
            let mut state = self.lock();
            if !accepts_events(&state, "didOpen") {
                return;
            }
            let language = self
                .inner
                .classifier
                .classify(file)
                .unwrap_or(language_id)
                .to_string();
            tracing::debug!(file, language = %language, "Document opened");

            state.document = DocumentState {
                file: file.to_string(),
                language,
                line: None,
                kind: ActivityKind::Viewing,
            };
            self.mark_active(&mut state);
            self.render(&state)
        };
        self.push(payload).await;
    }

    pub async fn did_change(&self, file: &str, change: DocumentChange) {
        let payload = {
            let mut state = self.lock();
            if !accepts_events(&state, "didChange") {
                return;
            }
            let language = self
                .inner
                .classifier
                .classify(file)
                .unwrap_or(CHANGE_FALLBACK_LANGUAGE)
                .to_string();
            match change {
                DocumentChange::RangedEdit { line } => {
                    tracing::trace!(file, line, "Document changed");
                }
                DocumentChange::WholeReplace => {
                    tracing::debug!(file, "Whole-document change without line information");
                }
                DocumentChange::Unknown => {
                    tracing::warn!(file, "Unrecognised change shape; reporting a generic edit");
                }
            }

            state.document = DocumentState {
                file: file.to_string(),
                language,
                line: change.line(),
                kind: ActivityKind::Editing,
            };
            self.mark_active(&mut state);
            self.arm_view_timer();
            self.render(&state)
        };
        self.push(payload).await;
    }

    pub async fn did_close(&self, file: &str) {
        let payload = {
            let mut state = self.lock();
            if !accepts_events(&state, "didClose") {
                return;
            }
            tracing::debug!(file, "Document closed");

            self.inner.view.stop();
            state.document = DocumentState {
                kind: ActivityKind::NoFile,
                ..DocumentState::default()
            };
            self.mark_active(&mut state);
            self.render(&state)
        };
        self.push(payload).await;
    }

    /// Leave idle (starting a fresh session timestamp) and re-arm the idle timer.
    fn mark_active(&self, state: &mut MachineState) {
        state
            .session
            .started_at
            .get_or_insert_with(|| chrono::Utc::now().timestamp());

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .idle
            .reset(self.inner.config.idle_timeout, async move {
                if let Some(engine) = Engine::from_weak(&weak) {
                    engine.on_idle().await;
                }
            });
    }

    fn arm_view_timer(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .view
            .reset(self.inner.config.view_timeout, async move {
                if let Some(engine) = Engine::from_weak(&weak) {
                    engine.on_view().await;
                }
            });
    }

    async fn on_idle(&self) {
        let payload = {
            let mut state = self.lock();
            if state.phase != Phase::Active {
                return;
            }
            tracing::info!(
                timeout_s = self.inner.config.idle_timeout.as_secs(),
                "No activity, going idle"
            );
            self.inner.view.stop();
            state.document.kind = ActivityKind::Idle;
            state.document.line = None;
            state.session.started_at = None;
            self.render(&state)
        };
        self.push(payload).await;
    }

    async fn on_view(&self) {
        let payload = {
            let mut state = self.lock();
            if state.phase != Phase::Active || state.document.kind != ActivityKind::Editing {
                return;
            }
            tracing::debug!(file = %state.document.file, "No edits, switching to viewing");
            state.document.kind = ActivityKind::Viewing;
            state.document.line = None;
            self.render(&state)
        };
        self.push(payload).await;
    }

    /// Mark shutdown as requested and log out. The process keeps running
    /// until `exit`.
    pub async fn shutdown(&self) {
        {
            let mut state = self.lock();
            if state.phase == Phase::Exited {
                return;
            }
            state.phase = Phase::ShutdownPending;
        }
        tracing::info!("Shutdown requested");
        self.inner.presence.logout().await;
    }

    /// Stop both timers and report how the session ended.
    pub fn exit(&self) -> ExitStatus {
        let status = {
            let mut state = self.lock();
            let status = if state.phase == Phase::ShutdownPending {
                ExitStatus::Clean
            } else {
                ExitStatus::Abnormal
            };
            state.phase = Phase::Exited;
            status
        };
        self.inner.idle.stop();
        self.inner.view.stop();
        tracing::info!(code = status.code(), "Exiting");
        status
    }

    fn render(&self, state: &MachineState) -> ActivityPayload {
        let config = &self.inner.config;
        let templates = &config.templates;
        let session = &state.session;
        let document = &state.document;
        let kind = document.kind;

        let mut subs = Substitutions::new(
            &document.file,
            &session.workspace,
            session.editor.as_str(),
            &document.language,
        );
        let action_template = match kind {
            ActivityKind::Idle => templates.idle_action.as_str(),
            ActivityKind::Viewing => templates.view_action.as_str(),
            ActivityKind::NoFile => NO_FILE_ACTION,
            ActivityKind::Editing => match document.line {
                Some(line) if config.editing_info => {
                    subs = subs.with_line(i64::from(line).saturating_add(config.line_offset));
                    templates.edit_line_action.as_str()
                }
                _ => templates.edit_action.as_str(),
            },
        };
        let subs = subs.with_action(action_template);

        let mut details = subs.render(&templates.details);
        if !session.git.branch.is_empty() {
            details = format!("{details} ({})", session.git.branch);
        }

        let mut payload = ActivityPayload {
            state: subs.render(&templates.state),
            details,
            start_timestamp: if config.show_timestamp && kind != ActivityKind::Idle {
                session.started_at
            } else {
                None
            },
            button: (!session.git.remote_url.is_empty()).then(|| Button {
                label: REPOSITORY_BUTTON_LABEL.to_string(),
                url: session.git.remote_url.clone(),
            }),
            ..ActivityPayload::default()
        };

        let show_language = !document.language.is_empty()
            && !matches!(kind, ActivityKind::Idle | ActivityKind::NoFile);
        for slot in [Slot::Large, Slot::Small] {
            let (image_template, text_template) = match slot {
                Slot::Large => (&templates.large_image, &templates.large_text),
                Slot::Small => (&templates.small_image, &templates.small_text),
            };
            let icon = match config.usage_for(slot) {
                SlotUsage::Language if show_language => Some(document.language.as_str()),
                SlotUsage::Editor if !session.editor.is_empty() => Some(session.editor.icon_name()),
                SlotUsage::Language | SlotUsage::Editor => None,
            };
            *payload.slot_mut(slot) = icon.map(|icon| {
                let image = if image_template.is_empty() {
                    self.icon_url(icon)
                } else {
                    subs.render(image_template)
                };
                ImagePair::new(image, subs.render(text_template))
            });
        }
        payload
    }

    fn icon_url(&self, name: &str) -> String {
        format!("{}/icons/{name}.png", self.inner.config.assets_url)
    }

    async fn push(&self, mut payload: ActivityPayload) {
        if !self.inner.gate.try_claim() {
            tracing::trace!(state = %payload.state, "Update dropped by debounce gate");
            return;
        }
        for slot in [Slot::Large, Slot::Small] {
            if let Some(pair) = payload.slot_mut(slot)
                && !self.inner.probe.is_live(&pair.image).await
            {
                pair.image = self.icon_url(FALLBACK_ICON);
            }
        }
        self.inner.presence.update(&payload).await;
    }
}

fn accepts_events(state: &MachineState, event: &str) -> bool {
    if state.phase == Phase::Active {
        return true;
    }
    tracing::debug!(event, phase = ?state.phase, "Ignoring document event outside an active session");
    false
}

fn workspace_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}
