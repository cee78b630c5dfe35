//! External collaborators of the activity engine.
//!
//! # Architecture
//!
//! Each collaborator is a trait object seam so the engine can be driven by
//! in-memory fakes in tests:
//!
//! | Seam | Production implementation | Failure policy |
//! |------|---------------------------|----------------|
//! | [`PresenceClient`] | [`discord::DiscordIpcClient`] | login retried, updates logged and dropped |
//! | [`GitResolver`] | [`git::GitCli`] | logged, fields left empty |
//! | [`ImageProbe`] | [`probe::HttpImageProbe`] | fallback icon |
//!
//! [`languages::load_language_maps`] is a one-shot fetch used at startup; its
//! failure is fatal to the caller.

pub mod discord;
pub mod git;
pub mod languages;
pub mod presence;
pub mod probe;

pub use git::{GitCli, GitError, GitInfo, GitResolver};
pub use languages::{LanguageMapError, LanguageMapsDocument, load_language_maps};
pub use presence::{Presence, PresenceClient, PresenceError};
pub use probe::{HttpImageProbe, ImageProbe};

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by the collaborator traits.
pub type ProviderFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// HTTP client shared by the language-map fetch and the icon probe.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("presence-lsp/", env!("CARGO_PKG_VERSION")))
        .build()
}
