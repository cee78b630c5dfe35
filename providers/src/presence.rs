//! Presence-service seam and the policy wrapper around it.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use presence_types::{ActivityPayload, ApplicationId};
use thiserror::Error;

use crate::ProviderFut;

const LOGOUT_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("no presence service is listening")]
    NotRunning,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("presence IO error: {0}")]
    Io(#[from] io::Error),
    #[error("presence payload error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("presence protocol error: {0}")]
    Protocol(String),
    #[error("presence service rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("presence service closed the connection ({code}): {message}")]
    Closed { code: i64, message: String },
    #[error("presence service did not answer within {0:?}")]
    Timeout(Duration),
}

/// Raw presence-service operations.
///
/// Implementations report every failure; [`Presence`] decides which ones are
/// retried, logged, or ignored.
pub trait PresenceClient: Send + Sync {
    fn login<'a>(&'a self, app_id: &'a ApplicationId) -> ProviderFut<'a, Result<(), PresenceError>>;

    fn set_activity<'a>(
        &'a self,
        payload: &'a ActivityPayload,
    ) -> ProviderFut<'a, Result<(), PresenceError>>;

    fn logout(&self) -> ProviderFut<'_, Result<(), PresenceError>>;
}

/// Failure policy around a [`PresenceClient`]:
///
/// - `login` blocks, retrying on a fixed interval until it succeeds.
/// - `update` never fails from the caller's point of view.
/// - `logout` is best-effort and bounded in time.
#[derive(Clone)]
pub struct Presence {
    client: Arc<dyn PresenceClient>,
    retry_after: Duration,
}

impl Presence {
    pub fn new(client: Arc<dyn PresenceClient>, retry_after: Duration) -> Self {
        Self {
            client,
            retry_after,
        }
    }

    /// Log in, retrying forever. Returns the number of attempts it took.
    pub async fn login(&self, app_id: &ApplicationId) -> u32 {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.client.login(app_id).await {
                Ok(()) => {
                    tracing::info!(app_id = %app_id, attempt, "Connected to presence service");
                    return attempt;
                }
                Err(e) => {
                    tracing::warn!(
                        app_id = %app_id,
                        attempt,
                        retry_in_ms = self.retry_after.as_millis(),
                        "Failed to connect to presence service: {e}"
                    );
                    tokio::time::sleep(self.retry_after).await;
                }
            }
        }
    }

    /// Send one activity update. Failures are logged; the next update supersedes.
    pub async fn update(&self, payload: &ActivityPayload) {
        match self.client.set_activity(payload).await {
            Ok(()) => tracing::debug!(state = %payload.state, "Activity updated"),
            Err(e) => tracing::warn!(state = %payload.state, "Failed to update activity: {e}"),
        }
    }

    pub async fn logout(&self) {
        let bounded = tokio::time::timeout(
            Duration::from_secs(LOGOUT_TIMEOUT_SECS),
            self.client.logout(),
        )
        .await;
        match bounded {
            Ok(Ok(())) => tracing::info!("Logged out of presence service"),
            Ok(Err(e)) => tracing::debug!("Presence logout failed: {e}"),
            Err(_) => tracing::debug!("Presence logout timed out"),
        }
    }
}
