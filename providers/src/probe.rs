//! Liveness check for icon URLs.

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::StatusCode;

use crate::ProviderFut;

pub trait ImageProbe: Send + Sync {
    /// Whether `url` currently serves something. Never fails; errors count as dead.
    fn is_live<'a>(&'a self, url: &'a str) -> ProviderFut<'a, bool>;
}

/// HEAD probe with a GET fallback for servers that refuse HEAD.
///
/// HTTP verdicts are cached for the life of the process: icon assets are
/// static and the same few URLs are checked on every update. Transport
/// failures count as dead for that one check and are retried next time.
pub struct HttpImageProbe {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, bool>>,
}

impl HttpImageProbe {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, url: &str) -> Option<bool> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(url)
            .copied()
    }

    fn remember(&self, url: &str, live: bool) {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(url.to_string(), live);
    }

    /// `None` when the request itself failed; only HTTP verdicts are cached.
    async fn check(&self, url: &str) -> Option<bool> {
        let status = send_for_status(self.client.head(url), url).await?;
        if !matches!(
            status,
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            return Some(status.is_success());
        }
        let status = send_for_status(self.client.get(url), url).await?;
        Some(status.is_success())
    }
}

async fn send_for_status(request: reqwest::RequestBuilder, url: &str) -> Option<StatusCode> {
    match request.send().await {
        Ok(response) => Some(response.status()),
        Err(e) => {
            tracing::debug!(url, "Icon probe failed: {e}");
            None
        }
    }
}

impl ImageProbe for HttpImageProbe {
    fn is_live<'a>(&'a self, url: &'a str) -> ProviderFut<'a, bool> {
        Box::pin(async move {
            if let Some(live) = self.cached(url) {
                return live;
            }
            let Some(live) = self.check(url).await else {
                return false;
            };
            if !live {
                tracing::info!(url, "Icon unavailable, using fallback");
            }
            self.remember(url, live);
            live
        })
    }
}
