//! Fetch orchestration: proxy selection, session provisioning,
//! navigation, and content-level retry.
//!
//! Only one failure mode is retried here: the target serving its own
//! internal error page (detected by marker substrings). Navigation
//! timeouts already burned through their own fallback ladder and are
//! surfaced as-is; proxy selection retries inside the pool.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::browser::{navigation, BrowserProvider, PageHandle};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::proxy::{ProxyEndpoint, ProxyPool};

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Serialized HTML of the rendered document.
    pub html: String,
    /// Attempts consumed, including the successful one.
    pub attempts: u32,
    /// Masked view of the proxy used, when one was.
    pub proxy: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Drives fetches through a session provider, with optional proxy
/// routing from a pool.
pub struct Fetcher<P> {
    provider: P,
    pool: Option<ProxyPool>,
    config: PipelineConfig,
}

impl<P: BrowserProvider> Fetcher<P> {
    /// Build a fetcher with a pool from the config's proxy settings.
    pub fn new(provider: P, config: PipelineConfig) -> Self {
        let pool = ProxyPool::new(&config.proxy);
        Self {
            provider,
            pool: Some(pool),
            config,
        }
    }

    /// Build a fetcher with an explicit pool, or none to disable proxy
    /// routing entirely.
    pub fn with_pool(provider: P, config: PipelineConfig, pool: Option<ProxyPool>) -> Self {
        Self {
            provider,
            pool,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch a page, retrying content-level failures under the fetch
    /// backoff policy. Every attempt gets a fresh session and, with
    /// `use_proxy`, a fresh pool selection.
    pub async fn fetch(&self, url: &str, use_proxy: bool) -> Result<FetchOutcome, FetchError> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let policy = self.config.fetch.backoff();
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                let delay = policy.delay_for(attempt - 1);
                info!(url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying fetch");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(url, use_proxy).await {
                Ok((html, proxy)) => {
                    info!(%host, attempts = attempt + 1, bytes = html.len(), "fetch succeeded");
                    return Ok(FetchOutcome {
                        html,
                        attempts: attempt + 1,
                        proxy,
                        fetched_at: Utc::now(),
                    });
                }
                Err(err @ FetchError::UnexpectedContent { .. }) => {
                    warn!(url, attempt = attempt + 1, error = %err, "retryable fetch failure");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let err = last_error.unwrap_or(FetchError::UnexpectedContent {
            marker: String::new(),
        });
        error!(url, attempts = policy.max_attempts, error = %err, "fetch failed");
        Err(err)
    }

    async fn attempt(
        &self,
        url: &str,
        use_proxy: bool,
    ) -> Result<(String, Option<String>), FetchError> {
        let proxy: Option<ProxyEndpoint> = if use_proxy {
            let pool = self.pool.as_ref().ok_or(FetchError::NoProxyPool)?;
            let endpoint = pool.select(self.config.fetch.validate_proxy).await?;
            info!(url, proxy = %endpoint.masked(), "routing fetch through proxy");
            Some(endpoint)
        } else {
            None
        };

        let page = self
            .provider
            .new_page(proxy.as_ref())
            .await
            .map_err(FetchError::Session)?;

        let result = self.read_page(page.as_ref(), url).await;
        page.close().await;
        let html = result?;

        for marker in &self.config.fetch.error_markers {
            if html.contains(marker.as_str()) {
                return Err(FetchError::UnexpectedContent {
                    marker: marker.clone(),
                });
            }
        }

        Ok((html, proxy.map(|p| p.masked().to_string())))
    }

    async fn read_page(&self, page: &dyn PageHandle, url: &str) -> Result<String, FetchError> {
        navigation::navigate(page, url, &self.config.navigation).await?;
        // Let late-rendering content settle before the read.
        tokio::time::sleep(self.config.navigation.settle_delay()).await;
        page.content().await.map_err(FetchError::Session)
    }
}
