//! Browser session provisioning and navigation.
//!
//! The pipeline talks to pages through the [`PageHandle`] and
//! [`BrowserProvider`] traits; the chromiumoxide engine behind the
//! `browser` feature is one implementation. Tests drive the navigation
//! ladder with mock handles.

pub mod navigation;

#[cfg(feature = "browser")]
mod chromium;
#[cfg(feature = "browser")]
pub use chromium::ChromiumProvider;
#[cfg(not(feature = "browser"))]
mod chromium_stub;
#[cfg(not(feature = "browser"))]
pub use chromium_stub::ChromiumProvider;

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BrowserSettings;
use crate::error::NavigateError;
use crate::proxy::ProxyEndpoint;

/// How long to wait before considering a navigation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStrategy {
    /// Document complete plus a quiet period with no network activity.
    /// Strictest, preferred for JS-heavy pages.
    NetworkIdle,
    /// DOM parsed; subresources may still be loading.
    DomContentLoaded,
    /// Full load event fired.
    Load,
}

impl fmt::Display for ReadinessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkIdle => write!(f, "networkidle"),
            Self::DomContentLoaded => write!(f, "domcontentloaded"),
            Self::Load => write!(f, "load"),
        }
    }
}

/// One rung of the navigation ladder, for logging.
#[derive(Debug, Clone, Copy)]
pub struct NavigationAttempt {
    pub strategy: ReadinessStrategy,
    pub timeout: Duration,
    /// One-based position in the ladder.
    pub attempt: usize,
}

/// A live page in a provisioned browser session.
#[async_trait]
pub trait PageHandle: Send {
    /// Navigate to `url` and wait for the readiness condition, bounded
    /// by `timeout`. A timeout is reported as
    /// [`NavigateError::Timeout`] so the ladder can tell it apart from
    /// engine failures.
    async fn navigate(
        &self,
        url: &str,
        strategy: ReadinessStrategy,
        timeout: Duration,
    ) -> Result<(), NavigateError>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// Tear down the page and its session.
    async fn close(self: Box<Self>);
}

/// Provisions fresh browser sessions.
///
/// Each fetch attempt gets its own session so a poisoned one (bad
/// proxy, tripped bot detection) never leaks into the next attempt.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn new_page(&self, proxy: Option<&ProxyEndpoint>) -> Result<Box<dyn PageHandle>>;
}

/// User agents rotated when no fixed one is configured.
pub(crate) const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Per-session browser fingerprint sampled from [`BrowserSettings`].
#[derive(Debug, Clone)]
pub(crate) struct Fingerprint {
    pub width: u32,
    pub height: u32,
    pub locale: String,
    pub timezone: String,
    pub user_agent: String,
}

impl Fingerprint {
    pub fn sample(settings: &BrowserSettings) -> Self {
        let mut rng = rand::rng();
        let (w_lo, w_hi) = settings.viewport_width_range;
        let (h_lo, h_hi) = settings.viewport_height_range;
        Self {
            width: rng.random_range(w_lo..=w_hi),
            height: rng.random_range(h_lo..=h_hi),
            locale: settings.locales[rng.random_range(0..settings.locales.len())].clone(),
            timezone: settings.timezones[rng.random_range(0..settings.timezones.len())].clone(),
            user_agent: settings
                .user_agent
                .clone()
                .unwrap_or_else(|| USER_AGENTS[rng.random_range(0..USER_AGENTS.len())].to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_strategy_display_matches_wire_names() {
        assert_eq!(ReadinessStrategy::NetworkIdle.to_string(), "networkidle");
        assert_eq!(ReadinessStrategy::DomContentLoaded.to_string(), "domcontentloaded");
        assert_eq!(ReadinessStrategy::Load.to_string(), "load");
    }

    #[test]
    fn fingerprint_stays_inside_configured_ranges() {
        let settings = BrowserSettings::default();
        for _ in 0..50 {
            let fp = Fingerprint::sample(&settings);
            let (w_lo, w_hi) = settings.viewport_width_range;
            let (h_lo, h_hi) = settings.viewport_height_range;
            assert!(fp.width >= w_lo && fp.width <= w_hi);
            assert!(fp.height >= h_lo && fp.height <= h_hi);
            assert!(settings.locales.contains(&fp.locale));
            assert!(settings.timezones.contains(&fp.timezone));
        }
    }

    #[test]
    fn fixed_user_agent_overrides_rotation() {
        let settings = BrowserSettings {
            user_agent: Some("test-agent/1.0".into()),
            ..BrowserSettings::default()
        };
        for _ in 0..10 {
            assert_eq!(Fingerprint::sample(&settings).user_agent, "test-agent/1.0");
        }
    }
}
