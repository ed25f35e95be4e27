//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once (from defaults or a TOML file),
//! validated, and then shared by reference. Components never mutate it
//! at runtime; anything that varies per fetch (proxy choice, browser
//! fingerprint) is sampled from it instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::browser::ReadinessStrategy;
use crate::error::ConfigError;

/// Top-level immutable configuration for the fetch-and-distill pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub navigation: NavigationSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub fetch: FetchSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            navigation: NavigationSettings::default(),
            proxy: ProxySettings::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file and validate it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.browser.validate()?;
        self.navigation.validate()?;
        self.proxy.validate()?;
        self.fetch.validate()?;
        Ok(())
    }
}

/// Browser fingerprint and launch settings.
///
/// Viewport, locale, and timezone are sampled per session so repeated
/// fetches do not present an identical fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Inclusive viewport width range to sample from.
    #[serde(default = "default_viewport_width_range")]
    pub viewport_width_range: (u32, u32),
    /// Inclusive viewport height range to sample from.
    #[serde(default = "default_viewport_height_range")]
    pub viewport_height_range: (u32, u32),
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    #[serde(default = "default_timezones")]
    pub timezones: Vec<String>,
    /// Fixed user agent. When unset, one is sampled per session.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Extra Chromium flags appended after the built-in stealth set.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            viewport_width_range: default_viewport_width_range(),
            viewport_height_range: default_viewport_height_range(),
            locales: default_locales(),
            timezones: default_timezones(),
            user_agent: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, (lo, hi)) in [
            ("browser.viewport_width_range", self.viewport_width_range),
            ("browser.viewport_height_range", self.viewport_height_range),
        ] {
            if lo == 0 || lo > hi {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("range ({lo}, {hi}) must be non-zero and ascending"),
                });
            }
        }
        if self.locales.is_empty() {
            return Err(ConfigError::Invalid {
                field: "browser.locales",
                reason: "at least one locale is required".into(),
            });
        }
        if self.timezones.is_empty() {
            return Err(ConfigError::Invalid {
                field: "browser.timezones",
                reason: "at least one timezone is required".into(),
            });
        }
        Ok(())
    }
}

fn default_headless() -> bool {
    true
}

fn default_viewport_width_range() -> (u32, u32) {
    (1000, 1920)
}

fn default_viewport_height_range() -> (u32, u32) {
    (800, 1080)
}

fn default_locales() -> Vec<String> {
    ["en-US", "en-GB", "de-DE", "fr-FR"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timezones() -> Vec<String> {
    [
        "America/New_York",
        "America/Chicago",
        "Europe/London",
        "Europe/Berlin",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Navigation fallback ladder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSettings {
    /// Readiness strategies in priority order. The first entry is tried
    /// across every timeout; the rest get one attempt each at the
    /// largest timeout.
    #[serde(default = "default_strategy_priority")]
    pub strategy_priority: Vec<ReadinessStrategy>,
    /// Ascending timeouts, in milliseconds, for the primary strategy.
    #[serde(default = "default_timeouts_ms")]
    pub timeouts_ms: Vec<u64>,
    /// Pause before each navigation attempt, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            strategy_priority: default_strategy_priority(),
            timeouts_ms: default_timeouts_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl NavigationSettings {
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts_ms.iter().map(|&ms| Duration::from_millis(ms)).collect()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy_priority.is_empty() {
            return Err(ConfigError::Invalid {
                field: "navigation.strategy_priority",
                reason: "at least one readiness strategy is required".into(),
            });
        }
        if self.timeouts_ms.is_empty() {
            return Err(ConfigError::Invalid {
                field: "navigation.timeouts_ms",
                reason: "at least one timeout is required".into(),
            });
        }
        if self.timeouts_ms.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid {
                field: "navigation.timeouts_ms",
                reason: format!("timeouts {:?} must be ascending", self.timeouts_ms),
            });
        }
        Ok(())
    }
}

fn default_strategy_priority() -> Vec<ReadinessStrategy> {
    vec![
        ReadinessStrategy::NetworkIdle,
        ReadinessStrategy::DomContentLoaded,
        ReadinessStrategy::Load,
    ]
}

fn default_timeouts_ms() -> Vec<u64> {
    vec![60_000, 90_000, 120_000]
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

/// Proxy pool and validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Pool file with one `ip:port:username:password` entry per line.
    #[serde(default = "default_pool_file")]
    pub pool_file: PathBuf,
    /// Identity endpoints probed through a candidate, in order.
    #[serde(default = "default_probe_endpoints")]
    pub probe_endpoints: Vec<String>,
    /// Total budget for a single probe request, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Connect phase budget for a single probe request, in milliseconds.
    #[serde(default = "default_probe_connect_timeout_ms")]
    pub probe_connect_timeout_ms: u64,
    /// Validated-selection attempt budget.
    #[serde(default = "default_proxy_attempts")]
    pub max_attempts: u32,
    /// Backoff floor between validation attempts, in milliseconds.
    #[serde(default = "default_proxy_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff ceiling between validation attempts, in milliseconds.
    #[serde(default = "default_proxy_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            pool_file: default_pool_file(),
            probe_endpoints: default_probe_endpoints(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_connect_timeout_ms: default_probe_connect_timeout_ms(),
            max_attempts: default_proxy_attempts(),
            base_delay_ms: default_proxy_base_delay_ms(),
            max_delay_ms: default_proxy_max_delay_ms(),
        }
    }
}

impl ProxySettings {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            2.0,
            Duration::from_millis(self.max_delay_ms),
        )
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_connect_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "proxy.max_attempts",
                reason: "attempt budget must be at least 1".into(),
            });
        }
        if self.probe_endpoints.is_empty() {
            return Err(ConfigError::Invalid {
                field: "proxy.probe_endpoints",
                reason: "at least one probe endpoint is required".into(),
            });
        }
        Ok(())
    }
}

fn default_pool_file() -> PathBuf {
    PathBuf::from("proxies.txt")
}

fn default_probe_endpoints() -> Vec<String> {
    [
        "http://httpbin.org/ip",
        "http://ipinfo.io/json",
        "https://api.ipify.org?format=json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_probe_connect_timeout_ms() -> u64 {
    5_000
}

fn default_proxy_attempts() -> u32 {
    5
}

fn default_proxy_base_delay_ms() -> u64 {
    2_000
}

fn default_proxy_max_delay_ms() -> u64 {
    16_000
}

/// Fetch retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Fetch attempt budget for retryable content failures.
    #[serde(default = "default_fetch_attempts")]
    pub max_attempts: u32,
    /// Backoff floor between fetch attempts, in milliseconds.
    #[serde(default = "default_fetch_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff ceiling between fetch attempts, in milliseconds.
    #[serde(default = "default_fetch_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Substrings that mark a rendered page as the target's own error
    /// page. A hit makes the attempt retryable.
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,
    /// Probe-validate proxies before use. Off by default since probes
    /// cost a round trip per selection.
    #[serde(default)]
    pub validate_proxy: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_fetch_attempts(),
            base_delay_ms: default_fetch_base_delay_ms(),
            max_delay_ms: default_fetch_max_delay_ms(),
            error_markers: default_error_markers(),
            validate_proxy: false,
        }
    }
}

impl FetchSettings {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            2.0,
            Duration::from_millis(self.max_delay_ms),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_attempts",
                reason: "attempt budget must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn default_fetch_attempts() -> u32 {
    5
}

fn default_fetch_base_delay_ms() -> u64 {
    2_000
}

fn default_fetch_max_delay_ms() -> u64 {
    10_000
}

fn default_error_markers() -> Vec<String> {
    vec!["Unexpected error".to_string()]
}
