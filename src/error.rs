//! Error types for the fetch-and-distill pipeline.
//!
//! Each component has its own error enum so callers can tell retryable
//! conditions (internal error pages, failed proxy probes) apart from
//! structural ones (exhausted navigation ladder, malformed pool lines,
//! unsupported record kinds).

use std::time::Duration;

use thiserror::Error;

use crate::browser::ReadinessStrategy;
use crate::extract::RecordKind;

/// Errors from configuration construction and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors from proxy pool selection and validation.
///
/// Messages never contain raw credentials; endpoints are rendered
/// through their masked view before inclusion.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read proxy pool file: {0}")]
    Io(#[from] std::io::Error),

    #[error("proxy pool contains no candidate lines")]
    EmptyPool,

    #[error("malformed proxy pool line: expected ip:port:username:password, got {fields} fields")]
    MalformedLine { fields: usize },

    #[error("proxy {masked} failed validation against all probe endpoints")]
    ProbeFailed { masked: String },

    #[error("proxy validation failed after {attempts} attempts")]
    Validation {
        attempts: u32,
        #[source]
        last_error: Box<ProxyError>,
    },
}

/// Failure of a single probe request against one identity endpoint.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe endpoint returned status {0}")]
    Status(u16),

    #[error("probe transport error: {0}")]
    Transport(String),

    #[error("probe response had no parseable identity payload")]
    Payload,
}

/// Failure of a single navigation attempt on a page handle.
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("navigation timed out after {timeout:?} waiting for '{strategy}'")]
    Timeout {
        strategy: ReadinessStrategy,
        timeout: Duration,
    },

    #[error("browser engine error: {0}")]
    Engine(anyhow::Error),
}

/// Failure of the whole navigation fallback ladder.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Every strategy/timeout combination timed out. The last timeout
    /// is carried as the source, matching what the page handle raised.
    #[error("navigation to {url} exhausted all {attempts} attempts")]
    Exhausted {
        url: String,
        attempts: usize,
        #[source]
        source: NavigateError,
    },

    /// A non-timeout engine failure; aborts the ladder immediately.
    #[error(transparent)]
    Engine(NavigateError),
}

/// Errors from the fetch orchestrator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The rendered document contained the target's own internal error
    /// marker. Retryable; surfaced only after the attempt budget.
    #[error("target returned its internal error page (marker: {marker:?})")]
    UnexpectedContent { marker: String },

    /// Navigation timeouts are structural and are not retried here.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("proxy routing requested but no pool is configured")]
    NoProxyPool,

    #[error("browser session error: {0}")]
    Session(anyhow::Error),
}

/// Errors from record extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction of '{0}' records is not supported")]
    UnsupportedKind(RecordKind),

    #[error("could not parse web result fragment:\n```{fragment}```")]
    WebFragment { fragment: String },

    #[error("could not parse news result fragment:\n```{fragment}```")]
    NewsFragment { fragment: String },
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
