//! Layered navigation with strategy fallback.
//!
//! The primary readiness strategy is tried across every configured
//! timeout, escalating. If all of those time out, each remaining
//! strategy gets exactly one attempt at the largest timeout. Only
//! timeouts advance the ladder; any other engine failure aborts it.

use tracing::{debug, warn};

use crate::browser::{NavigationAttempt, PageHandle, ReadinessStrategy};
use crate::config::NavigationSettings;
use crate::error::{NavigateError, NavigationError};

/// Drive the navigation fallback ladder for one page.
pub async fn navigate(
    page: &dyn PageHandle,
    url: &str,
    settings: &NavigationSettings,
) -> Result<(), NavigationError> {
    let timeouts = settings.timeouts();
    let (primary, fallbacks) = settings
        .strategy_priority
        .split_first()
        .map(|(p, rest)| (*p, rest))
        .unwrap_or((ReadinessStrategy::Load, &[]));
    // Config validation guarantees a non-empty list; last() is safe.
    let largest = timeouts.last().copied().unwrap_or_default();

    let mut attempts = 0usize;
    let mut last_timeout: Option<NavigateError> = None;

    for &timeout in &timeouts {
        attempts += 1;
        let attempt = NavigationAttempt {
            strategy: primary,
            timeout,
            attempt: attempts,
        };
        match try_once(page, url, settings, attempt).await? {
            Ok(()) => return Ok(()),
            Err(timed_out) => last_timeout = Some(timed_out),
        }
    }

    for &strategy in fallbacks {
        attempts += 1;
        let attempt = NavigationAttempt {
            strategy,
            timeout: largest,
            attempt: attempts,
        };
        match try_once(page, url, settings, attempt).await? {
            Ok(()) => return Ok(()),
            Err(timed_out) => last_timeout = Some(timed_out),
        }
    }

    Err(NavigationError::Exhausted {
        url: url.to_string(),
        attempts,
        // At least one attempt ran, so a timeout was recorded.
        source: last_timeout.unwrap_or(NavigateError::Timeout {
            strategy: primary,
            timeout: largest,
        }),
    })
}

/// One rung: settle, navigate, classify the outcome.
///
/// Outer `Err` is a fatal engine failure; inner `Err` is a timeout that
/// should advance the ladder.
async fn try_once(
    page: &dyn PageHandle,
    url: &str,
    settings: &NavigationSettings,
    attempt: NavigationAttempt,
) -> Result<Result<(), NavigateError>, NavigationError> {
    tokio::time::sleep(settings.settle_delay()).await;

    debug!(
        url,
        strategy = %attempt.strategy,
        timeout_ms = attempt.timeout.as_millis() as u64,
        attempt = attempt.attempt,
        "navigating"
    );

    match page.navigate(url, attempt.strategy, attempt.timeout).await {
        Ok(()) => {
            debug!(url, strategy = %attempt.strategy, attempt = attempt.attempt, "navigation succeeded");
            Ok(Ok(()))
        }
        Err(err @ NavigateError::Timeout { .. }) => {
            warn!(
                url,
                strategy = %attempt.strategy,
                timeout_ms = attempt.timeout.as_millis() as u64,
                attempt = attempt.attempt,
                "navigation attempt timed out"
            );
            Ok(Err(err))
        }
        Err(err) => Err(NavigationError::Engine(err)),
    }
}
