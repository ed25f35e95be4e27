//! Exponential backoff policy shared by every retry loop in the crate.
//!
//! Proxy validation and fetch retries each instantiate one policy with
//! their own floor/ceiling, so retry behavior is described in one place
//! instead of being scattered across call sites.

use std::time::Duration;

/// Bounded exponential backoff.
///
/// Delay for attempt `n` (zero-based) is
/// `base_delay * multiplier^n`, clamped to `[base_delay, max_delay]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempt budget, including the first attempt.
    pub max_attempts: u32,
    /// Delay floor and the base of the exponential curve.
    pub base_delay: Duration,
    /// Growth factor between consecutive attempts.
    pub multiplier: f64,
    /// Delay ceiling.
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay,
        }
    }

    /// Delay to sleep after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let clamped = raw
            .max(self.base_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(5, Duration::from_secs(2), 2.0, Duration::from_secs(16))
    }

    #[test]
    fn delays_grow_exponentially_from_the_floor() {
        let p = policy();
        assert_eq!(p.delay_for(0), Duration::from_secs(2));
        assert_eq!(p.delay_for(1), Duration::from_secs(4));
        assert_eq!(p.delay_for(2), Duration::from_secs(8));
        assert_eq!(p.delay_for(3), Duration::from_secs(16));
    }

    #[test]
    fn delays_are_clamped_to_the_ceiling() {
        let p = policy();
        assert_eq!(p.delay_for(4), Duration::from_secs(16));
        assert_eq!(p.delay_for(10), Duration::from_secs(16));
    }

    #[test]
    fn sub_unit_multiplier_never_drops_below_the_floor() {
        let p = BackoffPolicy::new(3, Duration::from_secs(2), 0.5, Duration::from_secs(16));
        assert_eq!(p.delay_for(3), Duration::from_secs(2));
    }
}
