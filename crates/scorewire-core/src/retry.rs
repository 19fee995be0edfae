//! Retry logic with exponential backoff and pre-request jitter.

use std::time::Duration;

/// Backoff strategy between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        /// The backoff unit.
        base: Duration,
        /// The multiplicative factor for each subsequent attempt.
        factor: f64,
        /// The maximum duration to wait between attempts.
        max: Duration,
    },
}

impl Default for Backoff {
    /// `min(30s, 2^attempt * 1s)`.
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Calculate the wait after the given failed attempt (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential { base, factor, max } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped_seconds = seconds.min(max.as_secs_f64());
                Duration::from_secs_f64(capped_seconds)
            }
        }
    }
}

/// Random delay inserted before every attempt, including the first, so
/// requests to the same source never arrive in bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    pub min: Duration,
    pub max: Duration,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1_000),
            max: Duration::from_millis(3_000),
        }
    }
}

impl JitterRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pre-request delay at all.
    pub const fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.max.is_zero()
    }

    /// Draw a delay uniformly from `min..=max` at millisecond resolution.
    pub fn sample(&self) -> Duration {
        let min_ms = millis(self.min);
        let max_ms = millis(self.max).max(min_ms);
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Configuration for the fetch retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts allowed, the first one included. A 429 consumes an
    /// attempt like any other failure.
    pub max_retries: u32,
    /// The backoff strategy to use between attempts.
    pub backoff: Backoff,
    /// Delay drawn before each attempt.
    pub jitter: JitterRange,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            jitter: JitterRange::default(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with the given attempt budget.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Fixed backoff with the given attempt budget.
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            backoff: Backoff::Fixed {
                delay: Duration::ZERO,
            },
            jitter: JitterRange::disabled(),
        }
    }

    pub fn with_jitter(mut self, jitter: JitterRange) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_retries.max(1)
    }

    /// Calculate the delay following the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
