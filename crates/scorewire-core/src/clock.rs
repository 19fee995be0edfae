//! Time source used for backoff sleeps, cache ages and freshness.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use crate::UtcDateTime;

pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Wall clock plus a suspension primitive.
///
/// Production code uses [`SystemClock`]; tests inject [`ManualClock`] so
/// retry backoff and TTL expiry can be observed without real delays.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> UtcDateTime;

    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Deterministic clock whose time only moves on [`advance`](Self::advance)
/// or [`Clock::sleep`]. Every sleep is recorded and returns immediately.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<UtcDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now = now.saturating_add(duration);
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .expect("manual clock lock is not poisoned")
            .clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UtcDateTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("manual clock lock is not poisoned")
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.sleeps
            .lock()
            .expect("manual clock lock is not poisoned")
            .push(duration);
        self.advance(duration);
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_records_sleeps_and_moves_time() {
        let start = UtcDateTime::parse("2024-05-01T12:00:00Z").expect("valid");
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(2)).await;
        clock.sleep(Duration::from_secs(4)).await;
        clock.advance(Duration::from_secs(1));

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(clock.total_slept(), Duration::from_secs(6));
        assert_eq!(clock.now().elapsed_since(start), Duration::from_secs(7));
    }
}
