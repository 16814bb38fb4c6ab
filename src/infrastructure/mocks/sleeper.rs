//! Mock sleeper for testing.

use crate::application::ports::{SleepFuture, Sleeper};
use crate::infrastructure::mocks::clock::MockClock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleeper that advances a [`MockClock`] instead of waiting.
///
/// Every requested duration is recorded, so tests can assert on the exact
/// sleep sequence a wait loop produced.
///
/// ```
/// use mint_throttle::infrastructure::mocks::{MockClock, MockSleeper};
/// use mint_throttle::application::ports::{Clock, Sleeper};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let clock = MockClock::new(Utc::now());
/// let before = clock.now();
/// let sleeper = MockSleeper::new(clock.clone());
///
/// sleeper.sleep(Duration::from_secs(3)).await;
///
/// assert_eq!(clock.now() - before, chrono::Duration::seconds(3));
/// assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(3)]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockSleeper {
    clock: MockClock,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockSleeper {
    /// Create a sleeper driving `clock`.
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get every duration slept so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .expect("MockSleeper mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get the sum of all durations slept so far.
    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(async move {
            self.sleeps
                .lock()
                .expect(
                    "MockSleeper mutex poisoned - a test thread panicked while holding the lock",
                )
                .push(duration);
            self.clock.advance(duration);
        })
    }
}
