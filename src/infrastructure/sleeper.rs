//! Sleep adapter backed by tokio timers.

use crate::application::ports::{SleepFuture, Sleeper};
use std::time::Duration;

/// Suspends on `tokio::time::sleep`.
///
/// Requires a tokio runtime with the time driver enabled. Under
/// `tokio::time::pause` the sleep follows the paused clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl TokioSleeper {
    /// Create a new tokio sleeper.
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_follows_paused_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper::new().sleep(Duration::from_secs(30)).await;

        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
