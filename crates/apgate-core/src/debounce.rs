//! Input debouncing
//!
//! Typed input reaches the cascade only after it has been quiet for the
//! configured period; intermediate values are dropped.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Releases the last value received before a quiet period
pub struct Debouncer<T> {
    rx: mpsc::Receiver<T>,
    quiet: Duration,
}

impl<T> Debouncer<T> {
    /// Create a debouncer and the sender feeding it
    pub fn channel(quiet: Duration, capacity: usize) -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx, quiet })
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Next settled value; `None` once every sender is gone and the
    /// channel is drained
    pub async fn next(&mut self) -> Option<T> {
        let mut latest = self.rx.recv().await?;
        loop {
            match timeout(self.quiet, self.rx.recv()).await {
                Ok(Some(value)) => latest = value,
                Ok(None) | Err(_) => return Some(latest),
            }
        }
    }
}
