//! Real-time tick source for driving a session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

const TICK_BUFFER: usize = 8;

/// Owned one-tick-per-period resource backed by a tokio task.
///
/// The task is aborted by [`Ticker::stop`] and on drop, so no tick is ever
/// delivered after the owner goes away, whichever path it leaves by.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    rx: mpsc::Receiver<()>,
}

impl Ticker {
    /// Start ticking every `period`. The first tick arrives after one full period.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            // Missed ticks are delivered back to back.
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
            rx,
        }
    }

    /// One tick per second.
    #[must_use]
    pub fn every_second() -> Self {
        Self::start(Duration::from_secs(1))
    }

    /// Wait for the next tick. Returns `None` once stopped.
    pub async fn next(&mut self) -> Option<()> {
        if self.handle.is_none() {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop ticking. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.rx.close();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delivers_ticks_each_period() {
        let mut ticker = Ticker::every_second();
        let started = time::Instant::now();

        assert_eq!(ticker.next().await, Some(()));
        assert_eq!(ticker.next().await, Some(()));

        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_ends_the_stream() {
        let mut ticker = Ticker::every_second();
        ticker.stop();
        ticker.stop();

        assert!(!ticker.is_running());
        assert_eq!(ticker.next().await, None);
    }
}
