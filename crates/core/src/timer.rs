//! One-second countdown primitive.
//!
//! A [`Countdown`] never reads the wall clock. Whoever owns it calls
//! [`Countdown::tick`] once per elapsed second and reacts to the returned
//! [`TimerEvent`]. This keeps session timing deterministic under test; the
//! services crate pairs it with a tokio-backed ticker for real time.

/// Emitted by [`Countdown::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed; carries the seconds still remaining (> 0).
    Tick(u32),
    /// Remaining time reached zero. Fired exactly once per run.
    Expired,
}

/// Countdown measured in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    running: bool,
    expired: bool,
}

impl Countdown {
    /// A countdown that has not been started.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// A countdown already running from `duration_secs`.
    #[must_use]
    pub fn started(duration_secs: u32) -> Self {
        let mut countdown = Self::idle();
        countdown.start(duration_secs);
        countdown
    }

    /// Begin counting down from `duration_secs`.
    ///
    /// A zero duration expires on the first tick.
    pub fn start(&mut self, duration_secs: u32) {
        self.duration = duration_secs;
        self.remaining = duration_secs;
        self.running = true;
        self.expired = false;
    }

    /// Cancel any running countdown and start fresh.
    pub fn reset(&mut self, duration_secs: u32) {
        self.stop();
        self.start(duration_secs);
    }

    /// Cancel the countdown. Safe to call repeatedly or when idle.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by one second.
    ///
    /// Returns `None` when the countdown is not running.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            return Some(TimerEvent::Expired);
        }
        Some(TimerEvent::Tick(self.remaining))
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once the countdown ran down to zero (not merely stopped).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_then_expires_exactly_once() {
        let mut countdown = Countdown::started(3);
        assert_eq!(countdown.tick(), Some(TimerEvent::Tick(2)));
        assert_eq!(countdown.tick(), Some(TimerEvent::Tick(1)));
        assert_eq!(countdown.tick(), Some(TimerEvent::Expired));
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.tick(), None);
        assert!(countdown.is_expired());
    }

    #[test]
    fn zero_duration_expires_on_first_tick() {
        let mut countdown = Countdown::started(0);
        assert_eq!(countdown.tick(), Some(TimerEvent::Expired));
        assert_eq!(countdown.tick(), None);
        assert!(countdown.is_expired());
    }

    #[test]
    fn stop_is_idempotent_and_silences_ticks() {
        let mut countdown = Countdown::idle();
        countdown.stop();
        countdown.stop();
        assert_eq!(countdown.tick(), None);

        countdown.start(10);
        countdown.stop();
        countdown.stop();
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.remaining(), 10);
        assert!(!countdown.is_expired());
    }

    #[test]
    fn reset_restarts_from_new_duration() {
        let mut countdown = Countdown::started(5);
        countdown.tick();
        countdown.tick();
        countdown.reset(20);
        assert_eq!(countdown.remaining(), 20);
        assert_eq!(countdown.tick(), Some(TimerEvent::Tick(19)));
    }

    #[test]
    fn reset_revives_an_expired_countdown() {
        let mut countdown = Countdown::started(1);
        assert_eq!(countdown.tick(), Some(TimerEvent::Expired));
        countdown.reset(2);
        assert!(countdown.is_running());
        assert_eq!(countdown.tick(), Some(TimerEvent::Tick(1)));
    }
}
