//! Buffer-the-latest-value debouncing for slider-driven commands.

use crate::input::Instant;
use std::time::Duration;

/// Default quiet period before a buffered slider value is sent.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Holds the most recent value until input pauses for `delay` or is flushed.
///
/// Each pushed value is delivered at most once; a newer push replaces an
/// undelivered one and restarts the delay.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Buffer `value`, replacing any undelivered one.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the buffered value if the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.delay);
        if ready { self.pending.take().map(|(value, _)| value) } else { None }
    }

    /// Take the buffered value now if `predicate` holds for it.
    pub fn take_if(&mut self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        self.pending.take_if(|(value, _)| predicate(value)).map(|(value, _)| value)
    }

    /// Take the buffered value immediately (explicit commit, e.g. slider release).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the buffered value without delivering it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the buffered value becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}
