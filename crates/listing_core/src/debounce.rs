use std::time::{Duration, Instant};

pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(500);

/// Coalesces bursts of changes into one firing after a quiet period.
///
/// Time is passed in explicitly so the caller's tick drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    last_change: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_change: None,
        }
    }

    /// Records a change and restarts the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    /// Fires once when `delay` has passed since the last change.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_change {
            Some(changed) if now.saturating_duration_since(changed) >= self.delay => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }
}
