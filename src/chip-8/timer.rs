use std::time::{Duration, Instant};

/// Period between timer decrements, a little under 1/60 s.
pub const TIMER_PERIOD: Duration = Duration::from_millis(16);

/// A timer that ticks down. This is used for the 60hz sound and delay timers by [`CPU`].
///
/// [`CPU`]: crate::CPU
#[derive(Debug, Default)]
pub struct Timer {
    value: u8,
}

impl Timer {
    pub fn current_value(&self) -> u8 {
        self.value
    }

    pub fn set_value(&mut self, new_value: u8) {
        self.value = new_value;
    }

    pub fn tick(&mut self) {
        self.value = self.value.saturating_sub(1);
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

/// Decides when a periodic event is due, given instants supplied by the caller.
///
/// The first call to [`TickSchedule::due`] at or after `start + period`
/// returns true and restarts the period from that instant.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    period: Duration,
    last: Instant,
}

impl TickSchedule {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            last: start,
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.period {
            self.last = now;

            true
        } else {
            false
        }
    }

    pub fn restart(&mut self, now: Instant) {
        self.last = now;
    }
}
