//! Position extrapolation for push-based backends.
//!
//! Bus backends only learn the playback position when an event or a
//! re-fetch arrives. Between those, the position is advanced locally from
//! the instant it was observed so the UI never waits on the bus.

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct PositionClock {
    base_ms: u64,
    observed_at: Instant,
    running: bool,
}

impl PositionClock {
    pub fn new(base_ms: u64, observed_at: Instant, running: bool) -> Self {
        Self {
            base_ms,
            observed_at,
            running,
        }
    }

    pub fn stopped() -> Self {
        Self::new(0, Instant::now(), false)
    }

    /// Freeze or resume the clock at `now`, keeping the position reached so far.
    pub fn set_running(&mut self, running: bool, now: Instant) {
        if self.running == running {
            return;
        }
        self.base_ms = self.position_at(now);
        self.observed_at = now;
        self.running = running;
    }

    /// Position at `now`. Never moves backwards from the base.
    pub fn position_at(&self, now: Instant) -> u64 {
        if !self.running {
            return self.base_ms;
        }
        let elapsed = now.saturating_duration_since(self.observed_at);
        self.base_ms
            .saturating_add(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Like `position_at`, capped at `duration_ms` when the duration is known.
    pub fn position_capped(&self, now: Instant, duration_ms: u64) -> u64 {
        let pos = self.position_at(now);
        if duration_ms > 0 { pos.min(duration_ms) } else { pos }
    }
}

impl Default for PositionClock {
    fn default() -> Self {
        Self::stopped()
    }
}
