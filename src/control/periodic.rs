use crate::os::{self, Tick};

/// Fires once every `duration`, measured from the previous firing.
///
/// Polls that arrive late are not made up for.
#[derive(Copy, Clone, Debug, Default)]
pub struct PeriodicTrigger {
    running: bool,
    duration: Tick,
    last: Tick,
}

impl PeriodicTrigger {
    pub const fn new() -> Self {
        Self {
            running: false,
            duration: 0,
            last: 0,
        }
    }

    /// Arm the trigger. The first firing is one full period after `now`.
    pub fn start(&mut self, duration_ms: u32, now: Tick) {
        self.running = true;
        self.duration = os::ms_to_tick(duration_ms);
        self.last = now;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn poll(&mut self, now: Tick) -> bool {
        if !self.running || os::diff(self.last, now) < self.duration {
            return false;
        }
        self.last = now;
        true
    }
}
