//! System time tracking for the task runtime

use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// Smallest scheduler time unit
pub type Tick = u32;

/// Ticks per second
pub const TICK_RATE_HZ: u32 = 1000;

/// Ticks per millisecond
const TICKS_PER_MS: u32 = TICK_RATE_HZ / 1000;

static BOOT: OnceLock<Instant> = OnceLock::new();

/// Ticks elapsed since the timer was first touched. Wraps at `u32::MAX`.
#[inline]
pub fn tick_count() -> Tick {
    let boot = BOOT.get_or_init(Instant::now);
    let ms = boot.elapsed().as_millis() as u64;
    (ms.wrapping_mul(TICKS_PER_MS as u64)) as Tick
}

/// Ticks from `start` to `end`, wrap-around safe.
///
/// A full lap of the counter between the two samples cannot be detected.
#[inline]
pub fn diff(start: Tick, end: Tick) -> Tick {
    end.wrapping_sub(start)
}

#[inline]
pub fn ms_to_tick(ms: u32) -> Tick {
    ms.saturating_mul(TICKS_PER_MS)
}

#[inline]
pub fn tick_to_ms(tick: Tick) -> u32 {
    tick / TICKS_PER_MS
}

#[inline]
pub fn sec_to_tick(sec: u32) -> Tick {
    sec.saturating_mul(TICK_RATE_HZ)
}

#[inline]
pub fn tick_to_sec(tick: Tick) -> f32 {
    tick as f32 / TICK_RATE_HZ as f32
}

#[inline]
pub fn tick_to_duration(tick: Tick) -> Duration {
    Duration::from_millis(tick_to_ms(tick) as u64)
}

/// Suspend the calling task for `ticks`
pub fn delay(ticks: Tick) {
    if ticks > 0 {
        thread::sleep(tick_to_duration(ticks));
    }
}
