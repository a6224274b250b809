//! Task descriptors, lifecycle states and the rate governor

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crate::os::{self, Tick};

/// Lifecycle of a task. A stopped task is never started again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Running,
    Stopped,
}

impl TaskState {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::NotStarted,
            1 => TaskState::Running,
            _ => TaskState::Stopped,
        }
    }
}

/// Scheduling hint recorded with each task
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Outcome of one `step`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// A unit of work driven by its own execution context.
pub trait Runnable: Send + 'static {
    fn name(&self) -> &'static str;

    /// Called once before the first `step`
    fn setup(&mut self, _ctx: &mut TaskContext) {}

    /// Called repeatedly until it returns `Step::Stop`
    fn step(&mut self, ctx: &mut TaskContext) -> Step;

    /// Called once after `step` asked to stop
    fn abort(&mut self) {}
}

/// Paces a loop to a target rate without catching up on overruns.
#[derive(Copy, Clone, Debug)]
pub struct RateGovernor {
    period: Tick,
    last_elapsed: Tick,
}

impl RateGovernor {
    /// One iteration per second until `set_fps` says otherwise
    pub fn new() -> Self {
        Self {
            period: os::sec_to_tick(1),
            last_elapsed: 0,
        }
    }

    /// Retarget the loop rate. 0 runs iterations back to back.
    pub fn set_fps(&mut self, fps: u32) {
        if fps == 0 {
            self.period = 0;
            return;
        }
        self.period = os::ms_to_tick(1000 / fps);
    }

    pub fn period(&self) -> Tick {
        self.period
    }

    /// Record one iteration and return how long to sleep before the next.
    pub fn record(&mut self, start: Tick, end: Tick) -> Tick {
        self.last_elapsed = os::diff(start, end);
        if self.last_elapsed < self.period {
            self.period - self.last_elapsed
        } else {
            0
        }
    }

    pub fn last_elapsed(&self) -> Tick {
        self.last_elapsed
    }

    /// Rate the loop body could reach with no pacing
    pub fn fps_without_delay(&self) -> f32 {
        if self.last_elapsed == 0 {
            return f32::INFINITY;
        }
        1.0 / os::tick_to_sec(self.last_elapsed)
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-task view of the runtime, passed to `setup` and `step`
pub struct TaskContext {
    name: &'static str,
    governor: RateGovernor,
}

impl TaskContext {
    pub fn new(name: &'static str, fps: Option<u32>) -> Self {
        let mut governor = RateGovernor::new();
        if let Some(fps) = fps {
            governor.set_fps(fps);
        }
        Self { name, governor }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.governor.set_fps(fps);
    }

    pub fn period(&self) -> Tick {
        self.governor.period()
    }

    pub fn last_iteration_ticks(&self) -> Tick {
        self.governor.last_elapsed()
    }

    pub fn fps_without_delay(&self) -> f32 {
        self.governor.fps_without_delay()
    }

    pub fn now(&self) -> Tick {
        os::tick_count()
    }
}

/// Why a task body returned
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Exit {
    /// `step` returned `Stop`
    Finished,
    /// the owner stopped the task
    Cancelled,
}

/// Drive `runnable` until it stops itself or `cancel` is raised.
pub(crate) fn run_task<R>(runnable: &mut R, ctx: &mut TaskContext, cancel: &AtomicBool) -> Exit
where
    R: Runnable + ?Sized,
{
    runnable.setup(ctx);
    loop {
        if cancel.load(Ordering::Acquire) {
            return Exit::Cancelled;
        }

        let start = os::tick_count();
        let step = runnable.step(ctx);
        let end = os::tick_count();
        let pause_ticks = ctx.governor.record(start, end);

        if step == Step::Stop {
            runnable.abort();
            return Exit::Finished;
        }
        pause(pause_ticks, cancel);
    }
}

// Sleep that a stop request can cut short via `Thread::unpark`
fn pause(ticks: Tick, cancel: &AtomicBool) {
    if ticks == 0 {
        return;
    }
    let deadline = Instant::now() + os::tick_to_duration(ticks);
    while !cancel.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}
