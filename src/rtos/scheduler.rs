//! Thread-per-task scheduler
//!
//! Every registered task owns one OS thread. Tasks suspend only inside their
//! rate-governor sleep, a blocking queue receive, or a shared-resource lock.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use log::{info, warn};
use thiserror::Error;

use super::task::{self, Exit, Runnable, TaskContext, TaskPriority, TaskState};

pub const MAX_TASKS: usize = 16;

const DEFAULT_STACK_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task table is full ({MAX_TASKS} tasks)")]
    TooManyTasks,
    #[error("task builder has no body")]
    MissingBody,
    #[error("failed to spawn task {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Owner-side handle of one task and its thread
pub struct TaskHandle {
    name: &'static str,
    priority: TaskPriority,
    stack_size: usize,
    fps: Option<u32>,
    state: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
    body: Option<Box<dyn Runnable>>,
    thread: Option<thread::Thread>,
}

impl TaskHandle {
    pub fn new<R: Runnable>(runnable: R) -> Self {
        Self {
            name: runnable.name(),
            priority: TaskPriority::Normal,
            stack_size: DEFAULT_STACK_SIZE,
            fps: None,
            state: Arc::new(AtomicU8::new(TaskState::NotStarted.as_u8())),
            cancel: Arc::new(AtomicBool::new(false)),
            body: Some(Box::new(runnable)),
            thread: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Spawn the task thread. No-op while running.
    ///
    /// `priority` is recorded only; hosted threads share one priority.
    pub fn start(&mut self, stack_size: usize, priority: TaskPriority) -> Result<(), TaskError> {
        match self.state() {
            TaskState::Running => return Ok(()),
            TaskState::Stopped => {
                warn!("{}: restart after stop is not supported", self.name);
                return Ok(());
            }
            TaskState::NotStarted => {}
        }
        let Some(mut body) = self.body.take() else {
            return Ok(());
        };

        self.stack_size = stack_size;
        self.priority = priority;

        let name = self.name;
        let fps = self.fps;
        let state = Arc::clone(&self.state);
        let cancel = Arc::clone(&self.cancel);

        self.state.store(TaskState::Running.as_u8(), Ordering::Release);
        let spawned = thread::Builder::new()
            .name(name.into())
            .stack_size(stack_size)
            .spawn(move || {
                let mut ctx = TaskContext::new(name, fps);
                info!("{}: started", name);
                if task::run_task(body.as_mut(), &mut ctx, &cancel) == Exit::Finished {
                    state.store(TaskState::Stopped.as_u8(), Ordering::Release);
                    info!("{}: finished", name);
                }
            });

        match spawned {
            Ok(join) => {
                self.thread = Some(join.thread().clone());
                Ok(())
            }
            Err(source) => {
                self.state.store(TaskState::Stopped.as_u8(), Ordering::Release);
                Err(TaskError::Spawn { name, source })
            }
        }
    }

    /// Stop the task at once. No-op unless running.
    ///
    /// Nothing is drained and peers are not told. The thread is detached and
    /// leaves at its next suspension point; one parked in an unbounded
    /// receive stays there.
    pub fn stop(&mut self) {
        if self.state() != TaskState::Running {
            return;
        }
        self.cancel.store(true, Ordering::Release);
        self.state.store(TaskState::Stopped.as_u8(), Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.unpark();
        }
        info!("{}: stopped", self.name);
    }
}

/// Owns one execution context per registered task
pub struct Scheduler {
    tasks: Vec<TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Vec::with_capacity(MAX_TASKS),
        }
    }

    /// Register a task. The returned id is its slot in this scheduler.
    pub fn add_task(&mut self, handle: TaskHandle) -> Result<usize, TaskError> {
        if self.tasks.len() >= MAX_TASKS {
            return Err(TaskError::TooManyTasks);
        }
        self.tasks.push(handle);
        Ok(self.tasks.len() - 1)
    }

    /// Start every registered task with the hints it was built with
    pub fn start_all(&mut self) -> Result<(), TaskError> {
        for task in self.tasks.iter_mut() {
            let (stack_size, priority) = (task.stack_size(), task.priority());
            task.start(stack_size, priority)?;
        }
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for task in self.tasks.iter_mut() {
            task.stop();
        }
    }

    pub fn task(&self, id: usize) -> Option<&TaskHandle> {
        self.tasks.get(id)
    }

    pub fn task_mut(&mut self, id: usize) -> Option<&mut TaskHandle> {
        self.tasks.get_mut(id)
    }

    pub fn state(&self, id: usize) -> Option<TaskState> {
        self.task(id).map(TaskHandle::state)
    }

    pub fn states(&self) -> impl Iterator<Item = (&'static str, TaskState)> + '_ {
        self.tasks.iter().map(|task| (task.name(), task.state()))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TaskBuilder {
    body: Option<TaskHandle>,
    priority: TaskPriority,
    stack_size: usize,
    fps: Option<u32>,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            body: None,
            priority: TaskPriority::Normal,
            stack_size: DEFAULT_STACK_SIZE,
            fps: None,
        }
    }

    pub fn runnable<R: Runnable>(mut self, runnable: R) -> Self {
        self.body = Some(TaskHandle::new(runnable));
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Initial loop rate. 0 runs unpaced; `setup` may still change it.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn into_handle(self) -> Result<TaskHandle, TaskError> {
        let mut handle = self.body.ok_or(TaskError::MissingBody)?;
        handle.priority = self.priority;
        handle.stack_size = self.stack_size;
        handle.fps = self.fps;
        Ok(handle)
    }

    pub fn build(self, scheduler: &mut Scheduler) -> Result<usize, TaskError> {
        scheduler.add_task(self.into_handle()?)
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
