//! Task runtime: scheduling, message queues and shared-resource locks

pub mod queue;
pub mod scheduler;
pub mod shared;
pub mod task;

pub use queue::{BoundedQueue, Consumer, Producer, QueueError};
pub use scheduler::{Scheduler, TaskBuilder, TaskError, TaskHandle, MAX_TASKS};
pub use shared::SharedResource;
pub use task::{RateGovernor, Runnable, Step, TaskContext, TaskPriority, TaskState};
