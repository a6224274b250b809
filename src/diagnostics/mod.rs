//! Fault reporting and drop counters

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use log::error;
use thiserror::Error;

use crate::drivers::button_handler::DebounceError;
use crate::os::{self, Tick};
use crate::rtos::{QueueError, TaskError};

/// Fault class; the top nibble doubles as the halt exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MemoryError = 0x6000,
    SystemError = 0x8000,
}

/// Failures the firmware cannot run without fixing
#[derive(Error, Debug)]
pub enum Fault {
    #[error("queue `{name}` could not be created: {source}")]
    Queue {
        name: &'static str,
        #[source]
        source: QueueError,
    },
    #[error("queue `{0}` endpoints were already handed out")]
    Endpoint(&'static str),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Debounce(#[from] DebounceError),
}

impl Fault {
    pub fn code(&self) -> ErrorCode {
        match self {
            Fault::Queue { .. } => ErrorCode::MemoryError,
            Fault::Endpoint(_) => ErrorCode::SystemError,
            Fault::Task(TaskError::Spawn { .. }) => ErrorCode::MemoryError,
            Fault::Task(_) | Fault::Debounce(_) => ErrorCode::SystemError,
        }
    }

    fn subcode(&self) -> u16 {
        match self {
            Fault::Queue { .. } => 0x0101,
            Fault::Endpoint(_) => 0x0102,
            Fault::Task(_) => 0x0201,
            Fault::Debounce(_) => 0x0301,
        }
    }
}

/// What the last reported fault looked like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord {
    pub code: ErrorCode,
    pub subcode: u16,
    pub timestamp: Tick,
}

/// Reaction to a fault. Runs after the fault has been logged and counted.
pub trait FaultHandler: Send + Sync {
    fn on_fault(&self, record: FaultRecord, fault: &Fault);
}

/// Stops the firmware with the fault class as exit status
pub struct Halt;

impl FaultHandler for Halt {
    fn on_fault(&self, record: FaultRecord, _fault: &Fault) {
        error!("halting: fault {:#06x}/{:#06x}", record.code as u32, record.subcode);
        std::process::exit((record.code as i32) >> 12);
    }
}

/// Producer channels whose dropped samples are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sensor,
    Button,
}

pub struct Diagnostics {
    handler: Box<dyn FaultHandler>,
    last_fault: Mutex<Option<FaultRecord>>,
    fault_count: AtomicU32,
    dropped_sensor: AtomicU32,
    dropped_button: AtomicU32,
}

impl Diagnostics {
    /// Diagnostics that halt on the first fault
    pub fn new() -> Self {
        Self::with_handler(Halt)
    }

    pub fn with_handler(handler: impl FaultHandler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            last_fault: Mutex::new(None),
            fault_count: AtomicU32::new(0),
            dropped_sensor: AtomicU32::new(0),
            dropped_button: AtomicU32::new(0),
        }
    }

    pub fn report(&self, fault: &Fault) {
        let record = FaultRecord {
            code: fault.code(),
            subcode: fault.subcode(),
            timestamp: os::tick_count(),
        };
        error!("fault {:?}: {}", record.code, fault);

        self.fault_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_fault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(record);

        self.handler.on_fault(record, fault);
    }

    pub fn fault_count(&self) -> u32 {
        self.fault_count.load(Ordering::Relaxed)
    }

    pub fn last_fault(&self) -> Option<FaultRecord> {
        *self
            .last_fault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_dropped(&self, channel: Channel) {
        self.counter(channel).fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self, channel: Channel) -> u32 {
        self.counter(channel).load(Ordering::Relaxed)
    }

    fn counter(&self, channel: Channel) -> &AtomicU32 {
        match channel {
            Channel::Sensor => &self.dropped_sensor,
            Channel::Button => &self.dropped_button,
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// Handler that remembers fault codes instead of halting
    #[derive(Clone, Default)]
    pub(crate) struct Recorder(pub(crate) Arc<Mutex<Vec<ErrorCode>>>);

    impl FaultHandler for Recorder {
        fn on_fault(&self, record: FaultRecord, _fault: &Fault) {
            self.0.lock().unwrap().push(record.code);
        }
    }

    #[test]
    fn report_counts_and_invokes_handler() {
        let recorder = Recorder::default();
        let diagnostics = Diagnostics::with_handler(recorder.clone());

        diagnostics.report(&Fault::Queue {
            name: "sensor",
            source: QueueError::AllocationFailed(4),
        });
        diagnostics.report(&Fault::Task(TaskError::TooManyTasks));

        assert_eq!(diagnostics.fault_count(), 2);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![ErrorCode::MemoryError, ErrorCode::SystemError]
        );
        let last = diagnostics.last_fault().unwrap();
        assert_eq!(last.code, ErrorCode::SystemError);
        assert_eq!(last.subcode, 0x0201);
    }

    #[test]
    fn drop_counters_are_per_channel() {
        let diagnostics = Diagnostics::with_handler(Recorder::default());
        diagnostics.record_dropped(Channel::Sensor);
        diagnostics.record_dropped(Channel::Sensor);
        diagnostics.record_dropped(Channel::Button);
        assert_eq!(diagnostics.dropped(Channel::Sensor), 2);
        assert_eq!(diagnostics.dropped(Channel::Button), 1);
        assert_eq!(diagnostics.fault_count(), 0);
    }

    #[test]
    fn fault_message_names_the_queue() {
        let fault = Fault::Queue {
            name: "button",
            source: QueueError::ZeroCapacity,
        };
        assert_eq!(
            fault.to_string(),
            "queue `button` could not be created: queue depth must be non-zero"
        );
    }
}
