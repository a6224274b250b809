//! `log` backend that writes to the shared serial console

use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::drivers::serial_console::SerialConsole;
use crate::rtos::SharedResource;

/// One `[LEVEL] target: message` line per record.
///
/// Lines are written under the console lock, so output from different tasks
/// never interleaves.
pub struct ConsoleLogger {
    console: Arc<SharedResource<SerialConsole>>,
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(console: Arc<SharedResource<SerialConsole>>, level: LevelFilter) -> Self {
        Self { console, level }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        self.console.with_lock(|console| console.write_line(&line));
    }

    fn flush(&self) {}
}

/// Install the console logger. Fails if a logger is already installed.
pub fn init(console: Arc<SharedResource<SerialConsole>>, level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger::new(console, level)))?;
    log::set_max_level(level);
    Ok(())
}
