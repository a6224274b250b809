//! Boot sequence: queues, shared resources, tasks and the scheduler

use std::sync::Arc;

use log::info;

use crate::config::{
    ConfigReader, ConfigStore, BUTTON_TASK_STACK_SIZE, DEBOUNCE_DEPTH,
    DEFAULT_BRIGHTNESS_CURVE, DISPLAY_TASK_STACK_SIZE, GATEWAY_QUEUE_DEPTH,
    GATEWAY_TASK_STACK_SIZE, QUEUE_DEPTH, SENSOR_TASK_STACK_SIZE,
};
use crate::diagnostics::{Diagnostics, Fault};
use crate::drivers::button_handler::{DebounceFilter, RawButtons};
use crate::drivers::display::Display;
use crate::drivers::network::NetworkClient;
use crate::drivers::sensor::Sensor;
use crate::drivers::serial_console::SerialConsole;
use crate::rtos::{
    BoundedQueue, Consumer, Producer, Scheduler, SharedResource, TaskBuilder, TaskPriority,
    TaskState,
};
use crate::tasks::{ButtonTask, DisplayLinks, DisplayTask, GatewayTask, SensorTask};

/// Hardware the firmware runs against
pub struct Peripherals<B, S, D, N> {
    pub buttons: B,
    pub sensor: S,
    pub display: D,
    pub network: N,
}

pub struct Application {
    scheduler: Scheduler,
    diagnostics: Arc<Diagnostics>,
    console: Arc<SharedResource<SerialConsole>>,
    config: Arc<dyn ConfigReader>,
}

impl Application {
    /// Create every queue and task. Nothing runs until `start`.
    ///
    /// Failures are reported to `diagnostics` before they are returned.
    pub fn boot<B, S, D, N, C>(
        peripherals: Peripherals<B, S, D, N>,
        store: C,
        console: Arc<SharedResource<SerialConsole>>,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Self, Fault>
    where
        B: RawButtons + 'static,
        S: Sensor + 'static,
        D: Display + 'static,
        N: NetworkClient + 'static,
        C: ConfigStore + 'static,
    {
        Self::wire(peripherals, store, console, Arc::clone(&diagnostics)).map_err(|fault| {
            diagnostics.report(&fault);
            fault
        })
    }

    fn wire<B, S, D, N, C>(
        peripherals: Peripherals<B, S, D, N>,
        store: C,
        console: Arc<SharedResource<SerialConsole>>,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Self, Fault>
    where
        B: RawButtons + 'static,
        S: Sensor + 'static,
        D: Display + 'static,
        N: NetworkClient + 'static,
        C: ConfigStore + 'static,
    {
        let config: Arc<dyn ConfigReader> = Arc::new(SharedResource::new(store));

        let (reading_tx, reading_rx) = channel("sensor", QUEUE_DEPTH)?;
        let (button_tx, button_rx) = channel("button", QUEUE_DEPTH)?;
        let (request_tx, request_rx) = channel("gateway request", GATEWAY_QUEUE_DEPTH)?;
        let (response_tx, response_rx) = channel("gateway response", GATEWAY_QUEUE_DEPTH)?;

        let filter = DebounceFilter::new(DEBOUNCE_DEPTH)?;

        let mut scheduler = Scheduler::new();
        TaskBuilder::new()
            .runnable(SensorTask::new(
                peripherals.sensor,
                reading_tx,
                Arc::clone(&config),
                Arc::clone(&diagnostics),
            ))
            .priority(TaskPriority::Normal)
            .stack_size(SENSOR_TASK_STACK_SIZE)
            .build(&mut scheduler)?;
        TaskBuilder::new()
            .runnable(ButtonTask::new(
                peripherals.buttons,
                filter,
                button_tx,
                Arc::clone(&config),
                Arc::clone(&diagnostics),
            ))
            .priority(TaskPriority::High)
            .stack_size(BUTTON_TASK_STACK_SIZE)
            .build(&mut scheduler)?;
        TaskBuilder::new()
            .runnable(DisplayTask::new(
                peripherals.display,
                &DEFAULT_BRIGHTNESS_CURVE,
                DisplayLinks {
                    readings: reading_rx,
                    buttons: button_rx,
                    requests: request_tx,
                    responses: response_rx,
                },
                Arc::clone(&config),
                Arc::clone(&diagnostics),
            ))
            .priority(TaskPriority::Normal)
            .stack_size(DISPLAY_TASK_STACK_SIZE)
            .build(&mut scheduler)?;
        TaskBuilder::new()
            .runnable(GatewayTask::new(
                peripherals.network,
                request_rx,
                response_tx,
                Arc::clone(&config),
            ))
            .priority(TaskPriority::Low)
            .stack_size(GATEWAY_TASK_STACK_SIZE)
            .build(&mut scheduler)?;

        info!("boot: {} tasks ready", scheduler.len());
        Ok(Self {
            scheduler,
            diagnostics,
            console,
            config,
        })
    }

    /// Launch every task
    pub fn start(&mut self) -> Result<(), Fault> {
        self.scheduler.start_all().map_err(|err| {
            let fault = Fault::from(err);
            self.diagnostics.report(&fault);
            fault
        })
    }

    /// Stop every task. Stopped tasks never run again.
    pub fn stop(&mut self) {
        self.scheduler.stop_all();
    }

    pub fn task_states(&self) -> Vec<(&'static str, TaskState)> {
        self.scheduler.states().collect()
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    pub fn console(&self) -> &Arc<SharedResource<SerialConsole>> {
        &self.console
    }

    pub fn config(&self) -> &Arc<dyn ConfigReader> {
        &self.config
    }
}

/// A created queue split into its single producer and single consumer
fn channel<T>(name: &'static str, depth: usize) -> Result<(Producer<T>, Consumer<T>), Fault> {
    let queue = Arc::new(
        BoundedQueue::with_capacity(depth).map_err(|source| Fault::Queue { name, source })?,
    );
    let producer = queue.producer().ok_or(Fault::Endpoint(name))?;
    let consumer = queue.consumer().ok_or(Fault::Endpoint(name))?;
    Ok((producer, consumer))
}
