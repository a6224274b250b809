use std::sync::Arc;

use log::trace;

use crate::config::{ConfigReader, ConfigSnapshot};
use crate::diagnostics::{Channel, Diagnostics};
use crate::drivers::sensor::{MeasureData, Sensor};
use crate::os::Tick;
use crate::rtos::{Producer, Runnable, Step, TaskContext};

/// Samples the ambient sensors
pub struct SensorTask<S> {
    sensor: S,
    readings: Producer<MeasureData>,
    config: Arc<dyn ConfigReader>,
    diagnostics: Arc<Diagnostics>,
}

impl<S: Sensor> SensorTask<S> {
    pub fn new(
        sensor: S,
        readings: Producer<MeasureData>,
        config: Arc<dyn ConfigReader>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            sensor,
            readings,
            config,
            diagnostics,
        }
    }

    pub fn poll(&mut self, now: Tick) {
        if self.readings.free() == 0 {
            self.diagnostics.record_dropped(Channel::Sensor);
            return;
        }

        let data = self.sensor.measure(now);
        trace!(
            "lux={} temp={} pressure={} humidity={} gas={}",
            data.illuminance,
            data.temperature,
            data.pressure,
            data.humidity,
            data.gas
        );
        if self.readings.send(data).is_err() {
            self.diagnostics.record_dropped(Channel::Sensor);
        }
    }
}

impl<S: Sensor + 'static> Runnable for SensorTask<S> {
    fn name(&self) -> &'static str {
        "sensor"
    }

    fn setup(&mut self, ctx: &mut TaskContext) {
        let config = ConfigSnapshot::load(self.config.as_ref());
        ctx.set_fps(config.sensor_task_fps);
    }

    fn step(&mut self, ctx: &mut TaskContext) -> Step {
        self.poll(ctx.now());
        Step::Continue
    }
}
