use std::sync::Arc;

use log::debug;

use crate::config::{ConfigReader, ConfigSnapshot};
use crate::diagnostics::{Channel, Diagnostics};
use crate::drivers::button_handler::{ButtonEvent, DebounceFilter, RawButtons};
use crate::os::Tick;
use crate::rtos::{Producer, Runnable, Step, TaskContext};

/// Samples the buttons and publishes debounced events
pub struct ButtonTask<R> {
    buttons: R,
    filter: DebounceFilter,
    events: Producer<ButtonEvent>,
    config: Arc<dyn ConfigReader>,
    diagnostics: Arc<Diagnostics>,
}

impl<R: RawButtons> ButtonTask<R> {
    pub fn new(
        buttons: R,
        filter: DebounceFilter,
        events: Producer<ButtonEvent>,
        config: Arc<dyn ConfigReader>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            buttons,
            filter,
            events,
            config,
            diagnostics,
        }
    }

    /// One poll. A full queue skips the sample and leaves the filter as is.
    pub fn poll(&mut self, now: Tick) {
        if self.events.free() == 0 {
            self.diagnostics.record_dropped(Channel::Button);
            return;
        }

        let event = self.filter.update(self.buttons.read(), now);
        if event.pushed | event.released != 0 {
            debug!("push={:#04x} release={:#04x}", event.pushed, event.released);
        }
        if self.events.send(event).is_err() {
            self.diagnostics.record_dropped(Channel::Button);
        }
    }
}

impl<R: RawButtons + 'static> Runnable for ButtonTask<R> {
    fn name(&self) -> &'static str {
        "button"
    }

    fn setup(&mut self, ctx: &mut TaskContext) {
        let config = ConfigSnapshot::load(self.config.as_ref());
        ctx.set_fps(config.button_task_fps);
    }

    fn step(&mut self, ctx: &mut TaskContext) -> Step {
        self.poll(ctx.now());
        Step::Continue
    }
}
