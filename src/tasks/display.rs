use std::sync::Arc;

use log::{debug, warn};

use crate::config::{ConfigReader, ConfigSnapshot, BRIGHTNESS_KEY_POINTS};
use crate::control::{BrightnessController, BrightnessSetting, PeriodicTrigger};
use crate::diagnostics::{Channel, Diagnostics};
use crate::drivers::button_handler::{Button, ButtonEvent};
use crate::drivers::display::{Dashboard, Display};
use crate::drivers::sensor::MeasureData;
use crate::os::Tick;
use crate::protocol::{GatewayRequest, GatewayResponse, RequestKind};
use crate::rtos::{Consumer, Producer, Runnable, Step, TaskContext};

/// Manual backlight step for the Up/Down buttons
const MANUAL_STEP: u8 = 25;

/// Queue endpoints owned by the display task
pub struct DisplayLinks {
    pub readings: Consumer<MeasureData>,
    pub buttons: Consumer<ButtonEvent>,
    pub requests: Producer<GatewayRequest>,
    pub responses: Consumer<GatewayResponse>,
}

/// Collects the latest inputs, drives the backlight and renders the dashboard.
///
/// At most one `SendData` request is outstanding at any time.
pub struct DisplayTask<D> {
    brightness: BrightnessController<D>,
    curve: Vec<BrightnessSetting>,
    links: DisplayLinks,
    config: Arc<dyn ConfigReader>,
    diagnostics: Arc<Diagnostics>,
    status_trigger: PeriodicTrigger,
    ambient_trigger: PeriodicTrigger,
    send_pending: bool,
    send_in_flight: bool,
    dashboard: Dashboard,
}

impl<D: Display> DisplayTask<D> {
    pub fn new(
        display: D,
        curve: &[BrightnessSetting],
        links: DisplayLinks,
        config: Arc<dyn ConfigReader>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            brightness: BrightnessController::new(display, BRIGHTNESS_KEY_POINTS),
            curve: curve.to_vec(),
            links,
            config,
            diagnostics,
            status_trigger: PeriodicTrigger::new(),
            ambient_trigger: PeriodicTrigger::new(),
            send_pending: false,
            send_in_flight: false,
            dashboard: Dashboard::default(),
        }
    }

    /// Apply a configuration snapshot and arm the request triggers
    pub fn configure(&mut self, config: &ConfigSnapshot, now: Tick) {
        let kept = self.brightness.configure(
            config.brightness_auto,
            config.brightness_hold_ms,
            config.brightness_transition_ms,
            &self.curve,
        );
        if kept < self.curve.len() {
            warn!("brightness curve cut to {} of {} points", kept, self.curve.len());
        }
        if !config.brightness_auto || kept == 0 {
            self.brightness.set_manual(config.brightness_manual);
        }

        self.status_trigger.start(config.status_interval_ms, now);
        if config.use_telemetry {
            self.ambient_trigger.start(config.ambient_interval_ms, now);
        } else {
            self.ambient_trigger.stop();
        }
        self.dashboard.telemetry.enabled = config.use_telemetry;
    }

    /// One display cycle at `now`
    pub fn update(&mut self, now: Tick, max_fps: f32) {
        if let Ok(data) = self.links.readings.try_receive() {
            self.dashboard.measure = data;
        }
        if let Ok(event) = self.links.buttons.try_receive() {
            self.dashboard.buttons = event;
            self.on_buttons(&event);
        }
        if let Ok(response) = self.links.responses.try_receive() {
            self.on_response(response);
        }

        self.brightness.update(self.dashboard.measure.illuminance, now);

        if self.status_trigger.poll(now) {
            self.request(GatewayRequest::GetStatus);
        }
        if self.ambient_trigger.poll(now) {
            self.send_pending = true;
        }
        if self.send_pending && !self.send_in_flight {
            let data = self.dashboard.measure;
            if self.request(GatewayRequest::SendData(data)) {
                self.send_pending = false;
                self.send_in_flight = true;
            }
        }

        let dashboard = &mut self.dashboard;
        dashboard.uptime = now;
        dashboard.frame = dashboard.frame.wrapping_add(1);
        dashboard.max_fps = max_fps;
        dashboard.telemetry.in_flight = self.send_in_flight;
        dashboard.brightness = self.brightness.state();
        dashboard.dropped_sensor = self.diagnostics.dropped(Channel::Sensor);
        dashboard.dropped_button = self.diagnostics.dropped(Channel::Button);
        self.brightness.backlight_mut().render(&self.dashboard);
    }

    pub fn send_in_flight(&self) -> bool {
        self.send_in_flight
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn brightness(&self) -> &BrightnessController<D> {
        &self.brightness
    }

    fn on_buttons(&mut self, event: &ButtonEvent) {
        let level = self.brightness.level();
        if event.is_pushed(Button::Up) {
            self.brightness.set_manual(level.saturating_add(MANUAL_STEP));
        } else if event.is_pushed(Button::Down) {
            self.brightness.set_manual(level.saturating_sub(MANUAL_STEP));
        } else if event.is_pushed(Button::Press) {
            self.brightness.set_enable(true);
        }
    }

    fn on_response(&mut self, response: GatewayResponse) {
        match response.kind {
            RequestKind::Nop => {}
            RequestKind::GetStatus => {
                if let Some(status) = response.status {
                    self.dashboard.link = status.link();
                    self.dashboard.link_updated = status.timestamp;
                }
            }
            RequestKind::SendData => {
                self.send_in_flight = false;
                self.dashboard.telemetry.last_ok = response.success;
                if !response.success {
                    warn!("telemetry upload failed");
                }
            }
        }
    }

    fn request(&mut self, request: GatewayRequest) -> bool {
        let kind = request.kind();
        let sent = self.links.requests.send_if_free(request);
        if !sent {
            debug!("gateway busy, {:?} deferred", kind);
        }
        sent
    }
}

impl<D: Display + 'static> Runnable for DisplayTask<D> {
    fn name(&self) -> &'static str {
        "display"
    }

    fn setup(&mut self, ctx: &mut TaskContext) {
        let config = ConfigSnapshot::load(self.config.as_ref());
        ctx.set_fps(config.ui_task_fps);
        self.configure(&config, ctx.now());
    }

    fn step(&mut self, ctx: &mut TaskContext) -> Step {
        self.update(ctx.now(), ctx.fps_without_delay());
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryConfigStore, DEFAULT_BRIGHTNESS_CURVE};
    use crate::diagnostics::tests::Recorder;
    use crate::drivers::display::Backlight;
    use crate::drivers::network::LinkState;
    use crate::protocol::StatusData;
    use crate::rtos::{BoundedQueue, SharedResource};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Screen {
        frames: Arc<Mutex<Vec<Dashboard>>>,
        level: Arc<Mutex<u8>>,
    }

    impl Backlight for Screen {
        fn set_brightness(&mut self, level: u8) {
            *self.level.lock().unwrap() = level;
        }
    }

    impl Display for Screen {
        fn render(&mut self, dashboard: &Dashboard) {
            self.frames.lock().unwrap().push(*dashboard);
        }
    }

    struct Rig {
        task: DisplayTask<Screen>,
        screen: Screen,
        readings: Producer<MeasureData>,
        buttons: Producer<ButtonEvent>,
        requests: Consumer<GatewayRequest>,
        responses: Producer<GatewayResponse>,
    }

    fn rig(config: ConfigSnapshot) -> Rig {
        let readings = Arc::new(BoundedQueue::with_capacity(4).unwrap());
        let buttons = Arc::new(BoundedQueue::with_capacity(4).unwrap());
        let requests = Arc::new(BoundedQueue::with_capacity(1).unwrap());
        let responses = Arc::new(BoundedQueue::with_capacity(1).unwrap());
        let screen = Screen::default();

        let mut task = DisplayTask::new(
            screen.clone(),
            &DEFAULT_BRIGHTNESS_CURVE,
            DisplayLinks {
                readings: readings.consumer().unwrap(),
                buttons: buttons.consumer().unwrap(),
                requests: requests.producer().unwrap(),
                responses: responses.consumer().unwrap(),
            },
            Arc::new(SharedResource::new(MemoryConfigStore::new())),
            Arc::new(Diagnostics::with_handler(Recorder::default())),
        );
        task.configure(&config, 0);

        Rig {
            task,
            screen,
            readings: readings.producer().unwrap(),
            buttons: buttons.producer().unwrap(),
            requests: requests.consumer().unwrap(),
            responses: responses.producer().unwrap(),
        }
    }

    fn telemetry_config() -> ConfigSnapshot {
        ConfigSnapshot {
            use_telemetry: true,
            ambient_interval_ms: 1000,
            status_interval_ms: 60_000,
            ..ConfigSnapshot::default()
        }
    }

    #[test]
    fn renders_latest_reading() {
        let mut rig = rig(ConfigSnapshot::default());
        rig.readings
            .send(MeasureData {
                illuminance: 42.0,
                ..MeasureData::default()
            })
            .unwrap();
        rig.task.update(5, 30.0);

        let frames = rig.screen.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].measure.illuminance, 42.0);
        assert_eq!(frames[0].frame, 1);
        assert_eq!(frames[0].uptime, 5);
    }

    #[test]
    fn status_response_updates_link() {
        let mut rig = rig(ConfigSnapshot {
            status_interval_ms: 100,
            ..ConfigSnapshot::default()
        });
        rig.task.update(100, 30.0);
        assert_eq!(rig.requests.try_receive().ok(), Some(GatewayRequest::GetStatus));

        let status = StatusData {
            address: [192, 168, 1, 20],
            state: LinkState::Connected,
            timestamp: 101,
        };
        rig.responses.send(GatewayResponse::status(status)).unwrap();
        rig.task.update(110, 30.0);
        assert!(rig.task.dashboard().link.is_connected());
        assert_eq!(rig.task.dashboard().link_updated, 101);
    }

    #[test]
    fn single_send_in_flight() {
        let mut rig = rig(telemetry_config());

        rig.task.update(1000, 30.0);
        assert!(rig.task.send_in_flight());
        assert!(matches!(
            rig.requests.try_receive(),
            Ok(GatewayRequest::SendData(_))
        ));

        rig.task.update(1500, 30.0);
        rig.task.update(1900, 30.0);
        assert!(rig.requests.try_receive().is_err());
        assert!(rig.task.send_in_flight());

        // an unrelated response leaves the flag alone
        rig.responses.send(GatewayResponse::nop()).unwrap();
        rig.task.update(1950, 30.0);
        assert!(rig.task.send_in_flight());

        rig.responses.send(GatewayResponse::sent(true)).unwrap();
        rig.task.update(1960, 30.0);
        assert!(!rig.task.send_in_flight());
        assert!(rig.task.dashboard().telemetry.last_ok);

        rig.task.update(2000, 30.0);
        assert!(rig.task.send_in_flight());
        assert!(matches!(
            rig.requests.try_receive(),
            Ok(GatewayRequest::SendData(_))
        ));
    }

    #[test]
    fn send_due_while_in_flight_waits_for_response() {
        let mut rig = rig(telemetry_config());
        rig.task.update(1000, 30.0);
        rig.requests.try_receive().unwrap();

        // interval elapses twice while the first upload is outstanding
        rig.task.update(2000, 30.0);
        rig.task.update(3000, 30.0);
        assert!(rig.requests.try_receive().is_err());

        rig.responses.send(GatewayResponse::sent(true)).unwrap();
        rig.task.update(3010, 30.0);
        assert!(rig.task.send_in_flight());
        assert!(matches!(
            rig.requests.try_receive(),
            Ok(GatewayRequest::SendData(_))
        ));
        rig.task.update(3020, 30.0);
        assert!(rig.requests.try_receive().is_err());
    }

    #[test]
    fn failed_upload_is_shown() {
        let mut rig = rig(telemetry_config());
        rig.task.update(1000, 30.0);
        rig.requests.try_receive().unwrap();
        rig.responses.send(GatewayResponse::sent(false)).unwrap();
        rig.task.update(1010, 30.0);

        let frames = rig.screen.frames.lock().unwrap();
        let last = frames.last().unwrap();
        assert!(last.telemetry.enabled);
        assert!(!last.telemetry.in_flight);
        assert!(!last.telemetry.last_ok);
    }

    #[test]
    fn telemetry_disabled_never_sends() {
        let mut rig = rig(ConfigSnapshot::default());
        for now in (0..200_000).step_by(10_000) {
            rig.task.update(now, 30.0);
        }
        while let Ok(request) = rig.requests.try_receive() {
            assert_eq!(request, GatewayRequest::GetStatus);
        }
        assert!(!rig.task.send_in_flight());
    }

    #[test]
    fn buttons_override_and_restore_brightness() {
        let mut rig = rig(ConfigSnapshot::default());
        assert_eq!(*rig.screen.level.lock().unwrap(), 20);

        let up = ButtonEvent {
            pushed: Button::Up.mask(),
            debounced: Button::Up.mask(),
            ..ButtonEvent::default()
        };
        rig.buttons.send(up).unwrap();
        rig.task.update(10, 30.0);
        assert_eq!(*rig.screen.level.lock().unwrap(), 45);
        assert_eq!(
            rig.task.dashboard().brightness,
            crate::control::BrightnessState::Disabled
        );

        let press = ButtonEvent {
            pushed: Button::Press.mask(),
            ..ButtonEvent::default()
        };
        rig.buttons.send(press).unwrap();
        rig.task.update(20, 30.0);
        assert_eq!(
            rig.task.dashboard().brightness,
            crate::control::BrightnessState::Enabled
        );
        assert_eq!(*rig.screen.level.lock().unwrap(), 20);

        // dark room keeps the curve's level for good, not the override
        for now in (100..60_000).step_by(100) {
            rig.task.update(now, 30.0);
        }
        assert_eq!(*rig.screen.level.lock().unwrap(), 20);
        assert_eq!(rig.task.brightness().level(), 20);
    }

    #[test]
    fn manual_level_when_auto_is_off() {
        let rig = rig(ConfigSnapshot {
            brightness_auto: false,
            brightness_manual: 180,
            ..ConfigSnapshot::default()
        });
        assert_eq!(*rig.screen.level.lock().unwrap(), 180);
        assert_eq!(rig.task.brightness().level(), 180);
    }
}
