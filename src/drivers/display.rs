//! Dashboard output

use std::sync::Arc;

use ufmt::uwriteln;

use super::button_handler::ButtonEvent;
use super::network::LinkStatus;
use super::sensor::MeasureData;
use super::serial_console::SerialConsole;
use crate::control::brightness::BrightnessState;
use crate::os::Tick;
use crate::rtos::SharedResource;

/// Anything with a dimmable backlight
pub trait Backlight {
    fn set_brightness(&mut self, level: u8);
}

/// Result of the last telemetry upload
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryStatus {
    pub enabled: bool,
    pub in_flight: bool,
    pub last_ok: bool,
}

/// Everything the display task shows in one frame
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Dashboard {
    pub uptime: Tick,
    pub frame: u32,
    pub max_fps: f32,
    pub measure: MeasureData,
    pub buttons: ButtonEvent,
    pub link: LinkStatus,
    pub link_updated: Tick,
    pub telemetry: TelemetryStatus,
    pub brightness: BrightnessState,
    pub dropped_sensor: u32,
    pub dropped_button: u32,
}

pub trait Display: Backlight + Send {
    fn render(&mut self, dashboard: &Dashboard);
}

/// Text dashboard on the shared serial console, one block per frame
pub struct ConsoleDisplay {
    console: Arc<SharedResource<SerialConsole>>,
    brightness: u8,
    every: u32,
}

impl ConsoleDisplay {
    /// Print only every `every`-th frame so the console stays readable.
    pub fn new(console: Arc<SharedResource<SerialConsole>>, every: u32) -> Self {
        Self {
            console,
            brightness: 0,
            every: every.max(1),
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }
}

impl Backlight for ConsoleDisplay {
    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }
}

impl Display for ConsoleDisplay {
    fn render(&mut self, d: &Dashboard) {
        if d.frame % self.every != 0 {
            return;
        }
        let backlight = self.brightness;
        self.console.with_lock(|c| {
            let m = &d.measure;
            let b = &d.buttons;
            let ip = d.link.address;

            uwriteln!(c, "#Terminal").ok();
            uwriteln!(c, "uptime    = {} ms", d.uptime).ok();
            uwriteln!(c, "frame     = {}", d.frame).ok();
            uwriteln!(c, "maxFps    = {}", d.max_fps as u32).ok();
            uwriteln!(c, "backlight = {} ({:?})", backlight, d.brightness).ok();

            uwriteln!(c, "#Sensor").ok();
            uwriteln!(c, "lux       = {}", m.illuminance as i32).ok();
            uwriteln!(c, "temp      = {}", m.temperature as i32).ok();
            uwriteln!(c, "pressure  = {}", m.pressure as i32).ok();
            uwriteln!(c, "humidity  = {}", m.humidity as i32).ok();
            uwriteln!(c, "gas       = {}", m.gas as i32).ok();
            uwriteln!(c, "dropped   = {}", d.dropped_sensor).ok();

            uwriteln!(c, "#Button").ok();
            uwriteln!(c, "{:?}", *b).ok();
            uwriteln!(c, "dropped   = {}", d.dropped_button).ok();

            uwriteln!(c, "#Wifi").ok();
            uwriteln!(c, "status    = {:?}", d.link.state).ok();
            uwriteln!(c, "ipAddr    = {}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]).ok();
            uwriteln!(c, "updated   = {}", d.link_updated).ok();

            uwriteln!(c, "#Telemetry").ok();
            uwriteln!(c, "use       = {}", d.telemetry.enabled).ok();
            uwriteln!(c, "sending   = {}", d.telemetry.in_flight).ok();
            uwriteln!(c, "result    = {}", d.telemetry.last_ok).ok();
            c.write_line("");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::network::LinkState;
    use crate::drivers::serial_console::tests::Capture;

    #[test]
    fn renders_every_nth_frame() {
        let capture = Capture::default();
        let console = Arc::new(SharedResource::new(SerialConsole::new(capture.clone())));
        let mut display = ConsoleDisplay::new(console, 2);

        let mut dashboard = Dashboard {
            frame: 1,
            ..Dashboard::default()
        };
        display.render(&dashboard);
        assert!(capture.text().is_empty());

        dashboard.frame = 2;
        dashboard.measure.illuminance = 87.6;
        dashboard.link.state = LinkState::Connected;
        dashboard.link.address = [192, 168, 0, 7];
        display.set_brightness(60);
        display.render(&dashboard);

        let text = capture.text();
        assert!(text.contains("lux       = 87"));
        assert!(text.contains("ipAddr    = 192.168.0.7"));
        assert!(text.contains("status    = Connected"));
        assert!(text.contains("backlight = 60"));
    }
}
