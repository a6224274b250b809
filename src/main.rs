//! Runs the firmware against simulated peripherals on stdout.
//!
//! Usage: `desk_terminal_firmware [seconds]`

use std::f32::consts::PI;
use std::sync::Arc;
use std::{env, process, thread};

use log::{error, info, warn, LevelFilter};

use desk_terminal_firmware::config::{
    ConfigKey, ConfigStore, ConfigValue, MemoryConfigStore, SERIAL_BAUD,
};
use desk_terminal_firmware::diagnostics::Diagnostics;
use desk_terminal_firmware::drivers::{
    ConsoleDisplay, LinkState, LinkStatus, MeasureData, NetworkClient, NetworkError, RawButtons,
    SerialConsole,
};
use desk_terminal_firmware::os::{self, Tick};
use desk_terminal_firmware::rtos::SharedResource;
use desk_terminal_firmware::{logger, Application, Peripherals};

/// Light level swings over this period
const DAYLIGHT_PERIOD_MS: f32 = 40_000.0;

/// Print one dashboard per this many frames
const DASHBOARD_EVERY: u32 = 30;

struct IdleButtons;

impl RawButtons for IdleButtons {
    fn read(&mut self) -> u32 {
        0
    }
}

struct LoopbackNetwork {
    uploads: u32,
}

impl NetworkClient for LoopbackNetwork {
    fn link_status(&mut self) -> LinkStatus {
        LinkStatus {
            address: [192, 168, 0, 10],
            state: LinkState::Connected,
        }
    }

    fn upload(&mut self, data: &MeasureData) -> Result<(), NetworkError> {
        self.uploads += 1;
        info!("upload #{}: lux={:.1} temp={:.1}", self.uploads, data.illuminance, data.temperature);
        Ok(())
    }
}

fn drifting_light(now: Tick) -> MeasureData {
    let phase = os::tick_to_ms(now) as f32 / DAYLIGHT_PERIOD_MS * 2.0 * PI;
    MeasureData {
        illuminance: 110.0 + 100.0 * phase.sin(),
        temperature: 23.0 + phase.cos(),
        pressure: 1013.0,
        humidity: 45.0,
        gas: 120.0,
        timestamp: now,
    }
}

/// Defaults, with uploads every ten seconds so the loopback link has work
fn simulation_config() -> MemoryConfigStore {
    let mut store = MemoryConfigStore::new();
    let settings = [
        (ConfigKey::UseTelemetry, ConfigValue::Bool(true)),
        (ConfigKey::AmbientIntervalMs, ConfigValue::U32(10_000)),
    ];
    for (key, value) in settings {
        if let Err(err) = store.write(key, value) {
            warn!("config: {} not set: {}", key.name(), err);
        }
    }
    store
}

fn main() {
    let console = Arc::new(SharedResource::new(SerialConsole::stdout()));
    let level = if cfg!(feature = "debug") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = logger::init(Arc::clone(&console), level) {
        eprintln!("logger: {}", err);
    }

    let store = simulation_config();
    let run_for = env::args().nth(1).and_then(|secs| secs.parse::<u32>().ok());

    console.with_lock(|c| {
        c.write_line("Desk terminal firmware v0.1.0");
        c.debug("baud", SERIAL_BAUD);
    });

    let peripherals = Peripherals {
        buttons: IdleButtons,
        sensor: drifting_light,
        display: ConsoleDisplay::new(Arc::clone(&console), DASHBOARD_EVERY),
        network: LoopbackNetwork { uploads: 0 },
    };
    let diagnostics = Arc::new(Diagnostics::new());
    let mut app = match Application::boot(peripherals, store, Arc::clone(&console), diagnostics) {
        Ok(app) => app,
        Err(err) => {
            error!("boot failed: {}", err);
            process::exit(1);
        }
    };
    if let Err(err) = app.start() {
        error!("start failed: {}", err);
        process::exit(1);
    }

    match run_for {
        Some(secs) => {
            os::delay(os::sec_to_tick(secs));
            app.stop();
            for (name, state) in app.task_states() {
                info!("{}: {:?}", name, state);
            }
        }
        None => loop {
            thread::park();
        },
    }
}
