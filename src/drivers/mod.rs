pub mod button_handler;
pub mod display;
pub mod network;
pub mod sensor;
pub mod serial_console;

pub use button_handler::{Button, ButtonEvent, ButtonPins, DebounceError, DebounceFilter, RawButtons};
pub use display::{Backlight, ConsoleDisplay, Dashboard, Display, TelemetryStatus};
pub use network::{LinkState, LinkStatus, NetworkClient, NetworkError};
pub use sensor::{MeasureData, Sensor};
pub use serial_console::SerialConsole;
