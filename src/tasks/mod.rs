//! The four firmware tasks
//!
//! Sensor and button tasks produce, the display task consumes both and is
//! the only client of the gateway task.

pub mod button;
pub mod display;
pub mod gateway;
pub mod sensor;

pub use button::ButtonTask;
pub use display::{DisplayLinks, DisplayTask};
pub use gateway::GatewayTask;
pub use sensor::SensorTask;
