//! Control loops that run inside the display task

pub mod brightness;
pub mod periodic;

pub use brightness::{BrightnessController, BrightnessSetting, BrightnessState};
pub use periodic::PeriodicTrigger;
