//! Firmware for an ambient-sensing desk terminal
//!
//! Four tasks share the board: buttons and sensors are sampled into bounded
//! queues, the display task turns them into a dashboard and an automatically
//! dimmed backlight, and the gateway task talks to the network on its behalf.

pub mod application;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivers;
pub mod logger;
pub mod os;
pub mod protocol;
pub mod rtos;
pub mod tasks;

pub use application::{Application, Peripherals};
