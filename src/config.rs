//! Firmware configuration
//!
//! Compile-time constants plus the runtime key/value settings that tasks read
//! once during setup.

use std::collections::HashMap;

use log::warn;
use thiserror::Error;

use crate::control::BrightnessSetting;
use crate::rtos::SharedResource;

/// Depth of the sensor and button queues
pub const QUEUE_DEPTH: usize = 4;

/// Depth of the gateway request and response queues
pub const GATEWAY_QUEUE_DEPTH: usize = 1;

/// Polls a press must survive before it is accepted
pub const DEBOUNCE_DEPTH: usize = 2;

/// Breakpoints in the automatic brightness table
pub const BRIGHTNESS_KEY_POINTS: usize = 4;

/// Debug console baud rate
pub const SERIAL_BAUD: u32 = 115_200;

pub const SENSOR_TASK_STACK_SIZE: usize = 64 * 1024;
pub const BUTTON_TASK_STACK_SIZE: usize = 32 * 1024;
pub const DISPLAY_TASK_STACK_SIZE: usize = 64 * 1024;
pub const GATEWAY_TASK_STACK_SIZE: usize = 64 * 1024;

/// Illuminance (lux) to backlight level
pub const DEFAULT_BRIGHTNESS_CURVE: [BrightnessSetting; BRIGHTNESS_KEY_POINTS] = [
    BrightnessSetting::new(50.0, 20),
    BrightnessSetting::new(120.0, 100),
    BrightnessSetting::new(180.0, 200),
    BrightnessSetting::new(f32::MAX, 255),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ButtonTaskFps,
    SensorTaskFps,
    UiTaskFps,
    WifiTaskFps,
    BrightnessAuto,
    BrightnessHoldMs,
    BrightnessTransitionMs,
    /// Backlight level while automatic control is off
    BrightnessManual,
    UseTelemetry,
    AmbientIntervalMs,
    StatusIntervalMs,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::ButtonTaskFps,
        ConfigKey::SensorTaskFps,
        ConfigKey::UiTaskFps,
        ConfigKey::WifiTaskFps,
        ConfigKey::BrightnessAuto,
        ConfigKey::BrightnessHoldMs,
        ConfigKey::BrightnessTransitionMs,
        ConfigKey::BrightnessManual,
        ConfigKey::UseTelemetry,
        ConfigKey::AmbientIntervalMs,
        ConfigKey::StatusIntervalMs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::ButtonTaskFps => "button_task_fps",
            ConfigKey::SensorTaskFps => "sensor_task_fps",
            ConfigKey::UiTaskFps => "ui_task_fps",
            ConfigKey::WifiTaskFps => "wifi_task_fps",
            ConfigKey::BrightnessAuto => "brightness_auto",
            ConfigKey::BrightnessHoldMs => "brightness_hold_ms",
            ConfigKey::BrightnessTransitionMs => "brightness_transition_ms",
            ConfigKey::BrightnessManual => "brightness_manual",
            ConfigKey::UseTelemetry => "use_telemetry",
            ConfigKey::AmbientIntervalMs => "ambient_interval_ms",
            ConfigKey::StatusIntervalMs => "status_interval_ms",
        }
    }

    pub fn default_value(self) -> ConfigValue {
        match self {
            ConfigKey::ButtonTaskFps => ConfigValue::U32(60),
            ConfigKey::SensorTaskFps => ConfigValue::U32(10),
            ConfigKey::UiTaskFps => ConfigValue::U32(30),
            ConfigKey::WifiTaskFps => ConfigValue::U32(0),
            ConfigKey::BrightnessAuto => ConfigValue::Bool(true),
            ConfigKey::BrightnessHoldMs => ConfigValue::U32(3000),
            ConfigKey::BrightnessTransitionMs => ConfigValue::U32(1000),
            ConfigKey::BrightnessManual => ConfigValue::U32(200),
            ConfigKey::UseTelemetry => ConfigValue::Bool(false),
            ConfigKey::AmbientIntervalMs => ConfigValue::U32(60_000),
            ConfigKey::StatusIntervalMs => ConfigValue::U32(5000),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    U32(u32),
    Bool(bool),
}

impl ConfigValue {
    pub fn as_u32(self) -> Option<u32> {
        match self {
            ConfigValue::U32(v) => Some(v),
            ConfigValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(v),
            ConfigValue::U32(_) => None,
        }
    }

    fn same_type(self, other: ConfigValue) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

/// Backing storage for settings
pub trait ConfigStore: Send {
    /// `Ok(None)` when the key was never written
    fn read(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError>;

    fn write(&mut self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigError>;
}

/// Settings held in RAM
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigStore {
    values: HashMap<ConfigKey, ConfigValue>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError> {
        Ok(self.values.get(&key).copied())
    }

    fn write(&mut self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigError> {
        self.values.insert(key, value);
        Ok(())
    }
}

/// Read-only view of the settings handed to tasks
pub trait ConfigReader: Send + Sync {
    fn read(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError>;
}

impl<S: ConfigStore> ConfigReader for SharedResource<S> {
    fn read(&self, key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError> {
        self.with_lock(|store| store.read(key))
    }
}

/// Every runtime setting, resolved once
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub button_task_fps: u32,
    pub sensor_task_fps: u32,
    pub ui_task_fps: u32,
    pub wifi_task_fps: u32,
    pub brightness_auto: bool,
    pub brightness_hold_ms: u32,
    pub brightness_transition_ms: u32,
    pub brightness_manual: u8,
    pub use_telemetry: bool,
    pub ambient_interval_ms: u32,
    pub status_interval_ms: u32,
}

impl ConfigSnapshot {
    /// Missing, mistyped and unreadable keys fall back to their defaults.
    pub fn load(reader: &dyn ConfigReader) -> Self {
        let u32_of = |key: ConfigKey| lookup(reader, key).as_u32().unwrap_or_default();
        let bool_of = |key: ConfigKey| lookup(reader, key).as_bool().unwrap_or_default();
        Self {
            button_task_fps: u32_of(ConfigKey::ButtonTaskFps),
            sensor_task_fps: u32_of(ConfigKey::SensorTaskFps),
            ui_task_fps: u32_of(ConfigKey::UiTaskFps),
            wifi_task_fps: u32_of(ConfigKey::WifiTaskFps),
            brightness_auto: bool_of(ConfigKey::BrightnessAuto),
            brightness_hold_ms: u32_of(ConfigKey::BrightnessHoldMs),
            brightness_transition_ms: u32_of(ConfigKey::BrightnessTransitionMs),
            brightness_manual: u32_of(ConfigKey::BrightnessManual).min(u8::MAX as u32) as u8,
            use_telemetry: bool_of(ConfigKey::UseTelemetry),
            ambient_interval_ms: u32_of(ConfigKey::AmbientIntervalMs),
            status_interval_ms: u32_of(ConfigKey::StatusIntervalMs),
        }
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::load(&NoConfig)
    }
}

fn lookup(reader: &dyn ConfigReader, key: ConfigKey) -> ConfigValue {
    let default = key.default_value();
    match reader.read(key) {
        Ok(Some(value)) if value.same_type(default) => value,
        Ok(Some(value)) => {
            warn!("config: {} has the wrong type ({:?}), using default", key.name(), value);
            default
        }
        Ok(None) => default,
        Err(err) => {
            warn!("config: {} unreadable ({}), using default", key.name(), err);
            default
        }
    }
}

struct NoConfig;

impl ConfigReader for NoConfig {
    fn read(&self, _key: ConfigKey) -> Result<Option<ConfigValue>, ConfigError> {
        Ok(None)
    }
}
