//! Ambient sensor interface

use crate::os::Tick;

/// One reading of every ambient sensor
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MeasureData {
    /// lux
    pub illuminance: f32,
    /// degrees Celsius
    pub temperature: f32,
    /// hPa
    pub pressure: f32,
    /// %RH
    pub humidity: f32,
    /// kOhm
    pub gas: f32,
    pub timestamp: Tick,
}

/// Light, temperature, humidity, pressure and gas sensors behind one call
pub trait Sensor: Send {
    fn measure(&mut self, now: Tick) -> MeasureData;
}

impl<F> Sensor for F
where
    F: FnMut(Tick) -> MeasureData + Send,
{
    fn measure(&mut self, now: Tick) -> MeasureData {
        self(now)
    }
}
