//! Automatic backlight control
//!
//! Illuminance is mapped onto an ascending breakpoint table. A new breakpoint
//! must match for longer than the hold time before the backlight moves, and
//! the move itself is a linear fade over the transition time.

use log::debug;
use ufmt::derive::uDebug;

use crate::drivers::display::Backlight;
use crate::os::{self, Tick};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, uDebug)]
pub enum BrightnessState {
    /// Automatic control off (manual override or not configured)
    #[default]
    Disabled,
    /// Tracking the breakpoint that matches the current reading
    Enabled,
    /// A different breakpoint matched; waiting for it to hold
    Watching,
    /// Fading between two breakpoints
    Transitioning,
}

/// Readings below `threshold` select `level`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BrightnessSetting {
    /// lux
    pub threshold: f32,
    pub level: u8,
}

impl BrightnessSetting {
    pub const fn new(threshold: f32, level: u8) -> Self {
        Self { threshold, level }
    }
}

pub struct BrightnessController<B> {
    backlight: B,
    state: BrightnessState,
    settings: Vec<BrightnessSetting>,
    capacity: usize,
    current: usize,
    applied: u8,
    hold: Tick,
    transition: Tick,
    // watching
    candidate: usize,
    watch_start: Tick,
    // transitioning
    src: usize,
    dst: usize,
    transition_start: Tick,
}

impl<B: Backlight> BrightnessController<B> {
    /// Room for `capacity` breakpoints, reserved once here.
    pub fn new(backlight: B, capacity: usize) -> Self {
        Self {
            backlight,
            state: BrightnessState::Disabled,
            settings: Vec::with_capacity(capacity),
            capacity,
            current: 0,
            applied: 0,
            hold: 0,
            transition: 0,
            candidate: 0,
            watch_start: 0,
            src: 0,
            dst: 0,
            transition_start: 0,
        }
    }

    /// Drop every breakpoint and disable automatic control
    pub fn clear(&mut self) {
        self.state = BrightnessState::Disabled;
        self.settings.clear();
        self.current = 0;
    }

    /// Load a breakpoint table and timing.
    ///
    /// The table is cut at the first entry whose threshold does not exceed
    /// its predecessor's, and at the controller capacity. Returns the number
    /// of breakpoints kept. With at least one kept and `enable` set, control
    /// restarts at breakpoint 0.
    pub fn configure(
        &mut self,
        enable: bool,
        hold_ms: u32,
        transition_ms: u32,
        settings: &[BrightnessSetting],
    ) -> usize {
        self.settings.clear();
        for (i, setting) in settings.iter().take(self.capacity).enumerate() {
            if i > 0 && settings[i - 1].threshold >= setting.threshold {
                debug!("brightness: breakpoint {} out of order, table cut", i);
                break;
            }
            self.settings.push(*setting);
        }

        self.hold = os::ms_to_tick(hold_ms);
        self.transition = os::ms_to_tick(transition_ms);

        self.state = BrightnessState::Disabled;
        self.current = 0;
        self.set_enable(enable);
        self.settings.len()
    }

    /// Switch automatic control. Stays disabled without a valid table.
    ///
    /// Turning control on restores the tracked breakpoint's level, so a
    /// manual override never outlives the switch back to automatic.
    pub fn set_enable(&mut self, enable: bool) {
        if self.settings.is_empty() {
            return;
        }
        match (enable, self.state) {
            (false, _) => self.state = BrightnessState::Disabled,
            (true, BrightnessState::Disabled) => {
                self.current = self.current.min(self.settings.len() - 1);
                self.apply(self.settings[self.current].level);
                self.state = BrightnessState::Enabled;
            }
            (true, _) => {}
        }
    }

    /// Force a backlight level. Automatic control stays off until re-enabled.
    pub fn set_manual(&mut self, level: u8) {
        self.apply(level);
        self.state = BrightnessState::Disabled;
    }

    /// Feed the latest illuminance reading taken at `now`
    pub fn update(&mut self, illuminance: f32, now: Tick) -> BrightnessState {
        match self.state {
            BrightnessState::Disabled => {}
            BrightnessState::Enabled => {
                if let Some(index) = self.search(illuminance) {
                    if index != self.current {
                        self.candidate = index;
                        self.watch_start = now;
                        self.state = BrightnessState::Watching;
                    }
                }
            }
            BrightnessState::Watching => match self.search(illuminance) {
                Some(index) if index == self.candidate => {
                    if os::diff(self.watch_start, now) > self.hold {
                        self.src = self.current;
                        self.dst = self.candidate;
                        self.transition_start = now;
                        self.state = BrightnessState::Transitioning;
                        debug!("brightness: fading {} -> {}", self.src, self.dst);
                    }
                }
                _ => self.state = BrightnessState::Enabled,
            },
            BrightnessState::Transitioning => {
                let elapsed = os::diff(self.transition_start, now);
                if elapsed >= self.transition {
                    self.current = self.dst;
                    self.apply(self.settings[self.dst].level);
                    self.state = BrightnessState::Enabled;
                } else {
                    let from = self.settings[self.src].level as f32;
                    let to = self.settings[self.dst].level as f32;
                    let progress = elapsed as f32 / self.transition as f32;
                    let level = from + (to - from) * progress;
                    self.apply(level.round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        self.state
    }

    /// Index of the first breakpoint whose threshold lies above `illuminance`.
    ///
    /// Readings at or above the last threshold match nothing, so tables are
    /// expected to end with a catch-all entry.
    pub fn search(&self, illuminance: f32) -> Option<usize> {
        self.settings
            .iter()
            .position(|setting| illuminance < setting.threshold)
    }

    pub fn state(&self) -> BrightnessState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Level last written to the backlight
    pub fn level(&self) -> u8 {
        self.applied
    }

    pub fn settings(&self) -> &[BrightnessSetting] {
        &self.settings
    }

    pub fn backlight(&self) -> &B {
        &self.backlight
    }

    pub fn backlight_mut(&mut self) -> &mut B {
        &mut self.backlight
    }

    fn apply(&mut self, level: u8) {
        self.applied = level;
        self.backlight.set_brightness(level);
    }
}
