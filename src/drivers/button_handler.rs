//! Button sampling and debouncing

use embedded_hal::digital::v2::InputPin;
use thiserror::Error;
use ufmt::derive::uDebug;

use crate::os::Tick;

/// One bit per physical button in every bitmask
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    Up = 0x01,
    Down = 0x02,
    Left = 0x04,
    Right = 0x08,
    Press = 0x10,
    A = 0x20,
    B = 0x40,
    C = 0x80,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Press,
        Button::A,
        Button::B,
        Button::C,
    ];

    #[inline]
    pub fn mask(self) -> u32 {
        self as u32
    }
}

/// One debounced sample. `pushed & released` is always 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, uDebug)]
pub struct ButtonEvent {
    pub raw: u32,
    pub debounced: u32,
    pub pushed: u32,
    pub released: u32,
    pub timestamp: Tick,
}

impl ButtonEvent {
    pub fn is_down(&self, button: Button) -> bool {
        self.debounced & button.mask() != 0
    }

    pub fn is_pushed(&self, button: Button) -> bool {
        self.pushed & button.mask() != 0
    }

    pub fn is_released(&self, button: Button) -> bool {
        self.released & button.mask() != 0
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceError {
    #[error("debounce history must hold at least one sample")]
    EmptyHistory,
}

/// Accepts a press only after it was read in every one of the last N polls.
///
/// A single released sample clears the bit, so releases carry no latency.
pub struct DebounceFilter {
    history: Vec<u32>,
    cursor: usize,
    previous: u32,
}

impl DebounceFilter {
    /// The history starts zero-filled, as if every button was just released.
    pub fn new(depth: usize) -> Result<Self, DebounceError> {
        if depth == 0 {
            return Err(DebounceError::EmptyHistory);
        }
        Ok(Self {
            history: vec![0; depth],
            cursor: 0,
            previous: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn update(&mut self, raw: u32, timestamp: Tick) -> ButtonEvent {
        self.history[self.cursor] = raw;
        self.cursor = (self.cursor + 1) % self.history.len();

        let debounced = self.history.iter().fold(u32::MAX, |acc, &s| acc & s);

        let changed = debounced ^ self.previous;
        let pushed = debounced & changed;
        let released = self.previous & changed;
        self.previous = debounced;

        ButtonEvent {
            raw,
            debounced,
            pushed,
            released,
            timestamp,
        }
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.history.fill(0);
        self.cursor = 0;
        self.previous = 0;
    }
}

/// Source of the raw button bitmask
pub trait RawButtons: Send {
    fn read(&mut self) -> u32;
}

/// Active-low button pins mapped onto their bits
pub struct ButtonPins<P> {
    pins: Vec<(Button, P)>,
}

impl<P: InputPin> ButtonPins<P> {
    pub fn new(pins: impl IntoIterator<Item = (Button, P)>) -> Self {
        Self {
            pins: pins.into_iter().collect(),
        }
    }
}

impl<P> RawButtons for ButtonPins<P>
where
    P: InputPin + Send,
{
    fn read(&mut self) -> u32 {
        // An unreadable pin counts as released
        self.pins
            .iter()
            .filter(|(_, pin)| pin.is_low().unwrap_or(false))
            .fold(0, |raw, (button, _)| raw | button.mask())
    }
}
