//! Operator input.
//! A driver is polled once per tick and condenses everything that happened
//! since the last poll into one [Intent].

use crate::error::InputError;

/// Gamepad backend and button mapping
pub mod gamepad;
/// Keyboard backend and key mapping
pub mod keyboard;

pub use gamepad::{GamepadDriver, GamepadMapper};
pub use keyboard::{KeyboardDriver, KeyboardMapper, KeyboardSession};

/// Kind of control source driving the vehicle
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ControlSource {
    /// arrow keys, enter and shift
    #[default]
    Keyboard,
    /// triggers, shoulder and face buttons
    Gamepad,
}

/// What the operator wants during one tick
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Intent {
    /// throttle rate in [0, 1]
    pub accelerate: f64,
    /// brake rate in [0, 1]
    pub brake: f64,
    /// door lock button went down
    pub toggle_lock: bool,
    /// light button went down
    pub toggle_lights: bool,
    /// left indicator is held
    pub left_indicator: bool,
    /// right indicator is held
    pub right_indicator: bool,
    /// left indicator was let go during this tick
    pub left_released: bool,
    /// right indicator was let go during this tick
    pub right_released: bool,
    /// operator asked to stop the simulation
    pub quit: bool,
}

/// A source of operator input
pub trait InputDriver {
    /// Which kind of source this is
    fn kind(&self) -> ControlSource;
    /// Collects the input since the last poll, must not block
    fn poll(&mut self) -> Result<Intent, InputError>;
}

impl<T: InputDriver + ?Sized> InputDriver for Box<T> {
    fn kind(&self) -> ControlSource {
        (**self).kind()
    }
    fn poll(&mut self) -> Result<Intent, InputError> {
        (**self).poll()
    }
}
