use super::{ControlSource, InputDriver, Intent};
use crate::error::InputError;
use crossbeam_queue::ArrayQueue;
use log::{debug, info, warn};
use std::io::Read;
use std::sync::Arc;

/// Axis of the brake trigger
pub const AXIS_BRAKE: u8 = 2;
/// Axis of the throttle trigger
pub const AXIS_ACCELERATE: u8 = 5;
/// Face button toggling the head lights
pub const BUTTON_LIGHTS: u8 = 0;
/// Face button toggling the door lock
pub const BUTTON_LOCK: u8 = 1;
/// Left shoulder button
pub const BUTTON_LEFT_INDICATOR: u8 = 4;
/// Right shoulder button
pub const BUTTON_RIGHT_INDICATOR: u8 = 5;
/// Back/select button
pub const BUTTON_QUIT: u8 = 6;
/// Trigger values at or below this count as released
pub const TRIGGER_DEADZONE: f64 = 0.0;

const AXIS_COUNT: usize = 8;
const EVENT_BUFFER: usize = 64;

/// A state change reported by the joystick device
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum JoystickEvent {
    /// button went up or down
    Button {
        /// button index
        number: u8,
        /// new state
        pressed: bool,
    },
    /// axis moved, value in [-1, 1]
    Axis {
        /// axis index
        number: u8,
        /// new position
        value: f64,
    },
}

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;
const JS_EVENT_INIT: u8 = 0x80;

impl JoystickEvent {
    /// Parses one `struct js_event` of the linux joystick api
    /// Synthetic init events report the initial state and are treated like real ones
    pub fn parse(raw: &[u8; 8]) -> Option<Self> {
        let value = i16::from_le_bytes([raw[4], raw[5]]);
        let number = raw[7];
        match raw[6] & !JS_EVENT_INIT {
            JS_EVENT_BUTTON => Some(JoystickEvent::Button {
                number,
                pressed: value != 0,
            }),
            JS_EVENT_AXIS => Some(JoystickEvent::Axis {
                number,
                value: (value as f64 / i16::MAX as f64).max(-1.0),
            }),
            _ => None,
        }
    }
}

/// Translates joystick events into intents
/// Buttons are edge triggered, trigger rates are sampled every tick
#[derive(Debug)]
pub struct GamepadMapper {
    axes: [f64; AXIS_COUNT],
    left: bool,
    right: bool,
}

impl GamepadMapper {
    /// Creates a mapper with released triggers
    pub fn new() -> Self {
        Self {
            axes: [-1.0; AXIS_COUNT],
            left: false,
            right: false,
        }
    }

    /// Folds the events of one tick into an intent
    pub fn map(&mut self, events: &[JoystickEvent]) -> Intent {
        let mut intent = Intent::default();
        for event in events {
            match *event {
                JoystickEvent::Button {
                    number: BUTTON_LIGHTS,
                    pressed: true,
                } => intent.toggle_lights = true,
                JoystickEvent::Button {
                    number: BUTTON_LOCK,
                    pressed: true,
                } => intent.toggle_lock = true,
                JoystickEvent::Button {
                    number: BUTTON_LEFT_INDICATOR,
                    pressed,
                } => {
                    self.left = pressed;
                    intent.left_released |= !pressed;
                }
                JoystickEvent::Button {
                    number: BUTTON_RIGHT_INDICATOR,
                    pressed,
                } => {
                    self.right = pressed;
                    intent.right_released |= !pressed;
                }
                JoystickEvent::Button {
                    number: BUTTON_QUIT,
                    pressed: true,
                } => intent.quit = true,
                JoystickEvent::Axis { number, value } => {
                    if let Some(axis) = self.axes.get_mut(number as usize) {
                        *axis = value;
                    }
                }
                _ => (),
            }
        }
        intent.brake = trigger(self.axes[AXIS_BRAKE as usize]);
        intent.accelerate = trigger(self.axes[AXIS_ACCELERATE as usize]);
        intent.left_indicator = self.left;
        intent.right_indicator = self.right;
        intent
    }
}

impl Default for GamepadMapper {
    fn default() -> Self {
        Self::new()
    }
}

fn trigger(value: f64) -> f64 {
    if value > TRIGGER_DEADZONE {
        value
    } else {
        0.0
    }
}

/// Gamepad read from a linux joystick device (e.g. /dev/input/js0).
/// A reader thread blocks on the device and hands events over through a lossy queue.
pub struct GamepadDriver {
    mapper: GamepadMapper,
    events: Arc<ArrayQueue<JoystickEvent>>,
}

impl GamepadDriver {
    /// Opens the device, fails fast if no controller is present
    pub fn open(path: &str) -> Result<Self, InputError> {
        let mut device = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InputError::DeviceNotDetected(path.into()),
            _ => InputError::Io(e),
        })?;
        info!("gamepad opened at {}", path);

        let events = Arc::new(ArrayQueue::new(EVENT_BUFFER));
        let queue = events.clone();
        std::thread::Builder::new()
            .name("gamepad".into())
            .spawn(move || {
                let mut raw = [0u8; 8];
                loop {
                    if let Err(e) = device.read_exact(&mut raw) {
                        warn!("gamepad read failed: {}", e);
                        break;
                    }
                    if let Some(event) = JoystickEvent::parse(&raw) {
                        debug!("gamepad {:?}", event);
                        queue.force_push(event);
                    }
                }
            })
            .map_err(InputError::Io)?;

        Ok(Self {
            mapper: GamepadMapper::new(),
            events,
        })
    }
}

impl InputDriver for GamepadDriver {
    fn kind(&self) -> ControlSource {
        ControlSource::Gamepad
    }

    fn poll(&mut self) -> Result<Intent, InputError> {
        let mut events = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            events.push(event);
        }
        Ok(self.mapper.map(&events))
    }
}
