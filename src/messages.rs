//! Typed view on the four messages of the vehicle schema.
//! Encoding and decoding is delegated to the [FrameDatabase], this module only
//! maps between signal sets and rust types.

use crate::database::{
    FrameDatabase, SignalSet, SignalValue, DOORS, HEAD_LIGHTS, SPEED, TURN_SIGNALS,
};
use crate::error::{DecodeError, EncodeError};
use crate::frame::Frame;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Speed in km/h, signed
pub const VEHICLE_SPEED: &str = "VehicleSpeed";
/// Left lamp lit
pub const LEFT_TURN: &str = "LeftTurn";
/// Right lamp lit
pub const RIGHT_TURN: &str = "RightTurn";
/// Door lock symbol
pub const DOOR_STATE: &str = "DoorState";
/// Head light symbol
pub const LIGHT_STATE: &str = "LightState";

/// Lock state of the doors
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DoorState {
    /// unlocked
    Open = 0,
    /// locked
    Closed = 1,
}

impl DoorState {
    /// All variants, in raw value order
    pub const ALL: [DoorState; 2] = [DoorState::Open, DoorState::Closed];

    /// Symbol in the value table
    pub fn symbol(self) -> &'static str {
        match self {
            DoorState::Open => "Open",
            DoorState::Closed => "Closed",
        }
    }
    /// Reverse of [DoorState::symbol]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.symbol() == symbol)
    }
    /// Maps the closed flag of the vehicle state
    pub fn from_closed(closed: bool) -> Self {
        if closed {
            DoorState::Closed
        } else {
            DoorState::Open
        }
    }
}

/// Head light state
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LightState {
    /// lights off
    Off = 0,
    /// lights on
    On = 1,
}

impl LightState {
    /// All variants, in raw value order
    pub const ALL: [LightState; 2] = [LightState::Off, LightState::On];

    /// Symbol in the value table
    pub fn symbol(self) -> &'static str {
        match self {
            LightState::Off => "Off",
            LightState::On => "On",
        }
    }
    /// Reverse of [LightState::symbol]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.symbol() == symbol)
    }
    /// Maps the lights flag of the vehicle state
    pub fn from_on(on: bool) -> Self {
        if on {
            LightState::On
        } else {
            LightState::Off
        }
    }
}

/// Speed value as it goes on the wire.
/// Rounds half to even and saturates at the range of the 16 bit signal.
pub fn wire_speed(kmh: f64) -> f64 {
    kmh.round_ties_even()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX))
}

/// A decoded message of the vehicle schema
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum VehicleMessage {
    /// Current speed
    Speed {
        /// km/h, see [wire_speed] for what the encoder makes of it
        kmh: f64,
    },
    /// Turn indicator lamps, at most one side is lit
    TurnSignals {
        /// left lamp lit
        left: bool,
        /// right lamp lit
        right: bool,
    },
    /// Door lock state
    Doors(DoorState),
    /// Head light state
    HeadLights(LightState),
}

impl VehicleMessage {
    /// Name of the message definition
    pub fn name(&self) -> &'static str {
        match self {
            VehicleMessage::Speed { .. } => SPEED,
            VehicleMessage::TurnSignals { .. } => TURN_SIGNALS,
            VehicleMessage::Doors(_) => DOORS,
            VehicleMessage::HeadLights(_) => HEAD_LIGHTS,
        }
    }

    /// Signal values of this message
    pub fn signals(&self) -> SignalSet {
        let mut values = SignalSet::new();
        match *self {
            VehicleMessage::Speed { kmh } => {
                values.insert(VEHICLE_SPEED, SignalValue::Numeric(wire_speed(kmh)));
            }
            VehicleMessage::TurnSignals { left, right } => {
                values.insert(LEFT_TURN, left.into());
                values.insert(RIGHT_TURN, right.into());
            }
            VehicleMessage::Doors(state) => {
                values.insert(DOOR_STATE, SignalValue::Symbol(state.symbol()));
            }
            VehicleMessage::HeadLights(state) => {
                values.insert(LIGHT_STATE, SignalValue::Symbol(state.symbol()));
            }
        }
        values
    }

    /// Encodes this message into a frame
    pub fn encode(&self, db: &FrameDatabase) -> Result<Frame, EncodeError> {
        db.encode(self.name(), &self.signals())
    }

    /// Decodes a frame payload.
    /// Fails with [DecodeError::UnknownIdentifier] for every frame outside the vehicle schema
    pub fn decode(db: &FrameDatabase, id: u16, data: &[u8]) -> Result<Self, DecodeError> {
        let (definition, values) = db.decode(id, data)?;
        let message = definition.name();
        match message {
            SPEED => Ok(VehicleMessage::Speed {
                kmh: numeric(&values, message, VEHICLE_SPEED)?,
            }),
            TURN_SIGNALS => Ok(VehicleMessage::TurnSignals {
                left: numeric(&values, message, LEFT_TURN)? != 0.0,
                right: numeric(&values, message, RIGHT_TURN)? != 0.0,
            }),
            DOORS => {
                let symbol = symbol(&values, message, DOOR_STATE)?;
                DoorState::from_symbol(symbol)
                    .map(VehicleMessage::Doors)
                    .ok_or(DecodeError::MissingSignal {
                        message,
                        signal: DOOR_STATE,
                    })
            }
            HEAD_LIGHTS => {
                let symbol = symbol(&values, message, LIGHT_STATE)?;
                LightState::from_symbol(symbol)
                    .map(VehicleMessage::HeadLights)
                    .ok_or(DecodeError::MissingSignal {
                        message,
                        signal: LIGHT_STATE,
                    })
            }
            // the database knows more messages than the vehicle uses
            _ => Err(DecodeError::UnknownIdentifier(id)),
        }
    }
}

fn numeric(
    values: &SignalSet,
    message: &'static str,
    signal: &'static str,
) -> Result<f64, DecodeError> {
    match values.get(signal) {
        Some(SignalValue::Numeric(value)) => Ok(*value),
        _ => Err(DecodeError::MissingSignal { message, signal }),
    }
}

fn symbol(
    values: &SignalSet,
    message: &'static str,
    signal: &'static str,
) -> Result<&'static str, DecodeError> {
    match values.get(signal) {
        Some(SignalValue::Symbol(value)) => Ok(*value),
        _ => Err(DecodeError::MissingSignal { message, signal }),
    }
}
