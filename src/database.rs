use crate::error::{DecodeError, EncodeError};
use crate::frame::{standard_id, Frame, MAX_PAYLOAD};
use crate::messages::{
    DoorState, LightState, DOOR_STATE, LEFT_TURN, LIGHT_STATE, RIGHT_TURN, VEHICLE_SPEED,
};
use embedded_can::StandardId;
use std::collections::BTreeMap;

/// Identifier of the speed message
pub const SPEED_ID: u16 = 0x244;
/// Identifier of the turn signal message
pub const TURN_SIGNALS_ID: u16 = 0x188;
/// Identifier of the door lock message
pub const DOORS_ID: u16 = 0x19B;
/// Identifier of the head light message
pub const HEAD_LIGHTS_ID: u16 = 0x15C;

/// Name of the speed message
pub const SPEED: &str = "Speed";
/// Name of the turn signal message
pub const TURN_SIGNALS: &str = "TurnSignals";
/// Name of the door lock message
pub const DOORS: &str = "Doors";
/// Name of the head light message
pub const HEAD_LIGHTS: &str = "HeadLights";

/// Value of a single signal
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SignalValue {
    /// Physical value of a numeric signal (factor and offset applied)
    Numeric(f64),
    /// Symbol out of the value table of an enumerated signal
    Symbol(&'static str),
}

impl From<bool> for SignalValue {
    fn from(flag: bool) -> Self {
        SignalValue::Numeric(if flag { 1.0 } else { 0.0 })
    }
}
impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        SignalValue::Numeric(value)
    }
}

/// Signal name to value
pub type SignalSet = BTreeMap<&'static str, SignalValue>;

/// How the raw bits of a signal are interpreted
#[derive(Debug, PartialEq, Clone)]
pub enum SignalKind {
    /// physical = raw * factor + offset
    Numeric {
        /// two's complement raw value
        signed: bool,
        /// scaling
        factor: f64,
        /// offset applied after scaling
        offset: f64,
    },
    /// raw value is looked up in a value table
    Enumerated(Vec<(u64, &'static str)>),
}

/// Placement of one signal inside a payload. Little endian (Intel) bit numbering.
#[derive(Debug, PartialEq, Clone)]
pub struct SignalDefinition {
    name: &'static str,
    start_bit: u8,
    length: u8,
    kind: SignalKind,
}

impl SignalDefinition {
    /// Creates a new signal definition
    pub fn new(name: &'static str, start_bit: u8, length: u8, kind: SignalKind) -> Self {
        debug_assert!(length > 0 && start_bit as usize + length as usize <= MAX_PAYLOAD * 8);
        Self {
            name,
            start_bit,
            length,
            kind,
        }
    }
    /// Unsigned integer signal without scaling, used for flags and counters
    pub fn unsigned(name: &'static str, start_bit: u8, length: u8) -> Self {
        Self::new(
            name,
            start_bit,
            length,
            SignalKind::Numeric {
                signed: false,
                factor: 1.0,
                offset: 0.0,
            },
        )
    }
    /// Returns the signal name
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn mask(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    fn to_raw(&self, value: SignalValue) -> Result<u64, EncodeError> {
        match (&self.kind, value) {
            (
                SignalKind::Numeric {
                    signed,
                    factor,
                    offset,
                },
                SignalValue::Numeric(physical),
            ) => {
                let raw = ((physical - offset) / factor).round();
                let (min, max) = if *signed {
                    let half = (1i128 << (self.length - 1)) as f64;
                    (-half, half - 1.0)
                } else {
                    (0.0, self.mask() as f64)
                };
                if !(min..=max).contains(&raw) {
                    return Err(EncodeError::OutOfRange(self.name));
                }
                Ok((raw as i64 as u64) & self.mask())
            }
            (SignalKind::Enumerated(table), SignalValue::Symbol(symbol)) => table
                .iter()
                .find(|(_, name)| *name == symbol)
                .map(|(raw, _)| *raw)
                .ok_or(EncodeError::OutOfRange(self.name)),
            _ => Err(EncodeError::SignalType(self.name)),
        }
    }

    fn from_raw(&self, raw: u64) -> Result<SignalValue, DecodeError> {
        match &self.kind {
            SignalKind::Numeric {
                signed,
                factor,
                offset,
            } => {
                let value = if *signed && self.length < 64 && (raw >> (self.length - 1)) & 1 == 1 {
                    (raw | !self.mask()) as i64 as f64
                } else {
                    raw as f64
                };
                Ok(SignalValue::Numeric(value * factor + offset))
            }
            SignalKind::Enumerated(table) => table
                .iter()
                .find(|(value, _)| *value == raw)
                .map(|(_, symbol)| SignalValue::Symbol(*symbol))
                .ok_or(DecodeError::UnknownSymbol {
                    signal: self.name,
                    raw,
                }),
        }
    }

    fn extract(&self, payload: u64) -> u64 {
        (payload >> self.start_bit) & self.mask()
    }

    fn insert(&self, payload: u64, raw: u64) -> u64 {
        let cleared = payload & !(self.mask() << self.start_bit);
        cleared | (raw << self.start_bit)
    }
}

/// Named layout for one identifier
#[derive(Debug, PartialEq, Clone)]
pub struct MessageDefinition {
    name: &'static str,
    id: StandardId,
    length: usize,
    signals: Vec<SignalDefinition>,
}

impl MessageDefinition {
    /// Creates a message definition, the payload is `length` bytes wide (at most 8)
    pub fn new(
        name: &'static str,
        id: StandardId,
        length: usize,
        signals: Vec<SignalDefinition>,
    ) -> Self {
        Self {
            name,
            id,
            length: length.min(MAX_PAYLOAD),
            signals,
        }
    }
    /// Returns the message name
    pub fn name(&self) -> &'static str {
        self.name
    }
    /// Returns the frame identifier
    pub fn id(&self) -> StandardId {
        self.id
    }
    /// Returns the payload width in bytes
    pub fn length(&self) -> usize {
        self.length
    }
    /// Returns the signal layouts
    pub fn signals(&self) -> &[SignalDefinition] {
        &self.signals
    }

    /// Packs all signals of this message into a frame
    /// Every signal of the definition must be present in `values`
    pub fn encode(&self, values: &SignalSet) -> Result<Frame, EncodeError> {
        let mut payload = 0u64;
        for signal in &self.signals {
            let value = values
                .get(signal.name)
                .copied()
                .ok_or(EncodeError::MissingSignal {
                    message: self.name,
                    signal: signal.name,
                })?;
            payload = signal.insert(payload, signal.to_raw(value)?);
        }
        let bytes = payload.to_le_bytes();
        Ok(Frame::from_parts(self.id, &bytes[..self.length])
            .expect("message definitions never exceed a classic can payload"))
    }

    /// Unpacks all signals of this message
    pub fn decode(&self, data: &[u8]) -> Result<SignalSet, DecodeError> {
        if data.len() != self.length {
            return Err(DecodeError::PayloadLength {
                id: self.id.as_raw(),
                expected: self.length,
                actual: data.len(),
            });
        }
        let mut bytes = [0u8; MAX_PAYLOAD];
        bytes[..data.len()].copy_from_slice(data);
        let payload = u64::from_le_bytes(bytes);

        let mut values = SignalSet::new();
        for signal in &self.signals {
            values.insert(signal.name, signal.from_raw(signal.extract(payload))?);
        }
        Ok(values)
    }
}

/// Holds the message definitions of one bus
/// Lookup is possible by name (for encoding) and by identifier (for decoding)
#[derive(Debug, Clone, Default)]
pub struct FrameDatabase {
    messages: Vec<MessageDefinition>,
}

impl FrameDatabase {
    /// Creates a database from a list of definitions
    pub fn new(messages: Vec<MessageDefinition>) -> Self {
        Self { messages }
    }

    /// The fixed schema of the simulated vehicle:
    /// Speed, TurnSignals, Doors and HeadLights
    pub fn vehicle() -> Self {
        let door_table = DoorState::ALL
            .iter()
            .map(|state| (u8::from(*state) as u64, state.symbol()))
            .collect();
        let light_table = LightState::ALL
            .iter()
            .map(|state| (u8::from(*state) as u64, state.symbol()))
            .collect();

        Self::new(vec![
            MessageDefinition::new(
                SPEED,
                standard_id(SPEED_ID),
                2,
                vec![SignalDefinition::new(
                    VEHICLE_SPEED,
                    0,
                    16,
                    SignalKind::Numeric {
                        signed: true,
                        factor: 1.0,
                        offset: 0.0,
                    },
                )],
            ),
            MessageDefinition::new(
                TURN_SIGNALS,
                standard_id(TURN_SIGNALS_ID),
                1,
                vec![
                    SignalDefinition::unsigned(LEFT_TURN, 0, 1),
                    SignalDefinition::unsigned(RIGHT_TURN, 1, 1),
                ],
            ),
            MessageDefinition::new(
                DOORS,
                standard_id(DOORS_ID),
                1,
                vec![SignalDefinition::new(
                    DOOR_STATE,
                    0,
                    2,
                    SignalKind::Enumerated(door_table),
                )],
            ),
            MessageDefinition::new(
                HEAD_LIGHTS,
                standard_id(HEAD_LIGHTS_ID),
                1,
                vec![SignalDefinition::new(
                    LIGHT_STATE,
                    0,
                    2,
                    SignalKind::Enumerated(light_table),
                )],
            ),
        ])
    }

    /// Returns the definition with the given name
    pub fn message_by_name(&self, name: &str) -> Option<&MessageDefinition> {
        self.messages.iter().find(|msg| msg.name == name)
    }
    /// Returns the definition with the given identifier
    pub fn message_by_id(&self, id: u16) -> Option<&MessageDefinition> {
        self.messages.iter().find(|msg| msg.id.as_raw() == id)
    }
    /// All identifiers known to this database
    pub fn identifiers(&self) -> Vec<u16> {
        self.messages.iter().map(|msg| msg.id.as_raw()).collect()
    }

    /// Encodes the named message
    pub fn encode(&self, name: &str, values: &SignalSet) -> Result<Frame, EncodeError> {
        self.message_by_name(name)
            .ok_or_else(|| EncodeError::UnknownMessage(name.into()))?
            .encode(values)
    }

    /// Decodes a payload by looking up the identifier
    pub fn decode(
        &self,
        id: u16,
        data: &[u8],
    ) -> Result<(&MessageDefinition, SignalSet), DecodeError> {
        let message = self
            .message_by_id(id)
            .ok_or(DecodeError::UnknownIdentifier(id))?;
        Ok((message, message.decode(data)?))
    }
}
