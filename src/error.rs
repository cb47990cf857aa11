use thiserror::Error;

/// Failure to turn a received payload back into signal values
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    /// No message definition is registered for this identifier
    #[error("unknown identifier {0:#05X}")]
    UnknownIdentifier(u16),
    /// The payload width does not match the message definition
    #[error("identifier {id:#05X} expects {expected} bytes, got {actual}")]
    PayloadLength {
        /// identifier of the offending frame
        id: u16,
        /// payload length of the message definition
        expected: usize,
        /// payload length seen on the bus
        actual: usize,
    },
    /// A raw value has no entry in the signal's value table
    #[error("signal {signal} has no symbol for raw value {raw}")]
    UnknownSymbol {
        /// signal name
        signal: &'static str,
        /// raw value read from the payload
        raw: u64,
    },
    /// A signal present in the definition is not the expected one for a typed message
    #[error("message {message} is missing signal {signal}")]
    MissingSignal {
        /// message name
        message: &'static str,
        /// signal name
        signal: &'static str,
    },
}

/// Failure to build a payload from signal values
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodeError {
    /// The database holds no message with this name
    #[error("unknown message {0}")]
    UnknownMessage(String),
    /// A signal of the message definition was not supplied
    #[error("message {message} is missing signal {signal}")]
    MissingSignal {
        /// message name
        message: &'static str,
        /// signal name
        signal: &'static str,
    },
    /// The supplied value kind does not fit the signal
    #[error("signal {0} got a value of the wrong kind")]
    SignalType(&'static str),
    /// The value does not fit into the signal's bit width
    #[error("signal {0} value out of range")]
    OutOfRange(&'static str),
}

/// Errors reported by a bus channel
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BusError {
    /// Interface could not be opened
    #[error("failed to open interface {interface}: {reason}")]
    Open {
        /// interface name, e.g. vcan0
        interface: String,
        /// driver error description
        reason: String,
    },
    /// Sending a frame failed
    #[error("transmit failed: {0}")]
    Transmit(String),
    /// Reading a frame failed
    #[error("receive failed: {0}")]
    Receive(String),
    /// The driver produced a frame this simulator cannot represent
    #[error("unsupported frame received")]
    UnsupportedFrame,
    /// Every other endpoint of the channel was dropped
    #[error("bus disconnected")]
    Disconnected,
}

impl embedded_can::Error for BusError {
    fn kind(&self) -> embedded_can::ErrorKind {
        embedded_can::ErrorKind::Other
    }
}

/// Errors from the operator input sources
#[derive(Debug, Error)]
pub enum InputError {
    /// No gamepad present at the configured device path
    #[error("controller not detected at {0}")]
    DeviceNotDetected(String),
    /// Terminal could not be configured or polled
    #[error("terminal input failed: {0}")]
    Terminal(#[source] std::io::Error),
    /// Reading the device failed
    #[error("input device failed: {0}")]
    Io(#[source] std::io::Error),
}

/// Top level simulator error
#[derive(Debug, Error)]
pub enum SimError {
    /// Transport failure
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Encoding failure
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Input source failure
    #[error(transparent)]
    Input(#[from] InputError),
    /// A loop thread could not be spawned or panicked
    #[error("{0} thread failed")]
    Thread(&'static str),
}
