#![warn(missing_docs)]

//! CANdo, a CAN bus vehicle simulator
//! A sender thread drives a simulated vehicle and puts its state on the bus, hidden in noise.
//! A receiver thread decodes what it recognizes and keeps a dashboard in sync.
//! Both use a [embedded_can::blocking::Can] can driver

/// Bus bindings and the in process loopback bus
pub mod bus;
/// Signal layouts of the vehicle messages
pub mod database;
/// Dashboard snapshots and renderers
pub mod display;
/// Error types
pub mod error;
/// CAN Frames
pub mod frame;
/// Operator input
pub mod input;
/// Typed vehicle messages
pub mod messages;
/// Noise traffic
pub mod noise;
/// Receiver loop
pub mod receiver;
/// Shared run flag
pub mod running;
/// Sender loop
pub mod sender;
/// Session setup
pub mod sim;
/// Time utilities
pub mod time;
/// Vehicle state model
pub mod vehicle;

#[cfg(test)]
mod test_utils;

pub use error::{BusError, DecodeError, EncodeError, InputError, SimError};
pub use frame::Frame;
pub use sim::{SimConfig, Simulation};
