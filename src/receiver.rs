use crate::bus;
use crate::database::FrameDatabase;
use crate::display::{BackgroundVariant, Display, DisplaySnapshot};
use crate::error::{BusError, SimError};
use crate::frame::Frame;
use crate::input::ControlSource;
use crate::messages::{DoorState, LightState, VehicleMessage};
use crate::running::RunFlag;
use log::{debug, info, trace};

/// What the receiver knows about the vehicle.
/// Built only from decoded frames, never from the sender's state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ShadowState {
    /// km/h as transmitted
    pub speed: i64,
    /// doors locked
    pub doors_closed: bool,
    /// head lights on
    pub lights_on: bool,
    /// left lamp lit
    pub indicator_left: bool,
    /// right lamp lit
    pub indicator_right: bool,
}

impl Default for ShadowState {
    fn default() -> Self {
        Self {
            speed: 0,
            doors_closed: true,
            lights_on: false,
            indicator_left: false,
            indicator_right: false,
        }
    }
}

impl ShadowState {
    /// Folds one decoded message into the state
    pub fn apply(&mut self, message: &VehicleMessage) {
        match *message {
            VehicleMessage::Speed { kmh } => self.speed = kmh.round_ties_even() as i64,
            VehicleMessage::TurnSignals { left, right } => {
                self.indicator_left = left;
                self.indicator_right = right;
            }
            VehicleMessage::Doors(state) => self.doors_closed = state == DoorState::Closed,
            VehicleMessage::HeadLights(state) => self.lights_on = state == LightState::On,
        }
    }

    /// Dashboard view of the state
    pub fn snapshot(&self, source: ControlSource) -> DisplaySnapshot {
        DisplaySnapshot {
            lights_on: self.lights_on,
            doors_closed: self.doors_closed,
            indicator_left: self.indicator_left,
            indicator_right: self.indicator_right,
            speed: self.speed,
            background: BackgroundVariant::resolve(source, self.lights_on),
        }
    }
}

/// Observing side of the simulation.
/// Decodes every frame on the channel and keeps the dashboard in sync,
/// noise and undecodable frames are dropped silently.
pub struct Receiver<CanDriver, D> {
    can: CanDriver,
    db: FrameDatabase,
    display: D,
    source: ControlSource,
    shadow: ShadowState,
    running: RunFlag,
}

impl<CanDriver, D> Receiver<CanDriver, D>
where
    CanDriver: embedded_can::blocking::Can,
    D: Display,
{
    /// Creates a receiver, the control source only selects the dashboard layout
    pub fn new(
        can: CanDriver,
        db: FrameDatabase,
        display: D,
        source: ControlSource,
        running: RunFlag,
    ) -> Self {
        Self {
            can,
            db,
            display,
            source,
            shadow: ShadowState::default(),
            running,
        }
    }

    /// Current shadow state
    pub fn shadow(&self) -> &ShadowState {
        &self.shadow
    }

    /// Handles one frame, returns the published snapshot if the frame was recognized
    pub fn handle_frame(&mut self, frame: &Frame) -> Option<DisplaySnapshot> {
        let message = match VehicleMessage::decode(&self.db, frame.raw_id(), frame.payload()) {
            Ok(message) => message,
            Err(e) => {
                trace!("ignoring {}: {}", frame, e);
                return None;
            }
        };
        debug!("rx {:?}", message);
        self.shadow.apply(&message);
        let snapshot = self.shadow.snapshot(self.source);
        self.display.show(snapshot);
        Some(snapshot)
    }

    /// Receives and handles frames until the run flag is cleared.
    /// The flag is checked after every frame, a closed channel after stop is a normal exit.
    pub fn run(mut self) -> Result<(), SimError> {
        info!("receiver running");
        self.display.show(self.shadow.snapshot(self.source));
        while self.running.is_running() {
            match bus::receive(&mut self.can) {
                Ok(frame) => {
                    self.handle_frame(&frame);
                }
                Err(BusError::UnsupportedFrame) => trace!("ignoring unsupported frame"),
                Err(e) => {
                    if !self.running.is_running() {
                        break;
                    }
                    return Err(e.into());
                }
            }
        }
        info!("receiver stopped");
        Ok(())
    }
}
