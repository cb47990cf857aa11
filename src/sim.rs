//! Wires sender and receiver together.
//! Each loop runs on its own thread and owns its own bus handle, the only thing
//! they share is the [RunFlag].

use crate::bus::BusBinding;
use crate::database::FrameDatabase;
use crate::display::Display;
use crate::error::{InputError, SimError};
use crate::input::{ControlSource, InputDriver};
use crate::noise::{self, NoiseVolume};
use crate::receiver::Receiver;
use crate::running::RunFlag;
use crate::sender::{self, Sender, DEFAULT_TICK_RATE};
use crate::time::SystemTimerDriver;
use log::{error, info, warn};
use std::thread::JoinHandle;

/// Runtime configuration of one simulator session
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// keyboard or gamepad
    pub control: ControlSource,
    /// noise volume, None disables noise
    pub noise: Option<NoiseVolume>,
    /// channel both handles bind to
    pub binding: BusBinding,
    /// sender ticks per second
    pub tick_rate: u32,
    /// linux joystick device of the gamepad
    pub gamepad_device: String,
    /// use the in process loopback bus instead of socketcan
    pub virtual_bus: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            control: ControlSource::Keyboard,
            noise: Some(NoiseVolume::Medium),
            binding: BusBinding::default(),
            tick_rate: DEFAULT_TICK_RATE,
            gamepad_device: "/dev/input/js0".into(),
            virtual_bus: false,
        }
    }
}

/// Handle of a running session
pub struct Simulation {
    running: RunFlag,
    sender: JoinHandle<Result<(), SimError>>,
    receiver: JoinHandle<Result<(), SimError>>,
}

impl Simulation {
    /// Starts both loops.
    /// `open_input` runs on the sender thread, if it fails the receiver is released
    /// and the error is reported by [Simulation::join].
    pub fn start<CanDriver, D, I, F>(
        config: &SimConfig,
        sender_can: CanDriver,
        receiver_can: CanDriver,
        display: D,
        open_input: F,
    ) -> Result<Self, SimError>
    where
        CanDriver: embedded_can::blocking::Can + Send + 'static,
        D: Display + Send + 'static,
        I: InputDriver + 'static,
        F: FnOnce() -> Result<I, InputError> + Send + 'static,
    {
        let db = FrameDatabase::vehicle();
        let pool = match config.noise {
            Some(volume) => noise::generate(volume, &db.identifiers(), &mut rand::thread_rng()),
            None => Vec::new(),
        };
        info!(
            "starting simulation, {:?} control, {} noise sources",
            config.control,
            pool.len()
        );
        let running = RunFlag::new();

        let receiver = Receiver::new(
            receiver_can,
            db.clone(),
            display,
            config.control,
            running.clone(),
        );
        let receiver = std::thread::Builder::new()
            .name("receiver".into())
            .spawn(move || receiver.run())
            .map_err(|_| SimError::Thread("receiver"))?;

        let tick_rate = config.tick_rate;
        let sender_running = running.clone();
        let sender = std::thread::Builder::new()
            .name("sender".into())
            .spawn(move || {
                let mut can = sender_can;
                let input = match open_input() {
                    Ok(input) => input,
                    Err(e) => {
                        error!("{}", e);
                        sender::release_receiver(&mut can, &sender_running);
                        return Err(e.into());
                    }
                };
                Sender::new(can, SystemTimerDriver::new(), input, db, pool, sender_running)
                    .run(tick_rate)
            });
        let sender = match sender {
            Ok(sender) => sender,
            Err(_) => {
                // no frame will ever come, the receiver is left blocked
                running.stop();
                warn!("sender thread could not be spawned");
                return Err(SimError::Thread("sender"));
            }
        };

        Ok(Self {
            running,
            sender,
            receiver,
        })
    }

    /// Run flag shared by both loops
    pub fn running(&self) -> &RunFlag {
        &self.running
    }

    /// Check if both loops returned
    pub fn is_finished(&self) -> bool {
        self.sender.is_finished() && self.receiver.is_finished()
    }

    /// Waits for both loops, the sender's error takes precedence
    pub fn join(self) -> Result<(), SimError> {
        let sender = self
            .sender
            .join()
            .map_err(|_| SimError::Thread("sender"))?;
        let receiver = self
            .receiver
            .join()
            .map_err(|_| SimError::Thread("receiver"))?;
        sender.and(receiver)
    }
}

/// Binds both handles and starts a session on the configured channel
pub fn start_on_binding<D, I, F>(
    config: &SimConfig,
    display: D,
    open_input: F,
) -> Result<Simulation, SimError>
where
    D: Display + Send + 'static,
    I: InputDriver + 'static,
    F: FnOnce() -> Result<I, InputError> + Send + 'static,
{
    if config.virtual_bus {
        let bus = crate::bus::LoopbackBus::new();
        Simulation::start(config, bus.endpoint(), bus.endpoint(), display, open_input)
    } else {
        let sender_can = config.binding.open()?;
        let receiver_can = config.binding.open()?;
        Simulation::start(config, sender_can, receiver_can, display, open_input)
    }
}
