use crate::bus;
use crate::database::FrameDatabase;
use crate::error::SimError;
use crate::input::{InputDriver, Intent};
use crate::messages::VehicleMessage;
use crate::noise::{self, NoiseDescriptor};
use crate::running::RunFlag;
use crate::time::{Instant, Ticker, TimerDriver};
use crate::vehicle::{IndicatorSide, Pedals, VehicleState};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Default tick rate of the sender in Hz
pub const DEFAULT_TICK_RATE: u32 = 25;

/// Clears the run flag and puts one more frame on the bus,
/// a receiver blocked on the channel wakes up and sees the flag.
pub fn release_receiver<CanDriver: embedded_can::blocking::Can>(
    can: &mut CanDriver,
    running: &RunFlag,
) {
    running.stop();
    let wake = NoiseDescriptor::wake().to_frame(&mut rand::thread_rng());
    if let Err(e) = bus::transmit(can, &wake) {
        error!("could not release the receiver: {}", e);
    }
}

/// Authoritative side of the simulation.
/// Polls the operator, evolves the vehicle state and transmits it, interleaved with noise.
pub struct Sender<CanDriver, TimeDriver, Input> {
    can: CanDriver,
    time: TimeDriver,
    input: Input,
    db: FrameDatabase,
    noise: Vec<NoiseDescriptor>,
    state: VehicleState,
    running: RunFlag,
    rng: StdRng,
}

impl<CanDriver, TimeDriver, Input> Sender<CanDriver, TimeDriver, Input>
where
    CanDriver: embedded_can::blocking::Can,
    TimeDriver: TimerDriver,
    Input: InputDriver,
{
    /// Creates a sender, an empty noise pool disables noise
    pub fn new(
        can: CanDriver,
        time: TimeDriver,
        input: Input,
        db: FrameDatabase,
        noise: Vec<NoiseDescriptor>,
        running: RunFlag,
    ) -> Self {
        Self {
            can,
            time,
            input,
            db,
            noise,
            state: VehicleState::default(),
            running,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the random source used for noise selection
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Current vehicle state
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Encodes and transmits a vehicle message
    pub fn send(&mut self, message: VehicleMessage) -> Result<(), SimError> {
        let frame = message.encode(&self.db)?;
        bus::transmit(&mut self.can, &frame)?;
        Ok(())
    }

    /// Flips the head lights and transmits the new state, returns the lights flag
    pub fn toggle_lights(&mut self) -> Result<bool, SimError> {
        let message = self.state.toggle_lights();
        self.send(message)?;
        Ok(self.state.lights_on)
    }

    /// Flips the door lock and transmits the new state, returns the closed flag
    pub fn toggle_lock(&mut self) -> Result<bool, SimError> {
        let message = self.state.toggle_lock();
        self.send(message)?;
        Ok(self.state.doors_closed)
    }

    /// Starts blinking on `side`, or stops blinking when already lit or `cancel` is set
    pub fn send_indicator(&mut self, side: IndicatorSide, cancel: bool) -> Result<(), SimError> {
        let message = self.state.indicator_intent(side, cancel);
        self.send(message)
    }

    /// Toggles the indicator if the blink interval passed, returns the time of the last toggle
    pub fn blink_indicator(&mut self, side: IndicatorSide) -> Result<Instant, SimError> {
        let now = self.time.now();
        if let Some(message) = self.state.blink(side, now) {
            self.send(message)?;
        }
        Ok(self.state.last_indicator_toggle)
    }

    /// Transmits one randomly picked noise frame, if noise is enabled
    pub fn inject_noise(&mut self) -> Result<(), SimError> {
        if let Some(descriptor) = noise::pick(&self.noise, &mut self.rng) {
            let frame = descriptor.to_frame(&mut self.rng);
            bus::transmit(&mut self.can, &frame)?;
        }
        Ok(())
    }

    fn apply(&mut self, intent: &Intent) -> Result<(), SimError> {
        if intent.toggle_lights {
            self.toggle_lights()?;
        }
        if intent.toggle_lock {
            self.toggle_lock()?;
        }
        if intent.left_released {
            self.send_indicator(IndicatorSide::Left, true)?;
        }
        if intent.right_released {
            self.send_indicator(IndicatorSide::Right, true)?;
        }
        self.state.indicator_left = intent.left_indicator;
        self.state.indicator_right = intent.right_indicator;
        self.state.pedals = Pedals {
            accelerate: intent.accelerate,
            brake: intent.brake,
        };
        Ok(())
    }

    /// Runs one tick: noise, operator input, indicators, speed.
    /// Returns false once the operator asked to quit.
    pub fn tick(&mut self) -> Result<bool, SimError> {
        self.inject_noise()?;

        let intent = self.input.poll()?;
        self.apply(&intent)?;

        if self.state.indicator_left {
            self.blink_indicator(IndicatorSide::Left)?;
        }
        if self.state.indicator_right {
            self.blink_indicator(IndicatorSide::Right)?;
        }

        let speed = self.state.advance();
        self.send(speed)?;

        if intent.quit {
            info!("quit requested");
        }
        Ok(!intent.quit)
    }

    /// Ticks at `rate` Hz until the operator quits, the run flag is cleared or an error occurs.
    /// The receiver is always released on return.
    pub fn run(mut self, rate: u32) -> Result<(), SimError> {
        info!(
            "sender running at {} Hz, {:?} input, {} noise sources",
            rate,
            self.input.kind(),
            self.noise.len()
        );
        let mut ticker = Ticker::new(rate);
        let result = loop {
            if !self.running.is_running() {
                break Ok(());
            }
            ticker.tick();
            match self.tick() {
                Ok(true) => (),
                Ok(false) => break Ok(()),
                Err(e) => {
                    error!("sender stopped: {}", e);
                    break Err(e);
                }
            }
        };
        debug!("sender releasing receiver");
        release_receiver(&mut self.can, &self.running);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DOORS_ID, HEAD_LIGHTS_ID, SPEED_ID, TURN_SIGNALS_ID};
    use crate::frame::{standard_id, Frame};
    use crate::test_utils::can_driver::TestDriver;
    use crate::test_utils::input::ScriptedInput;
    use crate::test_utils::testtime::TestTimer;

    fn sender(
        driver: &TestDriver,
        timer: &TestTimer,
        intents: Vec<Intent>,
    ) -> Sender<TestDriver, TestTimer, ScriptedInput> {
        Sender::new(
            driver.clone(),
            timer.clone(),
            ScriptedInput::new(intents),
            FrameDatabase::vehicle(),
            Vec::new(),
            RunFlag::new(),
        )
    }

    fn frame(id: u16, data: &[u8]) -> Frame {
        Frame::from_parts(standard_id(id), data).unwrap()
    }

    #[test]
    fn toggle_lights_scenario() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let mut sender = sender(&driver, &timer, Vec::new());
        assert!(sender.toggle_lights().unwrap());
        assert_eq!(driver.get_can_frame(), Some(frame(HEAD_LIGHTS_ID, &[1])));
        assert!(!sender.toggle_lights().unwrap());
        assert_eq!(driver.get_can_frame(), Some(frame(HEAD_LIGHTS_ID, &[0])));
        assert_eq!(driver.get_can_frame(), None);
    }

    #[test]
    fn toggle_lock_scenario() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let mut sender = sender(&driver, &timer, Vec::new());
        assert!(!sender.toggle_lock().unwrap());
        assert_eq!(driver.get_can_frame(), Some(frame(DOORS_ID, &[0])));
        assert!(sender.toggle_lock().unwrap());
        assert_eq!(driver.get_can_frame(), Some(frame(DOORS_ID, &[1])));
    }

    #[test]
    fn indicator_scenario() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let mut sender = sender(&driver, &timer, Vec::new());
        sender.send_indicator(IndicatorSide::Left, false).unwrap();
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0b01])));
        sender.send_indicator(IndicatorSide::Left, true).unwrap();
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0b00])));
    }

    #[test]
    fn blink_indicator_timing() {
        let mut driver = TestDriver::new();
        let mut timer = TestTimer::new();
        let mut sender = sender(&driver, &timer, Vec::new());

        timer.set_time(1000);
        assert_eq!(
            sender.blink_indicator(IndicatorSide::Right).unwrap(),
            Instant::from_ticks(1000)
        );
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0b10])));

        timer.set_time(1499);
        assert_eq!(
            sender.blink_indicator(IndicatorSide::Right).unwrap(),
            Instant::from_ticks(1000)
        );
        assert_eq!(driver.get_can_frame(), None);

        timer.set_time(1501);
        assert_eq!(
            sender.blink_indicator(IndicatorSide::Right).unwrap(),
            Instant::from_ticks(1501)
        );
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0b00])));
        assert_eq!(driver.get_can_frame(), None);
    }

    #[test]
    fn tick_order() {
        let mut driver = TestDriver::new();
        let mut timer = TestTimer::new();
        timer.set_time(5000);
        let intent = Intent {
            accelerate: 1.0,
            toggle_lights: true,
            left_indicator: true,
            ..Intent::default()
        };
        let mut sender = sender(&driver, &timer, vec![intent]);
        assert!(sender.tick().unwrap());
        assert_eq!(driver.get_can_frame(), Some(frame(HEAD_LIGHTS_ID, &[1])));
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0b01])));
        // 0.25 km/h rounds to 0
        assert_eq!(driver.get_can_frame(), Some(frame(SPEED_ID, &[0, 0])));
        assert_eq!(driver.get_can_frame(), None);
        assert_eq!(sender.state().speed, 0.25);
    }

    #[test]
    fn release_cancels_indicator() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let held = Intent {
            right_indicator: true,
            ..Intent::default()
        };
        let released = Intent {
            right_released: true,
            ..Intent::default()
        };
        let mut sender = sender(&driver, &timer, vec![held, released]);
        // timer at 0, last toggle at 0: no blink yet
        sender.tick().unwrap();
        assert_eq!(driver.get_can_frame(), Some(frame(SPEED_ID, &[0, 0])));
        sender.tick().unwrap();
        assert_eq!(driver.get_can_frame(), Some(frame(TURN_SIGNALS_ID, &[0])));
        assert_eq!(driver.get_can_frame(), Some(frame(SPEED_ID, &[0, 0])));
        assert!(!sender.state().indicator_right);
    }

    #[test]
    fn noise_comes_first() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let pool = vec![NoiseDescriptor::new(standard_id(0x77), 2, 2)];
        let mut sender = Sender::new(
            driver.clone(),
            timer,
            ScriptedInput::new(Vec::new()),
            FrameDatabase::vehicle(),
            pool,
            RunFlag::new(),
        )
        .with_rng(StdRng::seed_from_u64(5));
        sender.tick().unwrap();
        assert_eq!(driver.get_can_frame(), Some(frame(0x77, &[0, 0])));
        assert_eq!(driver.get_can_frame().map(|f| f.raw_id()), Some(SPEED_ID));
    }

    #[test]
    fn quit_releases_receiver() {
        let mut driver = TestDriver::new();
        let timer = TestTimer::new();
        let running = RunFlag::new();
        let quit = Intent {
            quit: true,
            ..Intent::default()
        };
        let sender = Sender::new(
            driver.clone(),
            timer,
            ScriptedInput::new(vec![quit]),
            FrameDatabase::vehicle(),
            Vec::new(),
            running.clone(),
        );
        sender.run(1000).unwrap();
        assert!(!running.is_running());
        // the quitting tick still completes
        assert_eq!(driver.get_can_frame().map(|f| f.raw_id()), Some(SPEED_ID));
        assert_eq!(driver.get_can_frame().map(|f| f.raw_id()), Some(1));
        assert_eq!(driver.get_can_frame(), None);
    }

    #[test]
    fn transmit_failure_is_fatal() {
        let driver = TestDriver::new();
        driver.fail_transmit(true);
        let timer = TestTimer::new();
        let running = RunFlag::new();
        let sender = Sender::new(
            driver.clone(),
            timer,
            ScriptedInput::new(Vec::new()),
            FrameDatabase::vehicle(),
            Vec::new(),
            running.clone(),
        );
        assert!(matches!(sender.run(1000), Err(SimError::Bus(_))));
        assert!(!running.is_running());
    }
}
