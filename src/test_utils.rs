pub mod can_driver {
    use crate::error::BusError;
    use crate::frame::Frame;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Channel {
        // frames the code under test transmitted
        sent: VecDeque<Frame>,
        // frames the code under test will receive
        incoming: VecDeque<Frame>,
        fail_transmit: bool,
    }

    /// Can driver recording every transmitted frame
    #[derive(Clone, Default)]
    pub struct TestDriver(Arc<Mutex<Channel>>);

    impl TestDriver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_can_frame(&mut self, frame: Frame) {
            self.0.lock().unwrap().incoming.push_back(frame);
        }

        pub fn get_can_frame(&mut self) -> Option<Frame> {
            self.0.lock().unwrap().sent.pop_front()
        }

        pub fn fail_transmit(&self, fail: bool) {
            self.0.lock().unwrap().fail_transmit = fail;
        }
    }

    impl embedded_can::blocking::Can for TestDriver {
        type Frame = Frame;
        type Error = BusError;

        fn transmit(&mut self, frame: &Self::Frame) -> Result<(), Self::Error> {
            let mut channel = self.0.lock().unwrap();
            if channel.fail_transmit {
                return Err(BusError::Transmit("test driver".into()));
            }
            channel.sent.push_back(frame.clone());
            Ok(())
        }

        // never blocks, an exhausted script reads as a closed channel
        fn receive(&mut self) -> Result<Self::Frame, Self::Error> {
            self.0
                .lock()
                .unwrap()
                .incoming
                .pop_front()
                .ok_or(BusError::Disconnected)
        }
    }
}

pub mod testtime {
    use crate::time::Instant;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct TestTimer(Arc<AtomicU64>);

    impl TestTimer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_time(&mut self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl crate::time::TimerDriver for TestTimer {
        fn now(&self) -> Instant {
            Instant::from_ticks(self.0.load(Ordering::SeqCst))
        }
    }
}

pub mod input {
    use crate::error::InputError;
    use crate::input::{ControlSource, InputDriver, Intent};
    use std::collections::VecDeque;

    /// Replays a fixed list of intents, then reports an idle operator
    pub struct ScriptedInput {
        intents: VecDeque<Intent>,
        kind: ControlSource,
    }

    impl ScriptedInput {
        pub fn new(intents: Vec<Intent>) -> Self {
            Self {
                intents: intents.into(),
                kind: ControlSource::Keyboard,
            }
        }

        pub fn gamepad(intents: Vec<Intent>) -> Self {
            Self {
                kind: ControlSource::Gamepad,
                ..Self::new(intents)
            }
        }
    }

    impl InputDriver for ScriptedInput {
        fn kind(&self) -> ControlSource {
            self.kind
        }

        fn poll(&mut self) -> Result<Intent, InputError> {
            Ok(self.intents.pop_front().unwrap_or_default())
        }
    }
}
