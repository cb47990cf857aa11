//! Simulated vehicle state and the rules that evolve it every tick.
//! State transitions return the message that has to be put on the bus, the
//! caller transmits it before the next transition happens.

use crate::messages::{wire_speed, DoorState, LightState, VehicleMessage};
use crate::time::{elapsed, Instant, BLINK_INTERVAL};

/// Speed gained per tick is `accelerate / ACCELERATION_DIVISOR`
pub const ACCELERATION_DIVISOR: f64 = 4.0;
/// Speed lost per tick is `brake / BRAKE_DIVISOR`
pub const BRAKE_DIVISOR: f64 = 2.0;
/// Speed lost per tick without throttle or brake
pub const IDLE_DECAY: f64 = 0.05;

/// Side of the turn indicator
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IndicatorSide {
    /// left lamp
    Left,
    /// right lamp
    Right,
}

impl IndicatorSide {
    /// Turn signal message lighting this side only
    pub fn lit(self) -> VehicleMessage {
        VehicleMessage::TurnSignals {
            left: self == IndicatorSide::Left,
            right: self == IndicatorSide::Right,
        }
    }
}

/// Turn signal message with both lamps dark
pub const INDICATORS_OFF: VehicleMessage = VehicleMessage::TurnSignals {
    left: false,
    right: false,
};

/// Pedal rates in [0, 1]
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Pedals {
    /// throttle
    pub accelerate: f64,
    /// brake
    pub brake: f64,
}

/// Computes the speed of the next tick.
/// Exactly one of accelerating, braking or coasting applies.
/// A negative speed is kept as is while coasting.
pub fn advance_speed(accelerate: f64, brake: f64, speed: f64) -> f64 {
    if accelerate > 0.0 && brake < accelerate {
        return speed + accelerate / ACCELERATION_DIVISOR;
    }
    if speed >= 0.0 {
        if brake > 0.0 {
            return speed - brake / BRAKE_DIVISOR;
        } else if brake == 0.0 && accelerate == 0.0 {
            return speed - IDLE_DECAY;
        }
    }
    speed
}

/// Authoritative vehicle state, owned by the sender
#[derive(Debug, PartialEq, Clone)]
pub struct VehicleState {
    /// km/h, not bounded
    pub speed: f64,
    /// doors locked
    pub doors_closed: bool,
    /// head lights on
    pub lights_on: bool,
    /// operator holds the left indicator
    pub indicator_left: bool,
    /// operator holds the right indicator
    pub indicator_right: bool,
    /// lamps are currently lit
    pub indicator_blinking: bool,
    /// time of the last blink toggle
    pub last_indicator_toggle: Instant,
    /// current pedal rates
    pub pedals: Pedals,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed: 0.0,
            doors_closed: true,
            lights_on: false,
            indicator_left: false,
            indicator_right: false,
            indicator_blinking: false,
            last_indicator_toggle: Instant::from_ticks(0),
            pedals: Pedals::default(),
        }
    }
}

impl VehicleState {
    /// Flips the door lock
    pub fn toggle_lock(&mut self) -> VehicleMessage {
        self.doors_closed = !self.doors_closed;
        VehicleMessage::Doors(DoorState::from_closed(self.doors_closed))
    }

    /// Flips the head lights
    pub fn toggle_lights(&mut self) -> VehicleMessage {
        self.lights_on = !self.lights_on;
        VehicleMessage::HeadLights(LightState::from_on(self.lights_on))
    }

    /// Starts blinking `side` when dark, otherwise (or on `cancel`) turns the lamps off
    pub fn indicator_intent(&mut self, side: IndicatorSide, cancel: bool) -> VehicleMessage {
        if !self.indicator_blinking && !cancel {
            self.indicator_blinking = true;
            side.lit()
        } else {
            self.indicator_blinking = false;
            INDICATORS_OFF
        }
    }

    /// Toggles the lamps of `side` if the blink interval passed since the last toggle
    pub fn blink(&mut self, side: IndicatorSide, now: Instant) -> Option<VehicleMessage> {
        if elapsed(self.last_indicator_toggle, now, BLINK_INTERVAL) {
            self.last_indicator_toggle = now;
            Some(self.indicator_intent(side, false))
        } else {
            None
        }
    }

    /// Applies the pedals and returns the speed message of this tick
    pub fn advance(&mut self) -> VehicleMessage {
        self.speed = advance_speed(self.pedals.accelerate, self.pedals.brake, self.speed);
        VehicleMessage::Speed {
            kmh: wire_speed(self.speed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accelerate() {
        assert_eq!(advance_speed(0.5, 0.0, 10.0), 10.125);
        assert_eq!(advance_speed(1.0, 0.5, 0.0), 0.25);
        // accelerating works below zero too
        assert_eq!(advance_speed(1.0, 0.0, -2.0), -1.75);
    }

    #[test]
    fn brake() {
        assert_eq!(advance_speed(0.0, 0.5, 10.0), 9.75);
        // brake wins when at least as strong as the throttle
        assert_eq!(advance_speed(0.5, 0.5, 10.0), 9.75);
        // braking may push below zero
        assert_eq!(advance_speed(0.0, 1.0, 0.0), -0.5);
        // but not any further
        assert_eq!(advance_speed(0.0, 1.0, -0.5), -0.5);
    }

    #[test]
    fn coast() {
        assert!((advance_speed(0.0, 0.0, 1.0) - 0.95).abs() < 1e-12);
        assert!((advance_speed(0.0, 0.0, 0.0) + 0.05).abs() < 1e-12);
        assert_eq!(advance_speed(0.0, 0.0, -0.05), -0.05);
    }

    #[test]
    fn toggles() {
        let mut state = VehicleState::default();
        assert_eq!(
            state.toggle_lights(),
            VehicleMessage::HeadLights(LightState::On)
        );
        assert!(state.lights_on);
        assert_eq!(
            state.toggle_lights(),
            VehicleMessage::HeadLights(LightState::Off)
        );
        assert!(!state.lights_on);

        assert_eq!(state.toggle_lock(), VehicleMessage::Doors(DoorState::Open));
        assert!(!state.doors_closed);
        assert_eq!(state.toggle_lock(), VehicleMessage::Doors(DoorState::Closed));
    }

    #[test]
    fn indicator_intent() {
        let mut state = VehicleState::default();
        assert_eq!(
            state.indicator_intent(IndicatorSide::Left, false),
            VehicleMessage::TurnSignals {
                left: true,
                right: false
            }
        );
        assert!(state.indicator_blinking);
        assert_eq!(
            state.indicator_intent(IndicatorSide::Left, true),
            INDICATORS_OFF
        );
        assert!(!state.indicator_blinking);
        // cancel while dark stays dark
        assert_eq!(
            state.indicator_intent(IndicatorSide::Right, true),
            INDICATORS_OFF
        );
        assert_eq!(
            state.indicator_intent(IndicatorSide::Right, false),
            VehicleMessage::TurnSignals {
                left: false,
                right: true
            }
        );
    }

    #[test]
    fn blink_timing() {
        let mut state = VehicleState {
            last_indicator_toggle: Instant::from_ticks(10_000),
            ..VehicleState::default()
        };
        assert_eq!(
            state.blink(IndicatorSide::Left, Instant::from_ticks(10_499)),
            None
        );
        assert_eq!(state.last_indicator_toggle, Instant::from_ticks(10_000));
        assert_eq!(
            state.blink(IndicatorSide::Left, Instant::from_ticks(10_501)),
            Some(IndicatorSide::Left.lit())
        );
        assert_eq!(state.last_indicator_toggle, Instant::from_ticks(10_501));
        assert_eq!(
            state.blink(IndicatorSide::Left, Instant::from_ticks(11_002)),
            Some(INDICATORS_OFF)
        );
    }

    #[test]
    fn half_speeds_round_to_even() {
        // 0.375 + 0.125 lands on 0.5
        let mut state = VehicleState {
            speed: 0.375,
            pedals: Pedals {
                accelerate: 0.5,
                brake: 0.0,
            },
            ..VehicleState::default()
        };
        assert_eq!(state.advance(), VehicleMessage::Speed { kmh: 0.0 });
        state.speed = 1.375;
        assert_eq!(state.advance(), VehicleMessage::Speed { kmh: 2.0 });
        state.speed = 2.375;
        assert_eq!(state.advance(), VehicleMessage::Speed { kmh: 2.0 });
        assert_eq!(state.speed, 2.5);
    }

    #[test]
    fn speed_message_is_rounded() {
        let mut state = VehicleState {
            speed: 41.5,
            pedals: Pedals {
                accelerate: 1.0,
                brake: 0.0,
            },
            ..VehicleState::default()
        };
        assert_eq!(state.advance(), VehicleMessage::Speed { kmh: 42.0 });
        assert_eq!(state.speed, 41.75);
    }
}
