use crate::core::replay::{HeldControls, ReplayRecord, ReplayScript};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// PlayerInput is the state of the logical keys polled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    pub pause: bool,
    pub confirm: bool,
}

impl PlayerInput {
    pub fn controls(&self) -> HeldControls {
        HeldControls {
            accelerate: self.accelerate,
            brake: self.brake,
            steer_left: self.steer_left,
            steer_right: self.steer_right,
        }
    }
}

impl From<HeldControls> for PlayerInput {
    fn from(held: HeldControls) -> Self {
        PlayerInput {
            accelerate: held.accelerate,
            brake: held.brake,
            steer_left: held.steer_left,
            steer_right: held.steer_right,
            ..Default::default()
        }
    }
}

pub trait InputSource {
    fn poll(&mut self, tick: u64) -> PlayerInput;
}

/// Nobody at the wheel.
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self, _tick: u64) -> PlayerInput {
        PlayerInput::default()
    }
}

/// ReplayInput drives the player from a recorded run.
#[derive(Debug)]
pub struct ReplayInput {
    script: ReplayScript,
}

impl ReplayInput {
    pub fn new(record: Rc<ReplayRecord>) -> ReplayInput {
        ReplayInput {
            script: ReplayScript::new(record),
        }
    }
}

impl InputSource for ReplayInput {
    fn poll(&mut self, tick: u64) -> PlayerInput {
        PlayerInput::from(self.script.held_controls_at(tick))
    }
}

/// Clock provides wall time in seconds. The session calls `on_tick` once per tick call, paused
/// or not.
pub trait Clock: std::fmt::Debug {
    fn now(&self) -> f64;

    fn on_tick(&self) {}
}

#[derive(Debug)]
pub struct SystemClock {
    t_start: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            t_start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.t_start.elapsed().as_secs_f64()
    }
}

/// TickClock advances a fixed step per tick. Deterministic stand-in for the wall clock; clones
/// share the same time.
#[derive(Debug, Clone)]
pub struct TickClock {
    step: f64,
    t: Rc<Cell<f64>>,
}

impl TickClock {
    pub fn new(step: f64) -> TickClock {
        TickClock {
            step,
            t: Rc::new(Cell::new(0.0)),
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> f64 {
        self.t.get()
    }

    fn on_tick(&self) {
        self.t.set(self.t.get() + self.step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::ControlCode;
    use approx::assert_relative_eq;

    #[test]
    fn replay_input_holds_controls_between_toggles() {
        let mut record = ReplayRecord::new(0, 0);
        record.push_event(2, ControlCode::Brake);
        record.push_event(4, ControlCode::Brake);
        let mut input = ReplayInput::new(Rc::new(record));

        assert!(!input.poll(1).brake);
        assert!(input.poll(2).brake);
        assert!(input.poll(3).brake);
        assert!(!input.poll(4).brake);
        assert!(!input.poll(4).pause);
    }

    #[test]
    fn tick_clock_clones_share_time() {
        let clock = TickClock::new(0.5);
        let handle = clock.clone();

        clock.on_tick();
        clock.on_tick();
        assert_relative_eq!(handle.now(), 1.0);
    }
}
