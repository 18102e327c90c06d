use helpers::general::InputValueError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::rc::Rc;

/// Control codes as they appear in replay files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlCode {
    Accelerate = 0,
    Brake = 1,
    SteerLeft = 2,
    SteerRight = 3,
}

impl ControlCode {
    pub const ALL: [ControlCode; 4] = [
        ControlCode::Accelerate,
        ControlCode::Brake,
        ControlCode::SteerLeft,
        ControlCode::SteerRight,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ControlCode {
    type Error = InputValueError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ControlCode::Accelerate),
            1 => Ok(ControlCode::Brake),
            2 => Ok(ControlCode::SteerLeft),
            3 => Ok(ControlCode::SteerRight),
            _ => Err(InputValueError::new(format!(
                "control code must be in 0..=3, found {}",
                code
            ))),
        }
    }
}

/// Hold state of the four driving controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeldControls {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl HeldControls {
    pub fn is_held(&self, code: ControlCode) -> bool {
        match code {
            ControlCode::Accelerate => self.accelerate,
            ControlCode::Brake => self.brake,
            ControlCode::SteerLeft => self.steer_left,
            ControlCode::SteerRight => self.steer_right,
        }
    }

    pub fn toggle(&mut self, code: ControlCode) {
        let flag = match code {
            ControlCode::Accelerate => &mut self.accelerate,
            ControlCode::Brake => &mut self.brake,
            ControlCode::SteerLeft => &mut self.steer_left,
            ControlCode::SteerRight => &mut self.steer_right,
        };
        *flag = !*flag;
    }
}

/// ReplayRecord contains one recorded run.
/// * `car_model` - Car model id (index into the car types list)
/// * `place` - 0-based place bucket, i.e. the grid slot the run was recorded from minus one
/// * `finish_time` - (s) Race time of the recorded run
/// * `events` - Toggle events per tick, in file order
/// * `source` - File name the record was read from (if any)
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub car_model: usize,
    pub place: usize,
    pub finish_time: f64,
    pub events: BTreeMap<u64, Vec<ControlCode>>,
    pub source: Option<String>,
}

impl ReplayRecord {
    pub fn new(car_model: usize, place: usize) -> ReplayRecord {
        ReplayRecord {
            car_model,
            place,
            finish_time: 0.0,
            events: BTreeMap::new(),
            source: None,
        }
    }

    pub fn push_event(&mut self, tick: u64, code: ControlCode) {
        self.events.entry(tick).or_insert_with(Vec::new).push(code);
    }

    pub fn no_events(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}

/// ReplayScript plays a record back as hold states. Toggles are cumulative, so the state at a
/// tick is only reachable by applying every event up to it; going back in time restarts the
/// playback from tick 0.
#[derive(Debug, Clone)]
pub struct ReplayScript {
    record: Rc<ReplayRecord>,
    held: HeldControls,
    last_tick: Option<u64>,
}

impl ReplayScript {
    pub fn new(record: Rc<ReplayRecord>) -> ReplayScript {
        ReplayScript {
            record,
            held: HeldControls::default(),
            last_tick: None,
        }
    }

    /// held_controls_at returns the hold state after all events up to and including `tick`.
    /// Repeated queries for the same tick return the same state.
    pub fn held_controls_at(&mut self, tick: u64) -> HeldControls {
        let first_tick = match self.last_tick {
            Some(last) if tick == last => return self.held,
            Some(last) if tick > last => last + 1,
            Some(_) => {
                self.rewind();
                0
            }
            None => 0,
        };

        for (_, codes) in self.record.events.range(first_tick..=tick) {
            for code in codes.iter() {
                self.held.toggle(*code);
            }
        }
        self.last_tick = Some(tick);

        self.held
    }

    pub fn rewind(&mut self) {
        self.held = HeldControls::default();
        self.last_tick = None;
    }
}

/// ReplayRecorder turns per tick pressed states into toggle events. A toggle is logged whenever
/// the pressed state of a control differs from its last logged hold state.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    record: ReplayRecord,
    held: HeldControls,
}

impl ReplayRecorder {
    pub fn new(car_model: usize, place: usize) -> ReplayRecorder {
        ReplayRecorder {
            record: ReplayRecord::new(car_model, place),
            held: HeldControls::default(),
        }
    }

    pub fn observe(&mut self, tick: u64, pressed: &HeldControls) {
        for code in ControlCode::ALL.iter() {
            if pressed.is_held(*code) != self.held.is_held(*code) {
                self.held.toggle(*code);
                self.record.push_event(tick, *code);
            }
        }
    }

    pub fn finish(mut self, finish_time: f64) -> ReplayRecord {
        self.record.finish_time = finish_time;
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(events: &[(u64, u8)]) -> ReplayRecord {
        let mut record = ReplayRecord::new(1, 0);
        for (tick, code) in events.iter() {
            record.push_event(*tick, ControlCode::try_from(*code).unwrap());
        }
        record
    }

    #[test]
    fn rejects_unknown_control_code() {
        assert!(ControlCode::try_from(4).is_err());
        assert_eq!(ControlCode::try_from(2).unwrap(), ControlCode::SteerLeft);
    }

    #[test]
    fn toggles_persist_between_events() {
        let record = record_with(&[(5, 0), (9, 2), (12, 0)]);
        let mut script = ReplayScript::new(Rc::new(record));

        assert!(!script.held_controls_at(4).accelerate);
        assert!(script.held_controls_at(5).accelerate);
        assert!(script.held_controls_at(8).accelerate);

        let held = script.held_controls_at(10);
        assert!(held.accelerate && held.steer_left);

        let held = script.held_controls_at(12);
        assert!(!held.accelerate && held.steer_left);
    }

    #[test]
    fn repeated_query_is_idempotent() {
        let record = record_with(&[(3, 1)]);
        let mut script = ReplayScript::new(Rc::new(record));

        let first = script.held_controls_at(3);
        let second = script.held_controls_at(3);
        assert_eq!(first, second);
        assert!(second.brake);
    }

    #[test]
    fn double_toggle_in_one_tick_is_a_no_op() {
        let record = record_with(&[(2, 3), (2, 3)]);
        let mut script = ReplayScript::new(Rc::new(record));

        assert_eq!(script.held_controls_at(2), HeldControls::default());
    }

    #[test]
    fn skipping_ahead_applies_all_earlier_toggles() {
        let record = record_with(&[(1, 0), (2, 1), (3, 1), (4, 3)]);
        let mut script = ReplayScript::new(Rc::new(record));

        let held = script.held_controls_at(100);
        assert!(held.accelerate);
        assert!(!held.brake);
        assert!(held.steer_right);
    }

    #[test]
    fn querying_the_past_replays_from_the_start() {
        let record = record_with(&[(1, 0), (5, 0)]);
        let mut script = ReplayScript::new(Rc::new(record));

        assert!(!script.held_controls_at(6).accelerate);
        assert!(script.held_controls_at(3).accelerate);
    }

    #[test]
    fn last_representable_tick() {
        let record = record_with(&[(u64::MAX, 2)]);
        let mut script = ReplayScript::new(Rc::new(record));

        assert!(!script.held_controls_at(u64::MAX - 1).steer_left);
        assert!(script.held_controls_at(u64::MAX).steer_left);
        assert!(script.held_controls_at(u64::MAX).steer_left);
        assert!(!script.held_controls_at(0).steer_left);
    }

    #[test]
    fn recorder_logs_only_edges() {
        let mut recorder = ReplayRecorder::new(1, 2);
        let pressed = HeldControls {
            accelerate: true,
            ..Default::default()
        };

        recorder.observe(10, &pressed);
        recorder.observe(11, &pressed);
        recorder.observe(12, &pressed);
        recorder.observe(13, &HeldControls::default());

        let record = recorder.finish(42.5);
        assert_eq!(record.no_events(), 2);
        assert_eq!(record.events[&10], vec![ControlCode::Accelerate]);
        assert_eq!(record.events[&13], vec![ControlCode::Accelerate]);
        assert_eq!(record.place, 2);
        assert_eq!(record.finish_time, 42.5);
    }

    #[test]
    fn recorded_run_plays_back_the_pressed_states() {
        let inputs = [
            (0, true, false),
            (1, true, true),
            (2, false, true),
            (3, false, false),
            (4, true, false),
        ];
        let mut recorder = ReplayRecorder::new(0, 0);
        for (tick, acc, left) in inputs.iter() {
            recorder.observe(
                *tick,
                &HeldControls {
                    accelerate: *acc,
                    steer_left: *left,
                    ..Default::default()
                },
            );
        }

        let mut script = ReplayScript::new(Rc::new(recorder.finish(1.0)));
        for (tick, acc, left) in inputs.iter() {
            let held = script.held_controls_at(*tick);
            assert_eq!(held.accelerate, *acc);
            assert_eq!(held.steer_left, *left);
        }
    }
}
