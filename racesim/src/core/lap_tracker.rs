use serde::Deserialize;
use std::collections::HashSet;

/// * `tot_no_laps` - Number of laps that finish the race
/// * `lap_completion_pct` - (%) Share of all gates that must be visited before the finish gate
/// closes a lap
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct LapPars {
    pub tot_no_laps: u32,
    pub lap_completion_pct: u32,
}

impl Default for LapPars {
    fn default() -> Self {
        LapPars {
            tot_no_laps: 3,
            lap_completion_pct: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapEvent {
    LapCompleted(u32),
    RaceCompleted,
}

/// LapTracker counts laps from gate containment results. Gate coverage is order independent:
/// driving the track backwards still collects visited gates.
#[derive(Debug, Clone)]
pub struct LapTracker {
    no_gates: usize,
    finish_gate: usize,
    lap_pars: LapPars,
    visited: HashSet<usize>,
    compl_laps: u32,
    race_completed: bool,
}

impl LapTracker {
    pub fn new(no_gates: usize, finish_gate: usize, lap_pars: &LapPars) -> LapTracker {
        LapTracker {
            no_gates,
            finish_gate,
            lap_pars: *lap_pars,
            visited: HashSet::with_capacity(no_gates),
            compl_laps: 0,
            race_completed: false,
        }
    }

    /// update registers the gate the player currently is in. Once the race is completed further
    /// updates are ignored.
    pub fn update(&mut self, gate: usize) -> Option<LapEvent> {
        if self.race_completed {
            return None;
        }

        self.visited.insert(gate);

        if gate != self.finish_gate || !self.lap_coverage_reached() {
            return None;
        }

        self.compl_laps += 1;
        self.visited.clear();

        if self.compl_laps >= self.lap_pars.tot_no_laps {
            self.race_completed = true;
            Some(LapEvent::RaceCompleted)
        } else {
            Some(LapEvent::LapCompleted(self.compl_laps))
        }
    }

    fn lap_coverage_reached(&self) -> bool {
        self.visited.len() * 100 >= self.no_gates * self.lap_pars.lap_completion_pct as usize
    }

    pub fn get_compl_laps(&self) -> u32 {
        self.compl_laps
    }

    pub fn get_no_visited(&self) -> usize {
        self.visited.len()
    }

    pub fn is_race_completed(&self) -> bool {
        self.race_completed
    }
}
