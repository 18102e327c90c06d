use crate::core::car::{Car, Kinematic, KinematicPars};
use crate::core::lap_tracker::{LapEvent, LapPars, LapTracker};
use crate::core::replay::{ReplayRecord, ReplayRecorder, ReplayScript};
use crate::core::track::{Track, TrackPars};
use crate::interfaces::input_interface::{Clock, PlayerInput};
use crate::interfaces::render_interface::{RaceState, VehicleView};
use crate::post::race_result::RaceStandings;
use crate::pre::read_replays::ReplayPool;
use crate::pre::read_sim_pars::SimPars;
use helpers::general::InputValueError;
use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::Rng;
use serde::Deserialize;

pub const PLAYER_LABEL: &str = "You";

/// * `intro_ticks` - Ticks of the start sequence before any car moves
/// * `no_opponents` - Number of replay driven opponents (one per place bucket)
/// * `grid_positions` - Starting positions, slot 0 belongs to the player
/// * `start_rotation` - Starting rotation (pitch, yaw, roll) of all cars
/// * `track` - Gate geometry and finish gate
/// * `laps` - Lap counting parameters
/// * `kinematics` - Integration constants shared by all cars
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimConstants {
    pub intro_ticks: u64,
    pub no_opponents: usize,
    pub grid_positions: Vec<[f64; 3]>,
    pub start_rotation: [f64; 3],
    pub track: TrackPars,
    pub laps: LapPars,
    pub kinematics: KinematicPars,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            intro_ticks: 350,
            no_opponents: 3,
            grid_positions: vec![
                [23.0, 0.1, 29.0],
                [20.8, 0.1, 33.0],
                [17.5, 0.1, 25.9],
                [15.2, 0.1, 29.9],
            ],
            start_rotation: [0.0, 1.05, 0.0],
            track: TrackPars::default(),
            laps: LapPars::default(),
            kinematics: KinematicPars::default(),
        }
    }
}

impl SimConstants {
    fn grid_position(&self, slot: usize) -> anyhow::Result<Vector3<f64>> {
        let p = self.grid_positions.get(slot).ok_or_else(|| {
            InputValueError::new(format!(
                "no grid position for slot {} ({} configured)",
                slot,
                self.grid_positions.len()
            ))
        })?;
        Ok(Vector3::new(p[0], p[1], p[2]))
    }

    fn start_rotation(&self) -> Vector3<f64> {
        Vector3::new(
            self.start_rotation[0],
            self.start_rotation[1],
            self.start_rotation[2],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Starting, // start sequence, nothing moves
    Racing,
    Finished, // player completed all laps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChoice {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RaceEventKind {
    Started,
    Paused,
    Resumed,
    LapCompleted(u32),
    Finished,
    ExitRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceEvent {
    pub kind: RaceEventKind,
    pub tick: u64,
    pub time_s: f64,
}

/// Opponent is a car driven by a recorded run. Its finish time is the recorded one.
#[derive(Debug)]
pub struct Opponent {
    pub label: String,
    pub car: Car,
    script: ReplayScript,
    pub finish_time: f64,
}

#[derive(Debug)]
pub struct RaceSession {
    sim_consts: SimConstants,
    pub track: Track,
    pub player: Car,
    lap_tracker: LapTracker,
    pub opponents: Vec<Opponent>,
    phase: RacePhase,
    cur_tick: u64,
    paused: bool,
    pause_choice: PauseChoice,
    exit_requested: bool,
    clock: Box<dyn Clock>,
    t_start: f64,
    t_paused_total: f64,
    t_pause_began: f64,
    player_time: Option<f64>,
    standings: Option<RaceStandings>,
    recorder: Option<ReplayRecorder>,
    recorded: Option<ReplayRecord>,
    events: Vec<RaceEvent>,
}

impl RaceSession {
    /// new sets up a race against one randomly chosen replay per place bucket. Places without
    /// any replay stay empty.
    pub fn new<R: Rng + ?Sized>(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        track: Track,
        replay_pool: &ReplayPool,
        rng: &mut R,
        clock: Box<dyn Clock>,
    ) -> anyhow::Result<RaceSession> {
        let mut session = RaceSession::with_player(sim_pars, sim_consts, track, 0, clock)?;

        for place in 0..sim_consts.no_opponents {
            let record = match replay_pool.choose(place, rng) {
                Some(record) => record,
                None => {
                    warn!("No replay available for place {}, grid slot stays empty", place + 1);
                    continue;
                }
            };

            let (model_name, car_pars) = sim_pars.car_pars_for_model(record.car_model)?;
            let label = format!("Player {}", place + 2);
            info!(
                "{} drives a {} following replay {} ({:.3}s)",
                label,
                model_name,
                record.source.as_deref().unwrap_or("<memory>"),
                record.finish_time
            );

            let car = Car::new(
                record.car_model,
                model_name,
                &car_pars,
                &sim_consts.kinematics,
                sim_consts.grid_position(place + 1)?,
                sim_consts.start_rotation(),
            );

            session.opponents.push(Opponent {
                label,
                car,
                finish_time: record.finish_time,
                script: ReplayScript::new(record),
            });
        }

        Ok(session)
    }

    /// new_recording sets up a race without opponents that records the player's run. The player
    /// starts from a random opponent slot, which becomes the place of the recorded replay.
    pub fn new_recording<R: Rng + ?Sized>(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        track: Track,
        rng: &mut R,
        clock: Box<dyn Clock>,
    ) -> anyhow::Result<RaceSession> {
        if sim_consts.no_opponents == 0 {
            return Err(InputValueError::new("recording needs at least one opponent slot").into());
        }

        let slot = rng.gen_range(1..=sim_consts.no_opponents);
        let mut session = RaceSession::with_player(sim_pars, sim_consts, track, slot, clock)?;
        session.recorder = Some(ReplayRecorder::new(sim_pars.chosen_car, slot - 1));

        info!("Recording a run from grid slot {}", slot);
        Ok(session)
    }

    fn with_player(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        track: Track,
        slot: usize,
        clock: Box<dyn Clock>,
    ) -> anyhow::Result<RaceSession> {
        let (model_name, car_pars) = sim_pars.car_pars_for_model(sim_pars.chosen_car)?;
        let player = Car::new(
            sim_pars.chosen_car,
            model_name,
            &car_pars,
            &sim_consts.kinematics,
            sim_consts.grid_position(slot)?,
            sim_consts.start_rotation(),
        );

        let lap_tracker = LapTracker::new(track.no_gates(), track.finish_gate, &sim_consts.laps);
        let t_start = clock.now();

        Ok(RaceSession {
            sim_consts: sim_consts.clone(),
            track,
            player,
            lap_tracker,
            opponents: Vec::with_capacity(sim_consts.no_opponents),
            phase: RacePhase::Starting,
            cur_tick: 0,
            paused: false,
            pause_choice: PauseChoice::Exit,
            exit_requested: false,
            clock,
            t_start,
            t_paused_total: 0.0,
            t_pause_began: 0.0,
            player_time: None,
            standings: None,
            recorder: None,
            recorded: None,
            events: vec![],
        })
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// tick advances the session by one discrete time step.
    pub fn tick(&mut self, input: &PlayerInput) {
        self.clock.on_tick();
        self.cur_tick += 1;

        if self.phase == RacePhase::Starting {
            if self.cur_tick > self.sim_consts.intro_ticks {
                self.phase = RacePhase::Racing;
                self.push_event(RaceEventKind::Started);
                info!("GO! Race started at tick {}", self.cur_tick);
            }
            return;
        }

        if self.paused {
            // keep the tick counter aligned with the replays
            self.cur_tick -= 1;
            self.handle_pause_menu(input);
            return;
        }

        self.update_opponents();

        match self.phase {
            RacePhase::Racing => {
                self.apply_player_input(input);
                self.update_track_progress();
            }
            RacePhase::Finished => {
                if input.confirm && !self.exit_requested {
                    self.request_exit();
                }
                self.player.hit_brake();
            }
            RacePhase::Starting => {}
        }

        self.player.integrate();
    }

    // ---------------------------------------------------------------------------------------------
    // RACE SESSION PARTS --------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn update_opponents(&mut self) {
        for opponent in self.opponents.iter_mut() {
            let held = opponent.script.held_controls_at(self.cur_tick);
            opponent.car.apply_controls(&held);
            opponent.car.integrate();
        }
    }

    fn apply_player_input(&mut self, input: &PlayerInput) {
        let controls = input.controls();
        self.player.apply_controls(&controls);

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.observe(self.cur_tick, &controls);
        } else if input.pause {
            self.pause();
        }
    }

    /// Gate containment and lap counting, player only.
    fn update_track_progress(&mut self) {
        let pos = self.player.position();

        match self.track.containing_gate(&pos) {
            Some(gate) => {
                self.player.on_road = true;

                match self.lap_tracker.update(gate) {
                    Some(LapEvent::LapCompleted(lap)) => {
                        info!("Lap {} completed at tick {}", lap, self.cur_tick);
                        self.push_event(RaceEventKind::LapCompleted(lap));
                    }
                    Some(LapEvent::RaceCompleted) => {
                        self.push_event(RaceEventKind::LapCompleted(
                            self.lap_tracker.get_compl_laps(),
                        ));
                        self.finish_race();
                    }
                    None => {}
                }
            }
            None => {
                if self.player.on_road {
                    debug!("Player left the track at tick {}", self.cur_tick);
                }
                self.player.on_road = false;
            }
        }
    }

    fn finish_race(&mut self) {
        let player_time = self.race_time();
        self.player_time = Some(player_time);
        self.phase = RacePhase::Finished;

        let mut times: Vec<(String, f64)> = self
            .opponents
            .iter()
            .map(|opponent| (opponent.label.to_owned(), opponent.finish_time))
            .collect();
        times.push((PLAYER_LABEL.to_owned(), player_time));
        let standings = RaceStandings::from_times(&times);

        info!(
            "Race finished at tick {} in {:.3}s, rank {} of {}",
            self.cur_tick,
            player_time,
            standings.rank_of(PLAYER_LABEL).unwrap_or(0),
            standings.entries.len()
        );
        self.standings = Some(standings);

        if let Some(recorder) = self.recorder.take() {
            self.recorded = Some(recorder.finish(player_time));
        }

        self.push_event(RaceEventKind::Finished);
    }

    fn handle_pause_menu(&mut self, input: &PlayerInput) {
        if input.steer_left {
            self.pause_choice = PauseChoice::Continue;
        }
        if input.steer_right {
            self.pause_choice = PauseChoice::Exit;
        }
        if input.confirm {
            match self.pause_choice {
                PauseChoice::Continue => self.resume(),
                PauseChoice::Exit => self.request_exit(),
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// pause freezes the simulation. Only possible while racing and not while recording.
    pub fn pause(&mut self) {
        if self.paused || self.phase != RacePhase::Racing || self.recorder.is_some() {
            return;
        }
        self.paused = true;
        self.t_pause_began = self.clock.now();
        self.push_event(RaceEventKind::Paused);
        info!("Paused at tick {}", self.cur_tick);
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.t_paused_total += self.clock.now() - self.t_pause_began;
        self.paused = false;
        self.push_event(RaceEventKind::Resumed);
        info!("Resumed at tick {}", self.cur_tick);
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
        self.push_event(RaceEventKind::ExitRequested);
    }

    /// race_time is the wall time since session setup without paused time.
    pub fn race_time(&self) -> f64 {
        let t_paused_cur = if self.paused {
            self.clock.now() - self.t_pause_began
        } else {
            0.0
        };
        self.clock.now() - self.t_start - self.t_paused_total - t_paused_cur
    }

    fn push_event(&mut self, kind: RaceEventKind) {
        let time_s = self.race_time();
        self.events.push(RaceEvent {
            kind,
            tick: self.cur_tick,
            time_s,
        });
    }

    pub fn get_phase(&self) -> RacePhase {
        self.phase
    }

    pub fn get_cur_tick(&self) -> u64 {
        self.cur_tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn get_pause_choice(&self) -> PauseChoice {
        self.pause_choice
    }

    pub fn is_exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn get_compl_laps(&self) -> u32 {
        self.lap_tracker.get_compl_laps()
    }

    pub fn get_player_time(&self) -> Option<f64> {
        self.player_time
    }

    pub fn get_standings(&self) -> Option<&RaceStandings> {
        self.standings.as_ref()
    }

    pub fn get_events(&self) -> &[RaceEvent] {
        &self.events
    }

    /// take_recorded hands out the recorded run once the race is finished in record mode.
    pub fn take_recorded(&mut self) -> Option<ReplayRecord> {
        self.recorded.take()
    }

    pub fn get_race_state(&self) -> RaceState {
        let mut vehicles = Vec::with_capacity(self.opponents.len() + 1);
        vehicles.push(VehicleView::from_car(PLAYER_LABEL, &self.player));
        for opponent in self.opponents.iter() {
            vehicles.push(VehicleView::from_car(&opponent.label, &opponent.car));
        }

        RaceState {
            tick: self.cur_tick,
            phase: self.phase,
            paused: self.paused,
            compl_laps: self.lap_tracker.get_compl_laps(),
            tot_no_laps: self.sim_consts.laps.tot_no_laps,
            vehicles,
            final_result: self.standings.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::car::CarPars;
    use crate::core::replay::ControlCode;
    use crate::interfaces::input_interface::{InputSource, ReplayInput, TickClock};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::rc::Rc;

    pub const INTRO: u64 = 10;

    pub fn test_sim_pars() -> SimPars {
        let mut car_pars_all = HashMap::new();
        car_pars_all.insert(
            "bmw".to_owned(),
            CarPars {
                steering_speed: 0.02,
                acceleration: 2.0,
                brake_effectiveness: 1.0,
                top_speed: 6.0,
                friction: 0.97,
            },
        );
        SimPars {
            car_types: vec!["bmw".to_owned()],
            car_pars_all,
            chosen_car: 0,
            chosen_variant: "1".to_owned(),
        }
    }

    /// Straight track along +z, 20 contiguous gates, one lap ends at the last gate.
    pub fn test_sim_consts() -> SimConstants {
        SimConstants {
            intro_ticks: INTRO,
            no_opponents: 3,
            grid_positions: vec![[0.0, 0.1, 0.0]; 4],
            start_rotation: [0.0, 0.0, 0.0],
            track: TrackPars {
                finish_gate: 19,
                ..Default::default()
            },
            laps: LapPars {
                tot_no_laps: 1,
                ..Default::default()
            },
            kinematics: KinematicPars::default(),
        }
    }

    pub fn test_track(sim_consts: &SimConstants) -> Track {
        let path: Vec<Vector3<f64>> = (0..21)
            .map(|i| Vector3::new(0.0, 0.0, i as f64 * 6.0))
            .collect();
        Track::new(&path, &sim_consts.track).unwrap()
    }

    /// Accelerate from the first racing tick on.
    pub fn full_throttle_record(place: usize, finish_time: f64) -> ReplayRecord {
        let mut record = ReplayRecord::new(0, place);
        record.push_event(INTRO + 2, ControlCode::Accelerate);
        record.finish_time = finish_time;
        record
    }

    fn test_pool(times: &[f64]) -> ReplayPool {
        let mut pool = ReplayPool::new(3);
        for (place, t) in times.iter().enumerate() {
            pool.add(full_throttle_record(place, *t)).unwrap();
        }
        pool
    }

    fn test_session(pool: &ReplayPool, clock: TickClock) -> RaceSession {
        let sim_consts = test_sim_consts();
        let mut rng = StdRng::seed_from_u64(1);
        RaceSession::new(
            &test_sim_pars(),
            &sim_consts,
            test_track(&sim_consts),
            pool,
            &mut rng,
            Box::new(clock),
        )
        .unwrap()
    }

    fn run_until_finished(session: &mut RaceSession, input: &mut dyn InputSource) {
        for _ in 0..100_000 {
            if session.get_phase() == RacePhase::Finished {
                return;
            }
            let tick = session.get_cur_tick() + 1;
            let player_input = input.poll(tick);
            session.tick(&player_input);
        }
        panic!("race did not finish");
    }

    #[test]
    fn nothing_moves_during_the_intro() {
        let pool = test_pool(&[20.0, 30.0, 40.0]);
        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        let throttle = PlayerInput {
            accelerate: true,
            ..Default::default()
        };

        for _ in 0..INTRO {
            session.tick(&throttle);
            assert_eq!(session.get_phase(), RacePhase::Starting);
        }
        assert_eq!(session.player.gas, 0.0);

        session.tick(&throttle);
        assert_eq!(session.get_phase(), RacePhase::Racing);
        assert_eq!(session.player.position(), Vector3::new(0.0, 0.1, 0.0));

        session.tick(&throttle);
        assert!(session.player.velocity > 0.0);
        assert!(session.opponents.iter().all(|o| o.car.velocity > 0.0));
    }

    #[test]
    fn empty_place_buckets_leave_the_slot_empty() {
        let mut pool = ReplayPool::new(3);
        pool.add(full_throttle_record(1, 30.0)).unwrap();
        let session = test_session(&pool, TickClock::new(1.0 / 60.0));

        assert_eq!(session.opponents.len(), 1);
        assert_eq!(session.opponents[0].label, "Player 3");
    }

    #[test]
    fn missing_car_model_is_fatal() {
        let mut pool = ReplayPool::new(3);
        let mut record = full_throttle_record(0, 30.0);
        record.car_model = 5;
        pool.add(record).unwrap();

        let sim_consts = test_sim_consts();
        let mut rng = StdRng::seed_from_u64(1);
        let session = RaceSession::new(
            &test_sim_pars(),
            &sim_consts,
            test_track(&sim_consts),
            &pool,
            &mut rng,
            Box::new(TickClock::new(1.0)),
        );
        assert!(session.is_err());
    }

    #[test]
    fn full_race_produces_standings() {
        let pool = test_pool(&[1.0, 30.0, 1000.0]);
        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));

        run_until_finished(&mut session, &mut input);

        assert_eq!(session.get_compl_laps(), 1);
        let player_time = session.get_player_time().unwrap();
        assert_relative_eq!(
            player_time,
            session.get_cur_tick() as f64 / 60.0,
            epsilon = 1e-9
        );

        let standings = session.get_standings().unwrap();
        assert_eq!(standings.entries.len(), 4);
        assert_eq!(standings.rank_of("Player 2"), Some(1));
        assert_eq!(standings.rank_of("Player 4"), Some(4));
        assert_eq!(standings.rank_of(PLAYER_LABEL), Some(if player_time < 30.0 { 2 } else { 3 }));

        let kinds: Vec<&RaceEventKind> = session.get_events().iter().map(|e| &e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &RaceEventKind::Started,
                &RaceEventKind::LapCompleted(1),
                &RaceEventKind::Finished
            ]
        );
    }

    #[test]
    fn finished_player_brakes_and_confirm_requests_exit() {
        let pool = test_pool(&[1.0, 2.0, 3.0]);
        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));
        run_until_finished(&mut session, &mut input);

        let standings = session.get_standings().cloned();
        let v_finish = session.player.velocity;
        for _ in 0..50 {
            session.tick(&PlayerInput {
                accelerate: true,
                ..Default::default()
            });
        }
        assert!(session.player.velocity < v_finish);
        // standings are produced once
        assert_eq!(session.get_standings().cloned(), standings);
        assert!(!session.is_exit_requested());

        session.tick(&PlayerInput {
            confirm: true,
            ..Default::default()
        });
        assert!(session.is_exit_requested());
    }

    #[test]
    fn opponent_follows_its_replay_like_the_player() {
        // same car, same start, same inputs: the opponent retraces the player while on the road
        let mut pool = ReplayPool::new(3);
        pool.add(full_throttle_record(0, 10.0)).unwrap();
        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));

        while session.get_phase() != RacePhase::Finished {
            let player_input = input.poll(session.get_cur_tick() + 1);
            session.tick(&player_input);

            if session.get_phase() == RacePhase::Racing {
                let opponent = &session.opponents[0].car;
                assert_eq!(opponent.position(), session.player.position());
                assert_eq!(opponent.velocity, session.player.velocity);
            }
        }
    }

    #[test]
    fn pause_freezes_ticks_and_excludes_paused_time() {
        let pool = test_pool(&[20.0, 30.0, 40.0]);

        let mut reference = test_session(&pool, TickClock::new(1.0 / 60.0));
        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));
        run_until_finished(&mut reference, &mut input);

        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));
        for _ in 0..INTRO + 50 {
            let player_input = input.poll(session.get_cur_tick() + 1);
            session.tick(&player_input);
        }

        // the pausing tick still simulates, like any other racing tick
        let mut pausing = input.poll(session.get_cur_tick() + 1);
        pausing.pause = true;
        session.tick(&pausing);
        assert!(session.is_paused());

        let tick_paused = session.get_cur_tick();
        let pos_paused = session.player.position();
        let opp_paused = session.opponents[0].car.position();

        for _ in 0..120 {
            session.tick(&PlayerInput {
                accelerate: true,
                ..Default::default()
            });
        }
        assert_eq!(session.get_cur_tick(), tick_paused);
        assert_eq!(session.player.position(), pos_paused);
        assert_eq!(session.opponents[0].car.position(), opp_paused);

        // menu starts on "exit": move to "continue" first
        session.tick(&PlayerInput {
            steer_left: true,
            ..Default::default()
        });
        assert_eq!(session.get_pause_choice(), PauseChoice::Continue);
        session.tick(&PlayerInput {
            confirm: true,
            ..Default::default()
        });
        assert!(!session.is_paused());
        assert!(!session.is_exit_requested());

        run_until_finished(&mut session, &mut input);

        assert_eq!(session.get_cur_tick(), reference.get_cur_tick());
        assert_relative_eq!(
            session.get_player_time().unwrap(),
            reference.get_player_time().unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn pause_menu_exit() {
        let pool = test_pool(&[20.0, 30.0, 40.0]);
        let mut session = test_session(&pool, TickClock::new(1.0 / 60.0));
        for _ in 0..=INTRO {
            session.tick(&PlayerInput::default());
        }
        session.tick(&PlayerInput {
            pause: true,
            ..Default::default()
        });
        session.tick(&PlayerInput {
            confirm: true,
            ..Default::default()
        });

        assert!(session.is_exit_requested());
        assert_eq!(
            session.get_events().last().map(|e| &e.kind),
            Some(&RaceEventKind::ExitRequested)
        );
    }

    #[test]
    fn driving_off_the_track_switches_friction() {
        let pool = ReplayPool::new(3);
        let mut session = test_session(&pool, TickClock::new(1.0));
        for _ in 0..=INTRO {
            session.tick(&PlayerInput::default());
        }
        assert!(session.player.on_road);

        // steer hard and drive until the car leaves the 10 units wide gates
        let input = PlayerInput {
            accelerate: true,
            steer_left: true,
            ..Default::default()
        };
        for _ in 0..20_000 {
            session.tick(&input);
            if !session.player.on_road {
                break;
            }
        }
        assert!(!session.player.on_road);
        assert!(session.player.position().x.abs() > 5.0 || session.player.position().z < -3.0);
    }

    #[test]
    fn recording_captures_the_run() {
        let sim_consts = test_sim_consts();
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = RaceSession::new_recording(
            &test_sim_pars(),
            &sim_consts,
            test_track(&sim_consts),
            &mut rng,
            Box::new(TickClock::new(1.0 / 60.0)),
        )
        .unwrap();
        assert!(session.is_recording());
        assert!(session.opponents.is_empty());

        let mut input = ReplayInput::new(Rc::new(full_throttle_record(0, 0.0)));
        run_until_finished(&mut session, &mut input);

        let record = session.take_recorded().unwrap();
        assert!(record.place < 3);
        assert_eq!(record.car_model, 0);
        assert_eq!(record.events[&(INTRO + 2)], vec![ControlCode::Accelerate]);
        assert_eq!(record.no_events(), 1);
        assert_relative_eq!(record.finish_time, session.get_player_time().unwrap());
        assert!(session.take_recorded().is_none());
    }

    #[test]
    fn recording_ignores_pause() {
        let sim_consts = test_sim_consts();
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = RaceSession::new_recording(
            &test_sim_pars(),
            &sim_consts,
            test_track(&sim_consts),
            &mut rng,
            Box::new(TickClock::new(1.0)),
        )
        .unwrap();

        for _ in 0..INTRO + 5 {
            session.tick(&PlayerInput {
                pause: true,
                ..Default::default()
            });
        }
        assert!(!session.is_paused());
    }

    #[test]
    fn race_state_lists_player_first() {
        let pool = test_pool(&[20.0, 30.0, 40.0]);
        let session = test_session(&pool, TickClock::new(1.0));
        let state = session.get_race_state();

        assert_eq!(state.vehicles.len(), 4);
        assert_eq!(state.vehicles[0].label, PLAYER_LABEL);
        assert_eq!(state.vehicles[3].label, "Player 4");
        assert_eq!(state.phase, RacePhase::Starting);
        assert!(state.final_result.is_none());
    }
}
