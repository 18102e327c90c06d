use crate::core::race::{RacePhase, RaceSession};
use crate::core::replay::ReplayRecord;
use crate::interfaces::input_interface::InputSource;
use crate::interfaces::render_interface::{RaceState, MAX_RENDER_UPDATE_FREQUENCY};
use crate::post::race_result::RaceStandings;
use anyhow::Context;
use flume::Sender;
use log::{debug, info, warn};
use std::thread::sleep;
use std::time::{Duration, Instant};

pub const TICK_RATE: f64 = 60.0;

/// * `standings` - Final standings, only set if the player finished the race
/// * `no_ticks` - Number of tick calls executed (paused ticks included)
/// * `exited` - Exit was requested through the pause or finish menu
/// * `recorded` - Recorded run, only set in record mode after finishing
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub standings: Option<RaceStandings>,
    pub player_time: Option<f64>,
    pub no_ticks: u64,
    pub exited: bool,
    pub recorded: Option<ReplayRecord>,
}

/// handle_race runs the session until the player finished, exit was requested or the tick limit
/// was reached. If a sender is inserted, the race is run in real-time and snapshots are published
/// for rendering.
pub fn handle_race(
    session: &mut RaceSession,
    input: &mut dyn InputSource,
    tx: Option<&Sender<RaceState>>,
    realtime_factor: f64,
    max_ticks: Option<u64>,
) -> anyhow::Result<RaceOutcome> {
    let ticks_per_update = ((TICK_RATE / MAX_RENDER_UPDATE_FREQUENCY).round() as u64).max(1);
    let t_tick_us = 1.0e6 / (TICK_RATE * realtime_factor);

    let mut no_ticks = 0u64;
    let mut last_printed_lap = 0u32;

    while session.get_phase() != RacePhase::Finished && !session.is_exit_requested() {
        if max_ticks.map_or(false, |max| no_ticks >= max) {
            warn!("Stopping the race at the tick limit of {} ticks", no_ticks);
            break;
        }

        let t_start = Instant::now();
        let player_input = input.poll(session.get_cur_tick() + 1);
        session.tick(&player_input);
        no_ticks += 1;

        if no_ticks % TICK_RATE as u64 == 0 {
            debug!(
                "Simulating... tick {}, race time {:.3}s, velocity {:.2}",
                session.get_cur_tick(),
                session.race_time(),
                session.player.velocity
            );
        }
        if session.get_compl_laps() > last_printed_lap {
            last_printed_lap = session.get_compl_laps();
            debug!("Player started lap {}", last_printed_lap + 1);
        }

        if let Some(tx) = tx {
            if no_ticks % ticks_per_update == 0 {
                tx.send(session.get_race_state())
                    .context("Failed to send race state to the renderer!")?;
            }

            // sleep until the tick is finished in real-time as well (calculation in us)
            let t_sleep = t_tick_us as i64 - t_start.elapsed().as_micros() as i64;
            if t_sleep > 0 {
                sleep(Duration::from_micros(t_sleep as u64));
            } else {
                warn!("Could not keep up with real-time at tick {}!", session.get_cur_tick());
            }
        }
    }

    // the final state carries the standings
    if let Some(tx) = tx {
        tx.send(session.get_race_state())
            .context("Failed to send final race state to the renderer!")?;
    }

    info!(
        "Race loop ended after {} ticks in phase {:?}",
        no_ticks,
        session.get_phase()
    );

    Ok(RaceOutcome {
        standings: session.get_standings().cloned(),
        player_time: session.get_player_time(),
        no_ticks,
        exited: session.is_exit_requested(),
        recorded: session.take_recorded(),
    })
}
