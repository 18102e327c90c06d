use anyhow::Context;
use clap::Parser;
use flume::Receiver;
use log::{debug, info, warn};
use racesim::core::handle_race::{handle_race, TICK_RATE};
use racesim::core::race::{RacePhase, RaceSession, SimConstants};
use racesim::core::track::{read_track_path, Track};
use racesim::interfaces::input_interface::{
    Clock, InputSource, NoInput, ReplayInput, SystemClock, TickClock,
};
use racesim::interfaces::render_interface::RaceState;
use racesim::post::replay_log::write_replay;
use racesim::pre::read_replays::{read_replay, read_replay_dir};
use racesim::pre::read_sim_pars::{read_sim_constants, read_sim_pars};
use racesim::pre::sim_opts::SimOpts;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use std::thread;
use std::time::Instant;

/// run_hud consumes the render snapshots until the simulation drops the sender.
fn run_hud(rx: Receiver<RaceState>) {
    let mut last_phase = None;
    let mut last_lap = 0;

    for state in rx.iter() {
        if last_phase != Some(state.phase) {
            info!("HUD: {:?}", state.phase);
            last_phase = Some(state.phase);
        }
        if state.compl_laps != last_lap {
            last_lap = state.compl_laps;
            info!("HUD: lap {}/{}", (last_lap + 1).min(state.tot_no_laps), state.tot_no_laps);
        }

        if let Some(player) = state.vehicles.first() {
            debug!(
                "HUD: tick {:6}, pos ({:8.2}, {:8.2}), velocity {:7.2}{}{}",
                state.tick,
                player.position[0],
                player.position[2],
                player.velocity,
                if player.on_road { "" } else { ", off road" },
                if state.paused { ", PAUSED" } else { "" }
            );
        }

        if let Some(result) = &state.final_result {
            if let Some(winner) = result.winner() {
                info!("HUD: winner {} in {:.3}s", winner.label, winner.time_s);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if sim_opts.debug { "debug" } else { "info" }),
    )
    .init();

    // get simulation parameters
    info!("Reading options from {:?}", sim_opts.options_path);
    let sim_pars = read_sim_pars(&sim_opts.options_path)?;

    let sim_consts = match &sim_opts.constants_path {
        Some(constants_path) => {
            info!("Reading simulation constants from {:?}", constants_path);
            read_sim_constants(constants_path)?
        }
        None => SimConstants::default(),
    };

    let centerline = read_track_path(&sim_opts.track_path)?;
    let track = Track::new(&centerline, &sim_consts.track).context(format!(
        "Failed to build the track from {}!",
        sim_opts.track_path.display()
    ))?;
    info!(
        "Track with {} gates, finish gate {}, {} laps",
        track.no_gates(),
        track.finish_gate,
        sim_consts.laps.tot_no_laps
    );

    let seed = sim_opts.seed.unwrap_or_else(rand::random);
    info!("Using RNG seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    // wall clock only when a human is watching
    let clock: Box<dyn Clock> = if sim_opts.hud {
        Box::new(SystemClock::new())
    } else {
        Box::new(TickClock::new(1.0 / TICK_RATE))
    };

    let mut session = if sim_opts.record {
        RaceSession::new_recording(&sim_pars, &sim_consts, track, &mut rng, clock)?
    } else {
        let replay_pool = read_replay_dir(&sim_opts.replay_dir, sim_consts.no_opponents)?;
        RaceSession::new(&sim_pars, &sim_consts, track, &replay_pool, &mut rng, clock)?
    };

    let mut input: Box<dyn InputSource> = match &sim_opts.player_replay {
        Some(replay_path) => {
            info!("Player is driven by replay {:?}", replay_path);
            Box::new(ReplayInput::new(Rc::new(read_replay(replay_path)?)))
        }
        None => {
            if sim_opts.max_ticks.is_none() {
                warn!("Nobody drives the player and no tick limit is set, the race will not end!");
            }
            Box::new(NoInput)
        }
    };

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    let outcome = if !sim_opts.hud {
        handle_race(&mut session, input.as_mut(), None, 1.0, sim_opts.max_ticks)?
    } else {
        // snapshots are consumed in a separate thread, the session stays on this one
        let (tx, rx) = flume::unbounded();
        let hud = thread::spawn(move || run_hud(rx));

        let outcome = handle_race(
            &mut session,
            input.as_mut(),
            Some(&tx),
            sim_opts.realtime_factor,
            sim_opts.max_ticks,
        );
        drop(tx);
        hud.join()
            .map_err(|_| anyhow::anyhow!("HUD thread panicked!"))?;
        outcome?
    };

    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    match &outcome.standings {
        Some(standings) => {
            standings.print_standings()?;
            if let Some(standings_path) = &sim_opts.standings_path {
                standings.write_to_file(standings_path)?;
            }
        }
        None if outcome.exited => info!("Race left before the finish"),
        None => warn!(
            "Race not finished after {} ticks (phase {:?})",
            outcome.no_ticks,
            session.get_phase()
        ),
    }

    if let Some(record) = &outcome.recorded {
        write_replay(&sim_opts.replay_dir, record)?;
    } else if sim_opts.record && session.get_phase() != RacePhase::Finished {
        warn!("Run was not finished, nothing recorded");
    }

    Ok(())
}
