use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "racesim",
    about = "A tick based racing game core with replay driven opponents"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Activate the HUD - race will be simulated in real-time and snapshots are printed
    #[clap(long)]
    pub hud: bool,

    /// Record mode - race alone and store the run as a new replay
    #[clap(long)]
    pub record: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the options file (car types, car attributes, chosen car)
    #[clap(short, long, default_value = "options.txt")]
    pub options_path: PathBuf,

    /// Set path to the track centerline file (`v x y z` lines)
    #[clap(short, long, default_value = "models/track_path.obj")]
    pub track_path: PathBuf,

    /// Set path to the replays directory
    #[clap(long, default_value = "replays")]
    pub replay_dir: PathBuf,

    /// Set path to the simulation constants file (OPTIONAL: defaults are used if not set)
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Set path to a replay driving the player (OPTIONAL: nobody drives if not set)
    #[clap(short, long)]
    pub player_replay: Option<PathBuf>,

    /// Set seed of the random number generator (OPTIONAL: random seed if not set)
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Set maximum number of ticks to simulate (OPTIONAL)
    #[clap(short, long)]
    pub max_ticks: Option<u64>,

    /// Set real-time factor (only relevant with HUD)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set path of the standings CSV file (OPTIONAL)
    #[clap(short = 'w', long)]
    pub standings_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = SimOpts::try_parse_from(&["racesim"]).unwrap();

        assert!(!opts.record);
        assert_eq!(opts.options_path, PathBuf::from("options.txt"));
        assert_eq!(opts.replay_dir, PathBuf::from("replays"));
        assert!(opts.seed.is_none());
        assert_eq!(opts.realtime_factor, 1.0);
    }

    #[test]
    fn record_run() {
        let opts = SimOpts::try_parse_from(&[
            "racesim",
            "--record",
            "-p",
            "my_run",
            "-s",
            "42",
            "--max-ticks",
            "9000",
            "-w",
            "out/standings.csv",
        ])
        .unwrap();

        assert!(opts.record);
        assert_eq!(opts.player_replay, Some(PathBuf::from("my_run")));
        assert_eq!(opts.seed, Some(42));
        assert_eq!(opts.max_ticks, Some(9000));
        assert_eq!(opts.standings_path, Some(PathBuf::from("out/standings.csv")));
    }
}
