pub mod read_replays;
pub mod read_sim_pars;
pub mod sim_opts;
