pub mod car;
pub mod handle_race;
pub mod lap_tracker;
pub mod race;
pub mod replay;
pub mod track;
