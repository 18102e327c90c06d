pub mod race_result;
pub mod replay_log;
