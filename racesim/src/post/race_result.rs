use helpers::general::{argsort, SortOrder};
use log::info;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// StandingEntry is one row of the final leaderboard.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StandingEntry {
    pub rank: u32,
    pub label: String,
    pub time_s: f64,
}

/// RaceStandings ranks all participants by ascending finish time. Equal times keep their input
/// order.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RaceStandings {
    pub entries: Vec<StandingEntry>,
}

impl RaceStandings {
    pub fn from_times(times: &[(String, f64)]) -> RaceStandings {
        let t: Vec<f64> = times.iter().map(|(_, time)| *time).collect();

        let entries = argsort(&t, SortOrder::Ascending)
            .into_iter()
            .enumerate()
            .map(|(i, idx)| StandingEntry {
                rank: i as u32 + 1,
                label: times[idx].0.to_owned(),
                time_s: times[idx].1,
            })
            .collect();

        RaceStandings { entries }
    }

    pub fn rank_of(&self, label: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.rank)
    }

    pub fn winner(&self) -> Option<&StandingEntry> {
        self.entries.first()
    }

    fn format_table(&self) -> Result<String, std::fmt::Error> {
        let mut table = String::new();
        writeln!(&mut table, "rank, {:<12}, time", "driver")?;
        for entry in self.entries.iter() {
            writeln!(
                &mut table,
                "{:4}, {:<12}, {:8.3}s",
                entry.rank, entry.label, entry.time_s
            )?;
        }
        Ok(table)
    }

    /// print_standings logs the leaderboard.
    pub fn print_standings(&self) -> anyhow::Result<()> {
        info!("RESULT: Standings\n{}", self.format_table()?);
        Ok(())
    }

    /// write_to_file writes the leaderboard as CSV (`rank,label,time_s`).
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        for entry in self.entries.iter() {
            writer.serialize(entry)?;
        }
        writer.flush()?;

        info!("Standings written to {}", path.display());
        Ok(())
    }
}
