use crate::core::replay::ReplayRecord;
use anyhow::Context;
use log::info;
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// format_replay serializes a record into the replay file format: car model, 1-based place, one
/// `<tick> <code>` line per toggle event and the `* <finish_time>` terminator.
pub fn format_replay(record: &ReplayRecord) -> anyhow::Result<String> {
    let mut content = String::new();
    writeln!(&mut content, "{}", record.car_model)?;
    writeln!(&mut content, "{}", record.place + 1)?;

    for (tick, codes) in record.events.iter() {
        for code in codes.iter() {
            writeln!(&mut content, "{} {}", tick, code.code())?;
        }
    }
    write!(&mut content, "* {}", record.finish_time)?;

    Ok(content)
}

/// write_replay stores the record as `record_<n>` in `dir`, `n` being the number of entries
/// already in the directory. Returns the path of the written file.
pub fn write_replay(dir: &Path, record: &ReplayRecord) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .context(format!("Failed to create replay directory {}!", dir.display()))?;

    let no_existing = std::fs::read_dir(dir)
        .context(format!("Failed to list replay directory {}!", dir.display()))?
        .count();
    let out_path = dir.join(format!("record_{}", no_existing));

    let mut file = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&out_path)
        .context(format!("Failed to create replay file {}!", out_path.display()))?;
    file.write_all(format_replay(record)?.as_bytes())?;
    file.flush()?;

    info!(
        "Replay with {} toggle events written to {}",
        record.no_events(),
        out_path.display()
    );
    Ok(out_path)
}
