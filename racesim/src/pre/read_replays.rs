use crate::core::replay::{ControlCode, ReplayRecord};
use anyhow::Context;
use helpers::general::InputValueError;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::convert::TryFrom;
use std::path::Path;
use std::rc::Rc;

/// parse_replay decodes one replay file. Line 1 is the car model id, line 2 the 1-based place,
/// then `<tick> <code>` lines until the `* <finish_time>` terminator.
pub fn parse_replay(content: &str) -> anyhow::Result<ReplayRecord> {
    let mut lines = content.lines().enumerate();

    let car_model = match lines.next() {
        Some((_, line)) => line
            .trim()
            .parse::<usize>()
            .context(format!("line 1: could not parse car model id {:?}", line))?,
        None => return Err(InputValueError::new("replay is empty").into()),
    };

    let place = match lines.next() {
        Some((_, line)) => line
            .trim()
            .parse::<usize>()
            .context(format!("line 2: could not parse place {:?}", line))?,
        None => return Err(InputValueError::new("replay ends before the place line").into()),
    };
    if place == 0 {
        return Err(InputValueError::new("line 2: places are 1-based").into());
    }

    let mut record = ReplayRecord::new(car_model, place - 1);
    let mut terminated = false;

    for (i, line) in lines {
        let line = line.trim();
        let line_no = i + 1;

        if terminated {
            if line.is_empty() {
                continue;
            }
            return Err(InputValueError::new(format!(
                "line {}: content after the '*' terminator",
                line_no
            ))
            .into());
        }

        if let Some(rest) = line.strip_prefix('*') {
            record.finish_time = rest
                .trim()
                .parse::<f64>()
                .context(format!("line {}: could not parse finish time {:?}", line_no, rest))?;
            if !record.finish_time.is_finite() || record.finish_time < 0.0 {
                return Err(InputValueError::new(format!(
                    "line {}: finish time {} is not a non-negative number",
                    line_no, record.finish_time
                ))
                .into());
            }
            terminated = true;
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(InputValueError::new(format!(
                "line {}: expected '<tick> <code>', found {:?}",
                line_no, line
            ))
            .into());
        }

        let tick = fields[0]
            .parse::<u64>()
            .context(format!("line {}: could not parse tick {:?}", line_no, fields[0]))?;
        let code = fields[1]
            .parse::<u8>()
            .context(format!("line {}: could not parse code {:?}", line_no, fields[1]))?;
        let code = ControlCode::try_from(code)
            .map_err(|e| InputValueError::new(format!("line {}: {}", line_no, e.msg)))?;

        record.push_event(tick, code);
    }

    if !terminated {
        return Err(InputValueError::new("missing '* <finish_time>' terminator").into());
    }

    Ok(record)
}

pub fn read_replay(filepath: &Path) -> anyhow::Result<ReplayRecord> {
    let content = std::fs::read_to_string(filepath).context(format!(
        "Failed to open replay file {}!",
        filepath.display()
    ))?;

    let mut record = parse_replay(&content).context(format!(
        "Failed to parse replay file {}!",
        filepath.display()
    ))?;
    record.source = filepath
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    Ok(record)
}

/// ReplayPool holds the valid replays bucketed by place.
#[derive(Debug, Clone, Default)]
pub struct ReplayPool {
    buckets: Vec<Vec<Rc<ReplayRecord>>>,
}

impl ReplayPool {
    pub fn new(no_places: usize) -> ReplayPool {
        ReplayPool {
            buckets: vec![vec![]; no_places],
        }
    }

    /// add puts the record into its place bucket. Records for places the pool does not know are
    /// rejected.
    pub fn add(&mut self, record: ReplayRecord) -> anyhow::Result<()> {
        let no_places = self.buckets.len();
        let bucket = self.buckets.get_mut(record.place).ok_or_else(|| {
            InputValueError::new(format!(
                "place {} is outside the {} places of the race",
                record.place + 1,
                no_places
            ))
        })?;
        bucket.push(Rc::new(record));
        Ok(())
    }

    pub fn bucket(&self, place: usize) -> &[Rc<ReplayRecord>] {
        self.buckets.get(place).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// choose picks one replay of the place uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, place: usize, rng: &mut R) -> Option<Rc<ReplayRecord>> {
        self.bucket(place).choose(rng).cloned()
    }
}

/// read_replay_dir loads every file of the directory into a pool. Malformed replays are skipped
/// with a warning.
pub fn read_replay_dir(dir: &Path, no_places: usize) -> anyhow::Result<ReplayPool> {
    let mut pool = ReplayPool::new(no_places);

    let mut paths = vec![];
    for entry in std::fs::read_dir(dir)
        .context(format!("Failed to list replay directory {}!", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    // directory order is platform dependent
    paths.sort();

    for path in paths.iter() {
        match read_replay(path).and_then(|record| pool.add(record)) {
            Ok(()) => {}
            Err(e) => warn!("Skipping replay {}: {:#}", path.display(), e),
        }
    }

    info!(
        "Loaded {} replays from {} ({} per place)",
        pool.len(),
        dir.display(),
        (0..no_places)
            .map(|p| pool.bucket(p).len().to_string())
            .collect::<Vec<String>>()
            .join("/")
    );
    Ok(pool)
}
