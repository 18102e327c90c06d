use anyhow::Context;
use helpers::general::InputValueError;
use nalgebra::Vector3;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// * `gate_half_width` - Half extent of a gate across the track (along the right vector)
/// * `gate_half_depth` - Half extent of a gate along the track (along the path direction)
/// * `finish_gate` - Index of the gate that closes a lap
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TrackPars {
    pub gate_half_width: f64,
    pub gate_half_depth: f64,
    pub finish_gate: usize,
}

impl Default for TrackPars {
    fn default() -> Self {
        TrackPars {
            gate_half_width: 5.0,
            gate_half_depth: 3.0,
            finish_gate: 17,
        }
    }
}

/// TrackGate is a quadrilateral swept from one centerline point towards the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGate {
    pub corners: [Vector3<f64>; 4],
}

impl TrackGate {
    /// Builds the gate at `p0` oriented towards `p1`. Returns `None` if both points coincide.
    fn from_segment(
        p0: &Vector3<f64>,
        p1: &Vector3<f64>,
        half_width: f64,
        half_depth: f64,
    ) -> Option<TrackGate> {
        let direction = (p1 - p0).try_normalize(f64::EPSILON)?;
        let up = Vector3::y();
        let right = up.cross(&direction);

        // canonical corners (x, z) of the unit square, scaled and rotated into the path frame
        let canonical = [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)];
        let mut corners = [Vector3::zeros(); 4];
        for (corner, (cx, cz)) in corners.iter_mut().zip(canonical.iter()) {
            *corner = p0 + right * (half_width * cx) - direction * (half_depth * cz);
        }

        Some(TrackGate { corners })
    }

    /// Ground plane bounding rectangle as `(min_x, max_x, min_z, max_z)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut b = (
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        );
        for c in self.corners.iter() {
            b.0 = b.0.min(c.x);
            b.1 = b.1.max(c.x);
            b.2 = b.2.min(c.z);
            b.3 = b.3.max(c.z);
        }
        b
    }

    /// contains tests the position against the bounding rectangle of the corners in the x/z plane
    /// (bounds inclusive). This over-reports near the corners of rotated gates.
    pub fn contains(&self, pos: &Vector3<f64>) -> bool {
        let (min_x, max_x, min_z, max_z) = self.bounds();
        min_x <= pos.x && pos.x <= max_x && min_z <= pos.z && pos.z <= max_z
    }

    pub fn centroid(&self) -> Vector3<f64> {
        self.corners.iter().sum::<Vector3<f64>>() / 4.0
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub gates: Vec<TrackGate>,
    pub finish_gate: usize,
}

impl Track {
    /// Builds one gate per consecutive pair of centerline points.
    pub fn new(centerline: &[Vector3<f64>], track_pars: &TrackPars) -> anyhow::Result<Track> {
        if centerline.len() < 2 {
            return Err(InputValueError::new(format!(
                "track path needs at least 2 points, found {}",
                centerline.len()
            ))
            .into());
        }

        let mut gates = Vec::with_capacity(centerline.len() - 1);
        for (i, pair) in centerline.windows(2).enumerate() {
            let gate = TrackGate::from_segment(
                &pair[0],
                &pair[1],
                track_pars.gate_half_width,
                track_pars.gate_half_depth,
            )
            .ok_or_else(|| {
                InputValueError::new(format!(
                    "track path points {} and {} coincide, no gate direction",
                    i,
                    i + 1
                ))
            })?;
            gates.push(gate);
        }

        if track_pars.finish_gate >= gates.len() {
            return Err(InputValueError::new(format!(
                "finish gate {} is outside the {} gates of the track",
                track_pars.finish_gate,
                gates.len()
            ))
            .into());
        }

        Ok(Track {
            gates,
            finish_gate: track_pars.finish_gate,
        })
    }

    pub fn no_gates(&self) -> usize {
        self.gates.len()
    }

    /// containing_gate returns the first gate (in path order) whose bounding rectangle contains
    /// the position. Overlapping gates resolve to the lower index.
    pub fn containing_gate(&self, pos: &Vector3<f64>) -> Option<usize> {
        self.gates.iter().position(|gate| gate.contains(pos))
    }
}

/// parse_track_path reads the centerline from `v <x> <y> <z>` records, other lines are ignored.
pub fn parse_track_path<R: BufRead>(reader: R) -> anyhow::Result<Vec<Vector3<f64>>> {
    let mut points = vec![];

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.starts_with('v') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 || fields[0] != "v" {
            return Err(InputValueError::new(format!(
                "line {}: expected 'v <x> <y> <z>', found {:?}",
                line_no + 1,
                line
            ))
            .into());
        }

        let mut coords = [0.0; 3];
        for (coord, field) in coords.iter_mut().zip(fields[1..].iter()) {
            *coord = field
                .parse::<f64>()
                .with_context(|| format!("line {}: could not parse {:?}", line_no + 1, field))?;
        }
        points.push(Vector3::new(coords[0], coords[1], coords[2]));
    }

    Ok(points)
}

pub fn read_track_path(filepath: &Path) -> anyhow::Result<Vec<Vector3<f64>>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open track path file {}!",
            filepath.display()
        ))?;

    parse_track_path(BufReader::new(fh)).context(format!(
        "Failed to parse track path file {}!",
        filepath.display()
    ))
}
