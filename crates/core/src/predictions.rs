//! Pose prediction tables.
//!
//! Predictions are stored as CSV with three header rows (`scorer`,
//! `bodyparts`, `coords`) followed by one row per frame. The first column is
//! the frame index; the remaining columns come in `x, y, likelihood` triples,
//! one triple per keypoint.

use std::io::Read;
use std::path::Path;

use crate::error::CoreError;

const COORDS: [&str; 3] = ["x", "y", "likelihood"];

/// One keypoint observation in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub likelihood: f64,
}

impl Observation {
    /// Whether the observation clears the likelihood threshold.
    pub fn is_confident(&self, likelihood_thresh: f64) -> bool {
        self.likelihood >= likelihood_thresh
    }
}

/// Parsed predictions: `frames[t][k]` is keypoint `k` in frame `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct PosePredictions {
    keypoints: Vec<String>,
    frames: Vec<Vec<Observation>>,
}

impl PosePredictions {
    pub fn new(keypoints: Vec<String>, frames: Vec<Vec<Observation>>) -> Self {
        Self { keypoints, frames }
    }

    pub fn keypoints(&self) -> &[String] {
        &self.keypoints
    }

    pub fn frames(&self) -> &[Vec<Observation>] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound {
                entity: "Predictions file",
                id: path.display().to_string(),
            },
            _ => CoreError::from(e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoreError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = csv.records();

        let mut next_header = |name: &str| -> Result<csv::StringRecord, CoreError> {
            records
                .next()
                .ok_or_else(|| CoreError::Validation(format!("missing '{name}' header row")))?
                .map_err(|e| CoreError::Validation(format!("malformed CSV: {e}")))
        };
        let _scorer = next_header("scorer")?;
        let bodyparts = next_header("bodyparts")?;
        let coords = next_header("coords")?;

        let width = coords.len();
        if width < 4 || (width - 1) % 3 != 0 {
            return Err(CoreError::Validation(format!(
                "expected an index column followed by x/y/likelihood triples, got {width} columns"
            )));
        }
        for (i, coord) in coords.iter().skip(1).enumerate() {
            let expected = COORDS[i % 3];
            if coord.trim() != expected {
                return Err(CoreError::Validation(format!(
                    "coords column {} is '{coord}', expected '{expected}'",
                    i + 1
                )));
            }
        }

        let keypoints: Vec<String> = (1..width)
            .step_by(3)
            .map(|col| bodyparts.get(col).unwrap_or_default().trim().to_string())
            .collect();

        let mut frames = Vec::new();
        for (row, record) in records.enumerate() {
            let record =
                record.map_err(|e| CoreError::Validation(format!("malformed CSV: {e}")))?;
            if record.len() != width {
                return Err(CoreError::Validation(format!(
                    "data row {row} has {} columns, expected {width}",
                    record.len()
                )));
            }
            let values: Vec<f64> = record.iter().skip(1).map(parse_cell).collect();
            frames.push(
                values
                    .chunks_exact(3)
                    .map(|c| Observation {
                        x: c[0],
                        y: c[1],
                        likelihood: c[2],
                    })
                    .collect(),
            );
        }

        Ok(Self { keypoints, frames })
    }
}

/// Empty or non-numeric cells become `NaN`.
fn parse_cell(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}
