//! Flat tabular trajectory persistence.
//!
//! One whitespace-delimited row per sample, no header:
//!
//! ```text
//! column 0      timestamp [s], starting at 0, strictly increasing
//! columns 1-6   state (x, y, theta, vx, vy, omega)
//! columns 7-8   control (T1, T2)
//! ```
//!
//! N rows are written for a trajectory with N + 1 state knots; the final
//! knot is dropped and readers reconstruct the final time from the last
//! timestamp present.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use planarquad_core::{control_from_slice, state_from_slice};

use crate::error::PlannerError;
use crate::trajectory::{Trajectory, TrajectoryInterpolant};

const COLUMNS: usize = 9;

/// Errors raised while persisting or loading a trajectory table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("row {line}: expected {expected} columns, got {got}")]
    MalformedRow {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("row {line}: unparseable number {value:?}")]
    MalformedNumber { line: usize, value: String },
    #[error("trajectory file holds no rows")]
    Empty,
    #[error(transparent)]
    Shape(#[from] planarquad_core::DynamicsError),
    #[error(transparent)]
    Invalid(#[from] PlannerError),
}

/// Write the trajectory table to any writer.
pub fn write_trajectory<W: Write>(writer: &mut W, trajectory: &Trajectory) -> Result<(), StoreError> {
    let times = trajectory.sample_times();
    let mut row = String::new();
    for (i, &t) in times.iter().enumerate() {
        row.clear();
        let _ = write!(row, "{t}");
        for value in trajectory.states()[i].iter() {
            let _ = write!(row, " {value}");
        }
        for value in trajectory.controls()[i].iter() {
            let _ = write!(row, " {value}");
        }
        writeln!(writer, "{row}")?;
    }
    Ok(())
}

/// Read a trajectory table from any buffered reader.
///
/// Blank lines are skipped; everything else must be a full 9-column row.
pub fn read_trajectory<R: BufRead>(reader: R) -> Result<TrajectoryInterpolant, StoreError> {
    let mut times = Vec::new();
    let mut states = Vec::new();
    let mut controls = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut row = [0.0_f64; COLUMNS];
        let mut count = 0;
        for field in trimmed.split_whitespace() {
            if count < COLUMNS {
                row[count] = field.parse().map_err(|_| StoreError::MalformedNumber {
                    line: index + 1,
                    value: field.to_string(),
                })?;
            }
            count += 1;
        }
        if count != COLUMNS {
            return Err(StoreError::MalformedRow {
                line: index + 1,
                expected: COLUMNS,
                got: count,
            });
        }

        times.push(row[0]);
        states.push(state_from_slice(&row[1..7])?);
        controls.push(control_from_slice(&row[7..9])?);
    }

    if times.is_empty() {
        return Err(StoreError::Empty);
    }
    Ok(TrajectoryInterpolant::new(times, states, controls)?)
}

/// Persist a trajectory to a file.
pub fn save_trajectory<P: AsRef<Path>>(path: P, trajectory: &Trajectory) -> Result<(), StoreError> {
    debug!(path = %path.as_ref().display(), rows = trajectory.num_intervals(), "saving trajectory");
    let mut file = File::create(path)?;
    write_trajectory(&mut file, trajectory)
}

/// Load a trajectory table from a file.
pub fn load_trajectory<P: AsRef<Path>>(path: P) -> Result<TrajectoryInterpolant, StoreError> {
    debug!(path = %path.as_ref().display(), "loading trajectory");
    let file = File::open(path)?;
    read_trajectory(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planarquad_core::{ControlVector, StateVector};

    fn sample_trajectory() -> Trajectory {
        let states = (0..=4)
            .map(|i| StateVector::new(i as f64 * 2.5, 5.0 + 0.5 * i as f64, 0.01, 1.0, 0.2, 0.0))
            .collect();
        let controls = (0..4)
            .map(|i| ControlVector::new(12.26 + 0.1 * i as f64, 12.26 - 0.1 * i as f64))
            .collect();
        Trajectory::new(8.0, states, controls).unwrap()
    }

    #[test]
    fn writes_one_row_per_interval_without_header() {
        let trajectory = sample_trajectory();
        let mut buffer = Vec::new();
        write_trajectory(&mut buffer, &trajectory).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        // Every row has the full 9 columns, first column starts at 0.
        for line in &lines {
            assert_eq!(line.split_whitespace().count(), 9);
        }
        assert!(lines[0].starts_with('0'));
    }

    #[test]
    fn round_trip_preserves_samples_exactly() {
        let trajectory = sample_trajectory();
        let mut buffer = Vec::new();
        write_trajectory(&mut buffer, &trajectory).unwrap();

        let loaded = read_trajectory(buffer.as_slice()).unwrap();
        assert_eq!(loaded.times(), trajectory.sample_times().as_slice());
        assert_eq!(loaded.states(), &trajectory.states()[..4]);
        assert_eq!(loaded.controls(), trajectory.controls());
        // Final time reconstructs from the last timestamp.
        assert_eq!(loaded.final_time(), trajectory.final_time());
    }

    #[test]
    fn interpolated_queries_reproduce_and_clamp() {
        let trajectory = sample_trajectory();
        let mut buffer = Vec::new();
        write_trajectory(&mut buffer, &trajectory).unwrap();
        let loaded = read_trajectory(buffer.as_slice()).unwrap();

        for (i, &t) in loaded.times().iter().enumerate() {
            assert_eq!(loaded.state_at(t), loaded.states()[i]);
            assert_eq!(loaded.control_at(t), loaded.controls()[i]);
        }
        // Beyond the recorded range the last sample holds.
        assert_eq!(
            loaded.state_at(trajectory.final_time() + 5.0),
            *loaded.states().last().unwrap()
        );
    }

    #[test]
    fn rejects_short_rows() {
        let result = read_trajectory("0.0 1.0 2.0\n".as_bytes());
        assert!(matches!(
            result,
            Err(StoreError::MalformedRow {
                line: 1,
                expected: 9,
                got: 3
            })
        ));
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let row = "0.0 1 2 3 4 5 6 seven 8\n";
        assert!(matches!(
            read_trajectory(row.as_bytes()),
            Err(StoreError::MalformedNumber { line: 1, .. })
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(read_trajectory("".as_bytes()), Err(StoreError::Empty)));
        assert!(matches!(
            read_trajectory("\n  \n".as_bytes()),
            Err(StoreError::Empty)
        ));
    }
}
