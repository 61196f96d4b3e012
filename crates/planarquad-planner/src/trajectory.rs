//! Optimized trajectory value and reference interpolation.

use serde::{Deserialize, Serialize};

use planarquad_core::{ControlVector, StateVector};

use crate::error::PlannerError;

/// An optimized trajectory: final time, N + 1 state knots, N control knots.
///
/// Immutable once produced. Controls are piecewise-constant over each of the
/// N intervals, so the state sequence carries exactly one more knot than the
/// control sequence; `dt` is always derived from the final time, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    final_time: f64,
    states: Vec<StateVector>,
    controls: Vec<ControlVector>,
}

impl Trajectory {
    pub fn new(
        final_time: f64,
        states: Vec<StateVector>,
        controls: Vec<ControlVector>,
    ) -> Result<Self, PlannerError> {
        if states.len() != controls.len() + 1 {
            return Err(PlannerError::KnotCount {
                states: states.len(),
                controls: controls.len(),
            });
        }
        if !final_time.is_finite() || final_time < 0.0 {
            return Err(PlannerError::InvalidTrajectory(format!(
                "final time must be finite and non-negative, got {final_time}"
            )));
        }
        Ok(Self {
            final_time,
            states,
            controls,
        })
    }

    pub fn final_time(&self) -> f64 {
        self.final_time
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn controls(&self) -> &[ControlVector] {
        &self.controls
    }

    /// Number of discretization intervals N.
    pub fn num_intervals(&self) -> usize {
        self.controls.len()
    }

    /// Interval length, derived from the final time.
    pub fn dt(&self) -> f64 {
        self.final_time / self.num_intervals() as f64
    }

    /// Knot timestamps `i · dt` for every state knot.
    pub fn knot_times(&self) -> Vec<f64> {
        let dt = self.dt();
        (0..=self.num_intervals()).map(|i| i as f64 * dt).collect()
    }

    /// Timestamps of the persisted table: N samples spanning `[0, tf]`.
    ///
    /// This matches the row layout written by the store, which drops the
    /// final state knot and restamps the remaining N rows uniformly.
    pub fn sample_times(&self) -> Vec<f64> {
        let n = self.num_intervals();
        match n {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => {
                let step = self.final_time / (n - 1) as f64;
                (0..n).map(|i| i as f64 * step).collect()
            }
        }
    }
}

/// Piecewise-linear reference signals reconstructed from trajectory samples.
///
/// Queries outside the sampled range clamp to the boundary sample instead of
/// failing, so downstream tracking controllers can keep asking for a
/// reference after the trajectory has formally ended.
#[derive(Debug, Clone)]
pub struct TrajectoryInterpolant {
    times: Vec<f64>,
    states: Vec<StateVector>,
    controls: Vec<ControlVector>,
}

impl TrajectoryInterpolant {
    pub fn new(
        times: Vec<f64>,
        states: Vec<StateVector>,
        controls: Vec<ControlVector>,
    ) -> Result<Self, PlannerError> {
        if times.is_empty() {
            return Err(PlannerError::InvalidTrajectory(
                "interpolant needs at least one sample".into(),
            ));
        }
        if times.len() != states.len() || times.len() != controls.len() {
            return Err(PlannerError::InvalidTrajectory(format!(
                "sample count mismatch: {} times, {} states, {} controls",
                times.len(),
                states.len(),
                controls.len()
            )));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PlannerError::InvalidTrajectory(
                "timestamps must be strictly increasing".into(),
            ));
        }
        Ok(Self {
            times,
            states,
            controls,
        })
    }

    /// Build the reference signals from an optimized trajectory, using the
    /// same sampling as the persisted table.
    pub fn from_trajectory(trajectory: &Trajectory) -> Result<Self, PlannerError> {
        let n = trajectory.num_intervals();
        Self::new(
            trajectory.sample_times(),
            trajectory.states()[..n].to_vec(),
            trajectory.controls().to_vec(),
        )
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn controls(&self) -> &[ControlVector] {
        &self.controls
    }

    /// Last timestamp in the sample set.
    pub fn final_time(&self) -> f64 {
        *self.times.last().expect("interpolant is never empty")
    }

    /// Reference state at time `t`, clamped to the sampled range.
    pub fn state_at(&self, t: f64) -> StateVector {
        match self.bracket(t) {
            Bracket::Below => self.states[0],
            Bracket::Above => *self.states.last().expect("interpolant is never empty"),
            Bracket::Inside(k, alpha) => {
                self.states[k] + (self.states[k + 1] - self.states[k]) * alpha
            }
        }
    }

    /// Reference control at time `t`, clamped to the sampled range.
    pub fn control_at(&self, t: f64) -> ControlVector {
        match self.bracket(t) {
            Bracket::Below => self.controls[0],
            Bracket::Above => *self.controls.last().expect("interpolant is never empty"),
            Bracket::Inside(k, alpha) => {
                self.controls[k] + (self.controls[k + 1] - self.controls[k]) * alpha
            }
        }
    }

    fn bracket(&self, t: f64) -> Bracket {
        if t <= self.times[0] {
            return Bracket::Below;
        }
        if t >= self.final_time() {
            return Bracket::Above;
        }
        // times is strictly increasing, so the partition point exists.
        let upper = self.times.partition_point(|&ti| ti <= t);
        let k = upper - 1;
        let alpha = (t - self.times[k]) / (self.times[upper] - self.times[k]);
        Bracket::Inside(k, alpha)
    }
}

enum Bracket {
    Below,
    Above,
    Inside(usize, f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_trajectory() -> Trajectory {
        let states = (0..=4)
            .map(|i| StateVector::new(i as f64, 5.0, 0.0, 1.0, 0.0, 0.0))
            .collect();
        let controls = (0..4)
            .map(|i| ControlVector::new(12.0 + i as f64, 12.0 - i as f64))
            .collect();
        Trajectory::new(8.0, states, controls).unwrap()
    }

    #[test]
    fn knot_counts_are_enforced() {
        let states = vec![StateVector::zeros(); 4];
        let controls = vec![ControlVector::zeros(); 4];
        assert!(matches!(
            Trajectory::new(1.0, states, controls),
            Err(PlannerError::KnotCount {
                states: 4,
                controls: 4
            })
        ));
    }

    #[test]
    fn dt_is_derived_from_final_time() {
        let trajectory = ramp_trajectory();
        assert_relative_eq!(trajectory.dt(), 2.0);
        assert_eq!(trajectory.knot_times(), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        // Sample times span the same range with one fewer point.
        let samples = trajectory.sample_times();
        assert_eq!(samples.len(), 4);
        assert_relative_eq!(samples[0], 0.0);
        assert_relative_eq!(samples[3], 8.0);
    }

    #[test]
    fn interpolation_reproduces_samples_exactly() {
        let trajectory = ramp_trajectory();
        let interpolant = TrajectoryInterpolant::from_trajectory(&trajectory).unwrap();

        for (i, &t) in interpolant.times().iter().enumerate() {
            assert_eq!(interpolant.state_at(t), interpolant.states()[i]);
            assert_eq!(interpolant.control_at(t), interpolant.controls()[i]);
        }
    }

    #[test]
    fn interpolation_is_linear_between_samples() {
        let trajectory = ramp_trajectory();
        let interpolant = TrajectoryInterpolant::from_trajectory(&trajectory).unwrap();

        // Halfway between the first two samples.
        let t = 0.5 * (interpolant.times()[0] + interpolant.times()[1]);
        let state = interpolant.state_at(t);
        assert_relative_eq!(state[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn queries_clamp_outside_the_sampled_range() {
        let trajectory = ramp_trajectory();
        let interpolant = TrajectoryInterpolant::from_trajectory(&trajectory).unwrap();

        assert_eq!(interpolant.state_at(-1.0), interpolant.states()[0]);
        assert_eq!(
            interpolant.state_at(1e6),
            *interpolant.states().last().unwrap()
        );
        assert_eq!(
            interpolant.control_at(1e6),
            *interpolant.controls().last().unwrap()
        );
    }

    #[test]
    fn rejects_non_monotone_timestamps() {
        let times = vec![0.0, 2.0, 1.0];
        let states = vec![StateVector::zeros(); 3];
        let controls = vec![ControlVector::zeros(); 3];
        assert!(matches!(
            TrajectoryInterpolant::new(times, states, controls),
            Err(PlannerError::InvalidTrajectory(_))
        ));
    }
}
