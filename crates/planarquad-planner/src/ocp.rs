//! Problem assembly and the optimizer entry point.
//!
//! Builds the direct-transcription NLP — objective, defect and boundary
//! equalities, thrust box bounds, obstacle clearances — and hands it to an
//! [`NlpSolve`] collaborator. The dynamics model supplies `step_euler` as
//! the defect integrator.

use nalgebra::{DVector, Vector2};
use tracing::info;

use planarquad_core::{PlanarQuad, QuadParams, StateVector, CONTROL_DIM, STATE_DIM};

use crate::config::{SolverConfig, TrajectoryConfig};
use crate::error::PlannerError;
use crate::solver::{AugmentedLagrangian, NlpProblem, NlpSolve, SolverStatus};
use crate::trajectory::Trajectory;
use crate::transcription::Transcription;

/// Diagnostics surfaced from the underlying solve.
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    pub status: SolverStatus,
    pub message: String,
    pub outer_iterations: usize,
    pub constraint_violation: f64,
}

/// Minimum-time, minimum-effort trajectory optimizer between fixed start
/// and goal configurations.
pub struct TrajectoryOptimizer {
    model: PlanarQuad,
    config: TrajectoryConfig,
    solver_config: SolverConfig,
    transcription: Transcription,
}

impl TrajectoryOptimizer {
    pub fn new(params: QuadParams, config: TrajectoryConfig) -> Result<Self, PlannerError> {
        config.validate()?;
        let transcription = Transcription::new(config.num_intervals);
        Ok(Self {
            model: PlanarQuad::new(params),
            config,
            solver_config: SolverConfig::default(),
            transcription,
        })
    }

    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Seed point: nominal final time, straight-line states, hover controls.
    ///
    /// Dimensionally valid and inside the box bounds, nothing more; the
    /// defect constraints are violated everywhere the line bends through
    /// the dynamics.
    pub fn initial_guess(&self) -> Result<DVector<f64>, PlannerError> {
        let n = self.config.num_intervals;
        let states: Vec<StateVector> = (0..=n)
            .map(|i| {
                let alpha = i as f64 / n as f64;
                self.config.start + (self.config.goal - self.config.start) * alpha
            })
            .collect();
        let controls = vec![self.model.params().hover_control(); n];
        self.transcription
            .pack(self.config.final_time_seed, &states, &controls)
    }

    /// Objective: `tf + dt · Σ ‖u_k − u_hover‖²`.
    fn cost(&self, z: &DVector<f64>) -> f64 {
        let n = self.config.num_intervals;
        let final_time = z[0];
        let dt = final_time / n as f64;
        let hover = self.model.params().hover_control();

        let effort: f64 = (0..n)
            .map(|i| (self.transcription.control(z, i) - hover).norm_squared())
            .sum();
        final_time + dt * effort
    }

    /// Defect, boundary, and initial-control equality constraints, stacked.
    fn equality_constraints(&self, z: &DVector<f64>) -> DVector<f64> {
        let n = self.config.num_intervals;
        let tr = &self.transcription;
        let dt = z[0] / n as f64;

        let mut residuals = DVector::zeros(n * STATE_DIM + 2 * STATE_DIM + CONTROL_DIM);
        for i in 0..n {
            let predicted = self
                .model
                .step_euler(&tr.state(z, i), &tr.control(z, i), dt);
            let defect = tr.state(z, i + 1) - predicted;
            residuals.rows_mut(i * STATE_DIM, STATE_DIM).copy_from(&defect);
        }

        let boundary_offset = n * STATE_DIM;
        residuals
            .rows_mut(boundary_offset, STATE_DIM)
            .copy_from(&(tr.state(z, 0) - self.config.start));
        residuals
            .rows_mut(boundary_offset + STATE_DIM, STATE_DIM)
            .copy_from(&(tr.state(z, n) - self.config.goal));
        residuals
            .rows_mut(boundary_offset + 2 * STATE_DIM, CONTROL_DIM)
            .copy_from(&(tr.control(z, 0) - self.model.params().hover_control()));
        residuals
    }

    /// Per-knot squared clearance from every obstacle, `≥ 0` when outside.
    fn inequality_constraints(&self, z: &DVector<f64>) -> DVector<f64> {
        let n = self.config.num_intervals;
        let obstacles = &self.config.obstacles;

        let mut clearances = DVector::zeros(obstacles.len() * (n + 1));
        for (j, obstacle) in obstacles.iter().enumerate() {
            for i in 0..=n {
                let state = self.transcription.state(z, i);
                let position = Vector2::new(state[0], state[1]);
                clearances[j * (n + 1) + i] = obstacle.squared_clearance(&position);
            }
        }
        clearances
    }

    /// Solve with the built-in augmented-Lagrangian solver.
    pub fn optimize(&self) -> Result<(Trajectory, OptimizeReport), PlannerError> {
        let solver = AugmentedLagrangian::new(self.solver_config.clone());
        self.optimize_with(&solver)
    }

    /// Solve with any [`NlpSolve`] collaborator.
    ///
    /// The solver's raw status and message are surfaced in the report; the
    /// returned trajectory is the solver's best point even when it did not
    /// converge, unless `require_convergence` is set.
    pub fn optimize_with(
        &self,
        solver: &dyn NlpSolve,
    ) -> Result<(Trajectory, OptimizeReport), PlannerError> {
        let params = self.model.params();
        let (lower, upper) = self
            .transcription
            .bounds(params.min_thrust_per_rotor(), params.max_thrust_per_rotor());

        let attach_obstacles =
            self.config.enforce_obstacles && !self.config.obstacles.is_empty();
        let inequality: Option<Box<dyn Fn(&DVector<f64>) -> DVector<f64> + '_>> =
            if attach_obstacles {
                Some(Box::new(|z| self.inequality_constraints(z)))
            } else {
                None
            };
        let problem = NlpProblem {
            cost: Box::new(|z| self.cost(z)),
            equality: Box::new(|z| self.equality_constraints(z)),
            inequality,
            lower,
            upper,
            initial_guess: self.initial_guess()?,
        };

        let solution = solver.solve(&problem);
        info!(
            status = ?solution.status,
            outer_iterations = solution.outer_iterations,
            constraint_violation = solution.constraint_violation,
            "trajectory optimization finished"
        );

        if self.config.require_convergence && !solution.status.is_success() {
            return Err(PlannerError::DidNotConverge {
                message: solution.message,
            });
        }

        let (final_time, states, controls) = self.transcription.unpack(&solution.point)?;
        let trajectory = Trajectory::new(final_time, states, controls)?;
        let report = OptimizeReport {
            status: solution.status,
            message: solution.message,
            outer_iterations: solution.outer_iterations,
            constraint_violation: solution.constraint_violation,
        };
        Ok((trajectory, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn optimizer(config: TrajectoryConfig) -> TrajectoryOptimizer {
        TrajectoryOptimizer::new(QuadParams::default(), config).unwrap()
    }

    #[test]
    fn initial_guess_interpolates_boundaries() {
        let config = TrajectoryConfig {
            num_intervals: 10,
            ..TrajectoryConfig::default()
        };
        let opt = optimizer(config.clone());
        let z = opt.initial_guess().unwrap();
        let (tf, states, controls) = opt.transcription.unpack(&z).unwrap();

        assert_eq!(tf, config.final_time_seed);
        assert_eq!(states.len(), 11);
        assert_eq!(controls.len(), 10);
        assert_relative_eq!(states[0], config.start);
        assert_relative_eq!(states[10], config.goal);
        // Midpoint of the straight-line seed.
        assert_relative_eq!(states[5][0], 5.0, epsilon = 1e-12);
        let hover = opt.model.params().hover_control();
        for control in &controls {
            assert_relative_eq!(*control, hover);
        }
    }

    #[test]
    fn cost_at_hover_guess_is_the_time_seed() {
        let opt = optimizer(TrajectoryConfig::default());
        let z = opt.initial_guess().unwrap();
        assert_relative_eq!(opt.cost(&z), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn equality_residuals_have_fixed_layout() {
        let config = TrajectoryConfig {
            num_intervals: 4,
            ..TrajectoryConfig::default()
        };
        let opt = optimizer(config);
        let z = opt.initial_guess().unwrap();
        let residuals = opt.equality_constraints(&z);
        // 4 defects + start + goal boundaries + initial control.
        assert_eq!(residuals.len(), 4 * 6 + 2 * 6 + 2);
    }

    #[test]
    fn hover_guess_satisfies_all_constraints_when_stationary() {
        // Start == goal at rest: the straight-line/hover seed is feasible.
        let start = StateVector::new(8.0, 2.0, 0.0, 0.0, 0.0, 0.0);
        let config = TrajectoryConfig {
            start,
            goal: start,
            num_intervals: 6,
            ..TrajectoryConfig::default()
        };
        let opt = optimizer(config);
        let z = opt.initial_guess().unwrap();

        assert_relative_eq!(opt.equality_constraints(&z).norm(), 0.0, epsilon = 1e-9);
        assert!(opt.inequality_constraints(&z).iter().all(|&g| g > 0.0));
    }

    #[test]
    fn clearance_vector_covers_every_knot_and_obstacle() {
        let opt = optimizer(TrajectoryConfig::default());
        let z = opt.initial_guess().unwrap();
        let clearances = opt.inequality_constraints(&z);
        assert_eq!(clearances.len(), 2 * 51);

        // The default straight-line seed clips the (3, 6) obstacle, so the
        // guess starts infeasible with respect to clearance.
        assert!(clearances.iter().any(|&g| g < 0.0));
    }
}
