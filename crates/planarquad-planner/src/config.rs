//! Planner configuration.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use planarquad_core::StateVector;

use crate::error::PlannerError;

/// Circular keep-out zone in the flight plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Center of the disk [m]
    pub center: Vector2<f64>,
    /// Disk radius [m]
    pub radius: f64,
}

impl Obstacle {
    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Self {
            center: Vector2::new(x, y),
            radius,
        }
    }

    /// Squared distance to the center minus squared radius.
    ///
    /// Non-negative exactly when `position` lies outside the disk; this is
    /// the inequality-constraint value used by the optimizer.
    pub fn squared_clearance(&self, position: &Vector2<f64>) -> f64 {
        (position - self.center).norm_squared() - self.radius * self.radius
    }
}

/// Boundary conditions and transcription settings for one optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Start state (x, y, theta, vx, vy, omega)
    pub start: StateVector,
    /// Goal state
    pub goal: StateVector,
    /// Number of discretization intervals N; states carry N + 1 knots
    pub num_intervals: usize,
    /// Seed value for the final-time decision variable [s]
    pub final_time_seed: f64,
    /// Keep-out zones baked into the problem
    pub obstacles: Vec<Obstacle>,
    /// Attach the obstacle inequality constraints to the solve.
    ///
    /// `false` reproduces a formulation where the clearance terms are built
    /// but never handed to the solver; keep it `true` unless you explicitly
    /// want that behavior.
    pub enforce_obstacles: bool,
    /// Turn solver nonconvergence into a hard error instead of a report.
    pub require_convergence: bool,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            start: StateVector::new(0.0, 5.0, 0.0, 0.0, 0.0, 0.0),
            goal: StateVector::new(10.0, 7.0, 0.0, 0.0, 0.0, 0.0),
            num_intervals: 50,
            final_time_seed: 10.0,
            obstacles: vec![Obstacle::circle(1.0, 4.0, 0.5), Obstacle::circle(3.0, 6.0, 0.5)],
            enforce_obstacles: true,
            require_convergence: false,
        }
    }
}

impl TrajectoryConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.num_intervals == 0 {
            return Err(PlannerError::InvalidConfig(
                "num_intervals must be at least 1".into(),
            ));
        }
        if !self.final_time_seed.is_finite() || self.final_time_seed <= 0.0 {
            return Err(PlannerError::InvalidConfig(format!(
                "final_time_seed must be positive, got {}",
                self.final_time_seed
            )));
        }
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if !obstacle.radius.is_finite() || obstacle.radius <= 0.0 {
                return Err(PlannerError::InvalidConfig(format!(
                    "obstacle {} has non-positive radius {}",
                    i, obstacle.radius
                )));
            }
        }
        Ok(())
    }
}

/// Tuning for the augmented-Lagrangian NLP solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Outer multiplier/penalty updates
    pub max_outer_iterations: usize,
    /// Projected-gradient steps per subproblem
    pub max_inner_iterations: usize,
    /// Initial quadratic-penalty weight
    pub initial_penalty: f64,
    /// Penalty growth factor between outer iterations
    pub penalty_growth: f64,
    /// Feasibility tolerance on the constraint violation norm
    pub constraint_tolerance: f64,
    /// Stationarity tolerance on the projected gradient norm
    pub gradient_tolerance: f64,
    /// Initial line-search step length
    pub initial_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 25,
            max_inner_iterations: 300,
            initial_penalty: 10.0,
            penalty_growth: 4.0,
            constraint_tolerance: 1e-4,
            gradient_tolerance: 1e-6,
            initial_step: 0.5,
        }
    }
}
