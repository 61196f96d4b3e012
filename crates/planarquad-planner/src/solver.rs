//! Nonlinear-programming solver interface.
//!
//! The optimizer treats the solver as an opaque collaborator behind the
//! [`NlpSolve`] trait: a scalar cost, box bounds, vector-valued equality
//! constraints, and optional inequality constraints (`g(z) ≥ 0`) go in; a
//! candidate point, a status, and a diagnostic message come out. The
//! concrete method here is an augmented-Lagrangian outer loop around a
//! projected-gradient subproblem with numerically differenced gradients;
//! any implementation of the trait can replace it without touching the
//! problem formulation.

use nalgebra::DVector;
use tracing::debug;

use crate::config::SolverConfig;

/// One constrained minimization problem over a flat decision vector.
pub struct NlpProblem<'a> {
    /// Scalar objective
    pub cost: Box<dyn Fn(&DVector<f64>) -> f64 + 'a>,
    /// Vector-valued equality constraints, satisfied at `c(z) = 0`
    pub equality: Box<dyn Fn(&DVector<f64>) -> DVector<f64> + 'a>,
    /// Optional inequality constraints, satisfied at `g(z) ≥ 0`
    pub inequality: Option<Box<dyn Fn(&DVector<f64>) -> DVector<f64> + 'a>>,
    /// Componentwise lower bounds (may be −∞)
    pub lower: DVector<f64>,
    /// Componentwise upper bounds (may be +∞)
    pub upper: DVector<f64>,
    /// Starting point; projected onto the bounds before iterating
    pub initial_guess: DVector<f64>,
}

/// Terminal status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Constraint violation within tolerance at a stationary point
    Converged,
    /// Outer iteration budget exhausted before reaching feasibility
    MaxIterations,
    /// Line search could make no further progress
    Stalled,
}

impl SolverStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Converged)
    }
}

/// Best point found plus diagnostics.
#[derive(Debug, Clone)]
pub struct NlpSolution {
    pub point: DVector<f64>,
    pub status: SolverStatus,
    pub message: String,
    pub outer_iterations: usize,
    /// Infinity norm of the remaining constraint violation
    pub constraint_violation: f64,
}

/// Narrow solver contract consumed by the trajectory optimizer.
pub trait NlpSolve {
    fn solve(&self, problem: &NlpProblem<'_>) -> NlpSolution;
}

/// Augmented-Lagrangian solver with projected-gradient subproblems.
#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangian {
    pub config: SolverConfig,
}

impl AugmentedLagrangian {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Augmented merit: `f + λᵀc + (μ/2)‖c‖² + (μ/2)‖min(g, 0)‖²`.
    fn merit(
        problem: &NlpProblem<'_>,
        z: &DVector<f64>,
        lambda: &DVector<f64>,
        mu: f64,
    ) -> f64 {
        let c = (problem.equality)(z);
        let mut value = (problem.cost)(z) + lambda.dot(&c) + 0.5 * mu * c.norm_squared();
        if let Some(inequality) = &problem.inequality {
            let g = inequality(z);
            let violation: f64 = g.iter().map(|gi| gi.min(0.0).powi(2)).sum();
            value += 0.5 * mu * violation;
        }
        value
    }

    fn gradient(
        problem: &NlpProblem<'_>,
        z: &DVector<f64>,
        lambda: &DVector<f64>,
        mu: f64,
        f0: f64,
    ) -> DVector<f64> {
        let mut grad = DVector::zeros(z.len());
        let mut probe = z.clone();
        for i in 0..z.len() {
            let h = 1e-7 * (1.0 + z[i].abs());
            probe[i] = z[i] + h;
            grad[i] = (Self::merit(problem, &probe, lambda, mu) - f0) / h;
            probe[i] = z[i];
        }
        grad
    }

    /// Minimize the merit function over the box. Returns `true` when the
    /// line search stalled before the iteration budget ran out.
    fn minimize_subproblem(
        &self,
        problem: &NlpProblem<'_>,
        z: &mut DVector<f64>,
        lambda: &DVector<f64>,
        mu: f64,
    ) -> bool {
        let cfg = &self.config;
        for _ in 0..cfg.max_inner_iterations {
            let f0 = Self::merit(problem, z, lambda, mu);
            let grad = Self::gradient(problem, z, lambda, mu, f0);

            // Projected-gradient stationarity: a unit step that projection
            // undoes entirely means the point is as good as the box allows.
            let stationarity =
                (&*z - project(&(&*z - &grad), &problem.lower, &problem.upper)).norm();
            if stationarity <= cfg.gradient_tolerance {
                return false;
            }

            let mut step = cfg.initial_step;
            let mut accepted = false;
            while step > 1e-14 {
                let trial = project(&(&*z - &grad * step), &problem.lower, &problem.upper);
                if Self::merit(problem, &trial, lambda, mu) < f0 {
                    *z = trial;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }
            if !accepted {
                return true;
            }
        }
        false
    }
}

impl NlpSolve for AugmentedLagrangian {
    fn solve(&self, problem: &NlpProblem<'_>) -> NlpSolution {
        let cfg = &self.config;
        let mut z = project(&problem.initial_guess, &problem.lower, &problem.upper);

        let mut lambda = DVector::zeros((problem.equality)(&z).len());
        let mut mu = cfg.initial_penalty;
        let mut status = SolverStatus::MaxIterations;
        let mut outer_iterations = 0;

        for outer in 0..cfg.max_outer_iterations {
            outer_iterations = outer + 1;
            let stalled = self.minimize_subproblem(problem, &mut z, &lambda, mu);

            let c = (problem.equality)(&z);
            let violation = constraint_violation(problem, &z, &c);
            debug!(
                outer,
                penalty = mu,
                violation,
                cost = (problem.cost)(&z),
                "outer iteration"
            );

            if violation <= cfg.constraint_tolerance {
                status = SolverStatus::Converged;
                break;
            }
            if stalled {
                status = SolverStatus::Stalled;
                break;
            }

            // First-order multiplier update, then tighten the penalty.
            lambda += &c * mu;
            mu *= cfg.penalty_growth;
        }

        let c = (problem.equality)(&z);
        let constraint_violation = constraint_violation(problem, &z, &c);
        let message = match status {
            SolverStatus::Converged => format!(
                "converged: constraint violation {:.2e} within tolerance",
                constraint_violation
            ),
            SolverStatus::MaxIterations => format!(
                "maximum outer iterations reached, constraint violation {:.2e}",
                constraint_violation
            ),
            SolverStatus::Stalled => format!(
                "line search stalled, constraint violation {:.2e}",
                constraint_violation
            ),
        };

        NlpSolution {
            point: z,
            status,
            message,
            outer_iterations,
            constraint_violation,
        }
    }
}

fn project(z: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        z.len(),
        z.iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(zi, (lo, hi))| zi.clamp(*lo, *hi)),
    )
}

/// Infinity norm over equality residuals and inequality violations.
fn constraint_violation(problem: &NlpProblem<'_>, z: &DVector<f64>, c: &DVector<f64>) -> f64 {
    let mut violation = c.iter().fold(0.0_f64, |acc, ci| acc.max(ci.abs()));
    if let Some(inequality) = &problem.inequality {
        let g = inequality(z);
        violation = g.iter().fold(violation, |acc, gi| acc.max(-gi.min(0.0)));
    }
    violation
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solver() -> AugmentedLagrangian {
        AugmentedLagrangian::new(SolverConfig::default())
    }

    #[test]
    fn solves_equality_constrained_quadratic() {
        // min (x-3)² + (y+1)²  s.t.  x + y = 1; optimum at (2.5, -1.5).
        let problem = NlpProblem {
            cost: Box::new(|z| (z[0] - 3.0).powi(2) + (z[1] + 1.0).powi(2)),
            equality: Box::new(|z| DVector::from_vec(vec![z[0] + z[1] - 1.0])),
            inequality: None,
            lower: DVector::from_element(2, -5.0),
            upper: DVector::from_element(2, 5.0),
            initial_guess: DVector::zeros(2),
        };

        let solution = solver().solve(&problem);
        assert!(solution.status.is_success(), "{}", solution.message);
        assert_relative_eq!(solution.point[0], 2.5, epsilon = 1e-2);
        assert_relative_eq!(solution.point[1], -1.5, epsilon = 1e-2);
    }

    #[test]
    fn respects_active_inequality_constraint() {
        // min (x-2)²  s.t.  x - 3 ≥ 0; optimum on the constraint at x = 3.
        let problem = NlpProblem {
            cost: Box::new(|z| (z[0] - 2.0).powi(2)),
            equality: Box::new(|_| DVector::zeros(0)),
            inequality: Some(Box::new(|z| DVector::from_vec(vec![z[0] - 3.0]))),
            lower: DVector::from_element(1, -10.0),
            upper: DVector::from_element(1, 10.0),
            initial_guess: DVector::zeros(1),
        };

        let solution = solver().solve(&problem);
        assert!(solution.status.is_success(), "{}", solution.message);
        assert_relative_eq!(solution.point[0], 3.0, epsilon = 1e-2);
    }

    #[test]
    fn descends_to_a_box_bound() {
        // min x over [1, 2]: unconstrained otherwise, ends on the bound.
        let problem = NlpProblem {
            cost: Box::new(|z| z[0]),
            equality: Box::new(|_| DVector::zeros(0)),
            inequality: None,
            lower: DVector::from_element(1, 1.0),
            upper: DVector::from_element(1, 2.0),
            initial_guess: DVector::from_element(1, 1.7),
        };

        let solution = solver().solve(&problem);
        assert!(solution.status.is_success(), "{}", solution.message);
        assert_relative_eq!(solution.point[0], 1.0, epsilon = 1e-6);
    }
}
