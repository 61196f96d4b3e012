use thiserror::Error;

/// Errors raised by the trajectory planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid decision-vector dimension: expected {expected}, got {got}")]
    DecisionDimension { expected: usize, got: usize },
    #[error("inconsistent knot counts: {states} states vs {controls} controls (states must be controls + 1)")]
    KnotCount { states: usize, controls: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
    #[error("optimization did not converge: {message}")]
    DidNotConverge { message: String },
}
