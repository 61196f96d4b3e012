use thiserror::Error;

/// Errors raised at the dynamics-model boundary.
#[derive(Debug, Error)]
pub enum DynamicsError {
    #[error("invalid state dimension: expected {expected}, got {got}")]
    StateDimension { expected: usize, got: usize },
    #[error("invalid control dimension: expected {expected}, got {got}")]
    ControlDimension { expected: usize, got: usize },
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
