//! Mathematical utilities.

pub mod integrator;

pub use integrator::{euler, rk4};
