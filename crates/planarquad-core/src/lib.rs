//! # Planarquad Core
//!
//! Dynamics library for a planar (2D) quadrotor: two rotors on a rigid bar,
//! moving in a vertical plane under gravity, thrust, and linear drag.
//!
//! ## Modules
//!
//! - [`math`]: single-step numerical integrators (RK4, Euler)
//! - [`dynamics`]: physical parameters, equations of motion, rate/saturation
//!   limited stepping, and closed-form linearization

pub mod dynamics;
pub mod error;
pub mod math;

use nalgebra::SVector;

/// State dimension: (x, y, theta, vx, vy, omega).
pub const STATE_DIM: usize = 6;

/// Control dimension: per-rotor thrusts (T1, T2).
pub const CONTROL_DIM: usize = 2;

/// State vector (x, y, theta, vx, vy, omega).
pub type StateVector = SVector<f64, STATE_DIM>;

/// Control vector (T1, T2).
pub type ControlVector = SVector<f64, CONTROL_DIM>;

pub use dynamics::{control_from_slice, state_from_slice, PlanarQuad, QuadParams};
pub use error::DynamicsError;
