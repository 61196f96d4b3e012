use serde::{Deserialize, Serialize};

use crate::error::DynamicsError;
use crate::ControlVector;

/// Physical parameters of the planar quadrotor.
///
/// Immutable once constructed; [`QuadParams::new`] rejects non-physical
/// values so downstream code can rely on the derived thrust bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadParams {
    /// Mass [kg]
    pub mass: f64,
    /// Half-length of the airframe, rotor lever arm [m]
    pub half_length: f64,
    /// Gravitational acceleration [m/s²]
    pub gravity: f64,
    /// Moment of inertia about the out-of-plane axis [kg·m²]
    pub inertia: f64,
    /// Translational drag coefficient [N·s/m]
    pub drag_v: f64,
    /// Rotational drag coefficient [N·m·s]
    pub drag_phi: f64,
    /// Total thrust-to-weight ratio at full throttle
    pub thrust_to_weight: f64,
    /// Maximum per-rotor thrust slew rate [N/s]
    pub max_thrust_rate: f64,
}

impl QuadParams {
    /// Validate and construct a parameter set.
    pub fn new(
        mass: f64,
        half_length: f64,
        gravity: f64,
        inertia: f64,
        drag_v: f64,
        drag_phi: f64,
        thrust_to_weight: f64,
        max_thrust_rate: f64,
    ) -> Result<Self, DynamicsError> {
        let params = Self {
            mass,
            half_length,
            gravity,
            inertia,
            drag_v,
            drag_phi,
            thrust_to_weight,
            max_thrust_rate,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), DynamicsError> {
        let positive = [
            ("mass", self.mass),
            ("half_length", self.half_length),
            ("gravity", self.gravity),
            ("inertia", self.inertia),
            ("max_thrust_rate", self.max_thrust_rate),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DynamicsError::InvalidParameter { name, value });
            }
        }
        let non_negative = [("drag_v", self.drag_v), ("drag_phi", self.drag_phi)];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(DynamicsError::InvalidParameter { name, value });
            }
        }
        // Below 1.0 the vehicle cannot even hover.
        if !self.thrust_to_weight.is_finite() || self.thrust_to_weight <= 1.0 {
            return Err(DynamicsError::InvalidParameter {
                name: "thrust_to_weight",
                value: self.thrust_to_weight,
            });
        }
        Ok(())
    }

    /// Per-rotor thrust that exactly balances weight at level attitude [N].
    pub fn hover_thrust(&self) -> f64 {
        0.5 * self.mass * self.gravity
    }

    /// Equilibrium control: both rotors at hover thrust.
    pub fn hover_control(&self) -> ControlVector {
        ControlVector::repeat(self.hover_thrust())
    }

    /// Maximum thrust a single rotor can produce [N].
    pub fn max_thrust_per_rotor(&self) -> f64 {
        0.5 * self.thrust_to_weight * self.mass * self.gravity
    }

    /// Minimum thrust a single rotor can produce [N]; rotors cannot reverse.
    pub fn min_thrust_per_rotor(&self) -> f64 {
        0.0
    }
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            mass: 2.5,
            half_length: 1.0,
            gravity: 9.807,
            inertia: 1.0,
            drag_v: 0.25,
            drag_phi: 0.02255,
            thrust_to_weight: 1.5,
            max_thrust_rate: 40.0,
        }
    }
}
