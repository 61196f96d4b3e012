//! Decision-vector transcription.
//!
//! The NLP works over a flat vector `z = [tf, x_0 .. x_N, u_0 .. u_{N-1}]`
//! with states and controls laid out row-major. Packing and unpacking are
//! pure and exactly inverse of each other; every off-by-one in the N vs
//! N + 1 knot counts funnels through this one seam, so it is validated and
//! tested in isolation from the optimizer.

use nalgebra::DVector;

use planarquad_core::{ControlVector, StateVector, CONTROL_DIM, STATE_DIM};

use crate::error::PlannerError;

/// Flat layout of one optimization problem's unknowns.
#[derive(Debug, Clone, Copy)]
pub struct Transcription {
    num_intervals: usize,
}

impl Transcription {
    pub fn new(num_intervals: usize) -> Self {
        Self { num_intervals }
    }

    pub fn num_intervals(&self) -> usize {
        self.num_intervals
    }

    /// Total decision-vector length: 1 + (N+1)·6 + N·2.
    pub fn dim(&self) -> usize {
        1 + (self.num_intervals + 1) * STATE_DIM + self.num_intervals * CONTROL_DIM
    }

    fn state_offset(&self, knot: usize) -> usize {
        1 + knot * STATE_DIM
    }

    fn control_offset(&self, knot: usize) -> usize {
        1 + (self.num_intervals + 1) * STATE_DIM + knot * CONTROL_DIM
    }

    /// Pack `(final_time, states, controls)` into a flat vector.
    pub fn pack(
        &self,
        final_time: f64,
        states: &[StateVector],
        controls: &[ControlVector],
    ) -> Result<DVector<f64>, PlannerError> {
        if states.len() != self.num_intervals + 1 || controls.len() != self.num_intervals {
            return Err(PlannerError::KnotCount {
                states: states.len(),
                controls: controls.len(),
            });
        }

        let mut z = DVector::zeros(self.dim());
        z[0] = final_time;
        for (i, state) in states.iter().enumerate() {
            z.rows_mut(self.state_offset(i), STATE_DIM).copy_from(state);
        }
        for (i, control) in controls.iter().enumerate() {
            z.rows_mut(self.control_offset(i), CONTROL_DIM)
                .copy_from(control);
        }
        Ok(z)
    }

    /// Unpack a flat vector back into `(final_time, states, controls)`.
    pub fn unpack(
        &self,
        z: &DVector<f64>,
    ) -> Result<(f64, Vec<StateVector>, Vec<ControlVector>), PlannerError> {
        if z.len() != self.dim() {
            return Err(PlannerError::DecisionDimension {
                expected: self.dim(),
                got: z.len(),
            });
        }

        let final_time = z[0];
        let states = (0..=self.num_intervals).map(|i| self.state(z, i)).collect();
        let controls = (0..self.num_intervals).map(|i| self.control(z, i)).collect();
        Ok((final_time, states, controls))
    }

    /// State knot `i` viewed out of a packed vector.
    ///
    /// The caller guarantees `z` has layout length; constraint closures use
    /// this on vectors produced by `pack`.
    pub fn state(&self, z: &DVector<f64>, knot: usize) -> StateVector {
        z.fixed_rows::<STATE_DIM>(self.state_offset(knot))
            .into_owned()
    }

    /// Control knot `i` viewed out of a packed vector.
    pub fn control(&self, z: &DVector<f64>, knot: usize) -> ControlVector {
        z.fixed_rows::<CONTROL_DIM>(self.control_offset(knot))
            .into_owned()
    }

    /// Box bounds in packed layout: `tf ≥ 0`, states free, controls in
    /// `[control_lower, control_upper]` componentwise.
    pub fn bounds(
        &self,
        control_lower: f64,
        control_upper: f64,
    ) -> (DVector<f64>, DVector<f64>) {
        let mut lower = DVector::from_element(self.dim(), f64::NEG_INFINITY);
        let mut upper = DVector::from_element(self.dim(), f64::INFINITY);

        lower[0] = 0.0;
        for i in 0..self.num_intervals {
            let offset = self.control_offset(i);
            for j in 0..CONTROL_DIM {
                lower[offset + j] = control_lower;
                upper[offset + j] = control_upper;
            }
        }
        (lower, upper)
    }
}
