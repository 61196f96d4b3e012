//! Planar quadrotor model.
//!
//! Equations of motion for a two-rotor planar vehicle:
//!
//! ```text
//! ẋ  = vx
//! ẏ  = vy
//! θ̇  = ω
//! v̇x = (−(T1+T2) sin θ − Cd_v·vx) / m
//! v̇y = ( (T1+T2) cos θ − Cd_v·vy) / m − g
//! ω̇  = ( (T2−T1)·l − Cd_phi·ω ) / I
//! ```
//!
//! The model owns its forward-simulation state: current state, clock, and
//! the previously applied control (the rate-limiter memory). `ode`,
//! `step_euler`, and `jacobians` are pure; `step_rk4` and `clip_control`
//! mutate.

use nalgebra::{Matrix6, Matrix6x2};

use super::state_idx::{OMEGA, THETA, VX, VY};
use super::QuadParams;
use crate::math;
use crate::{ControlVector, StateVector};

/// Stateful planar quadrotor dynamics model.
///
/// One instance per independent rollout or optimization: the rate-limiter
/// memory is private mutable state with a single writer and must not be
/// shared across concurrent trajectory computations. Call [`PlanarQuad::reset`]
/// before reusing an instance.
#[derive(Debug, Clone)]
pub struct PlanarQuad {
    params: QuadParams,
    /// Current state, advanced by `step_rk4`.
    state: StateVector,
    /// Simulation clock [s].
    time: f64,
    /// Previously applied control; rate-limiter memory.
    prev_control: ControlVector,
}

impl PlanarQuad {
    pub fn new(params: QuadParams) -> Self {
        let prev_control = params.hover_control();
        Self {
            params,
            state: StateVector::zeros(),
            time: 0.0,
            prev_control,
        }
    }

    pub fn params(&self) -> &QuadParams {
        &self.params
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Last control actually applied by the limiter.
    pub fn previous_control(&self) -> &ControlVector {
        &self.prev_control
    }

    /// Reset for an independent rollout: clock to zero, state as given,
    /// rate-limiter memory back to the equilibrium control.
    pub fn reset(&mut self, state: StateVector) {
        self.state = state;
        self.time = 0.0;
        self.prev_control = self.params.hover_control();
    }

    /// Continuous-time state derivative.
    pub fn ode(&self, state: &StateVector, control: &ControlVector) -> StateVector {
        let p = &self.params;
        let theta = state[THETA];
        let (vx, vy, omega) = (state[VX], state[VY], state[OMEGA]);
        let (t1, t2) = (control[0], control[1]);
        let thrust = t1 + t2;

        StateVector::new(
            vx,
            vy,
            omega,
            (-thrust * theta.sin() - p.drag_v * vx) / p.mass,
            (thrust * theta.cos() - p.drag_v * vy) / p.mass - p.gravity,
            ((t2 - t1) * p.half_length - p.drag_phi * omega) / p.inertia,
        )
    }

    /// One explicit-Euler step.
    ///
    /// Pure; this is the defect integrator used by the trajectory
    /// optimizer's transcription, not the ground-truth stepper.
    pub fn step_euler(
        &self,
        state: &StateVector,
        control: &ControlVector,
        dt: f64,
    ) -> StateVector {
        math::euler(state, self.time, dt, |_t, x| self.ode(x, control))
    }

    /// Advance the internal state by one RK4 step.
    ///
    /// The requested control is passed through the rate/saturation limiter
    /// first; the limited value becomes the new rate-limiter memory and is
    /// held constant across the four derivative evaluations.
    pub fn step_rk4(&mut self, control: &ControlVector, dt: f64) -> StateVector {
        let applied = self.clip_control(control, dt);
        let next = math::rk4(&self.state, self.time, dt, |_t, x| self.ode(x, &applied));
        self.state = next;
        self.time += dt;
        next
    }

    /// Slew-rate and magnitude limiting, one actuator at a time.
    ///
    /// The applied value is clamped into the window the previous control can
    /// reach within `dt`, intersected with the absolute thrust bounds. Side
    /// effect: the result becomes the new previous control, so call this at
    /// most once per simulated step.
    pub fn clip_control(&mut self, requested: &ControlVector, dt: f64) -> ControlVector {
        let max_step = self.params.max_thrust_rate * dt;
        let hi_abs = self.params.max_thrust_per_rotor();
        let lo_abs = self.params.min_thrust_per_rotor();

        let mut applied = *requested;
        for i in 0..applied.len() {
            let hi = (self.prev_control[i] + max_step).min(hi_abs);
            let lo = (self.prev_control[i] - max_step).max(lo_abs);
            applied[i] = applied[i].clamp(lo, hi);
        }
        self.prev_control = applied;
        applied
    }

    /// Closed-form Jacobians (A, B) of the continuous dynamics at an
    /// operating point.
    ///
    /// Pure; consumed by downstream gain-scheduled / LQR controller design.
    pub fn jacobians(
        &self,
        state: &StateVector,
        control: &ControlVector,
    ) -> (Matrix6<f64>, Matrix6x2<f64>) {
        let p = &self.params;
        let (sin_t, cos_t) = state[THETA].sin_cos();
        let thrust = control[0] + control[1];

        let mut a = Matrix6::zeros();
        a[(0, VX)] = 1.0;
        a[(1, VY)] = 1.0;
        a[(2, OMEGA)] = 1.0;
        a[(VX, THETA)] = -thrust * cos_t / p.mass;
        a[(VX, VX)] = -p.drag_v / p.mass;
        a[(VY, THETA)] = -thrust * sin_t / p.mass;
        a[(VY, VY)] = -p.drag_v / p.mass;
        a[(OMEGA, OMEGA)] = -p.drag_phi / p.inertia;

        let mut b = Matrix6x2::zeros();
        b[(VX, 0)] = -sin_t / p.mass;
        b[(VX, 1)] = -sin_t / p.mass;
        b[(VY, 0)] = cos_t / p.mass;
        b[(VY, 1)] = cos_t / p.mass;
        b[(OMEGA, 0)] = -p.half_length / p.inertia;
        b[(OMEGA, 1)] = p.half_length / p.inertia;

        (a, b)
    }

    /// Roll out a control sequence with the limited RK4 stepper.
    ///
    /// Returns the visited states, starting with the current one.
    pub fn simulate(&mut self, controls: &[ControlVector], dt: f64) -> Vec<StateVector> {
        let mut trajectory = Vec::with_capacity(controls.len() + 1);
        trajectory.push(self.state);
        for control in controls {
            trajectory.push(self.step_rk4(control, dt));
        }
        trajectory
    }
}
