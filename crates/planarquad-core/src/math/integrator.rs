//! Single-step numerical integrators.
//!
//! Both integrators advance dx/dt = f(t, x) by one step of size `dt`.

use nalgebra::SVector;

/// Classical 4th-order Runge-Kutta step.
///
/// Evaluates the derivative at the current point, two midpoint estimates,
/// and the endpoint estimate, combined with weights (1/6, 1/3, 1/3, 1/6).
pub fn rk4<const N: usize, F>(x: &SVector<f64, N>, t: f64, dt: f64, f: F) -> SVector<f64, N>
where
    F: Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
{
    let k1 = f(t, x);
    let k2 = f(t + dt / 2.0, &(x + k1 * dt / 2.0));
    let k3 = f(t + dt / 2.0, &(x + k2 * dt / 2.0));
    let k4 = f(t + dt, &(x + k3 * dt));

    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Explicit Euler step (first-order).
///
/// Cheap and differentiable; accurate enough when the derivative is roughly
/// constant over the step.
pub fn euler<const N: usize, F>(x: &SVector<f64, N>, t: f64, dt: f64, f: F) -> SVector<f64, N>
where
    F: Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
{
    x + f(t, x) * dt
}
