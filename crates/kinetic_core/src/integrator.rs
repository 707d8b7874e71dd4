//! Numerical integrators
//!
//! Every integrator advances a `(position, velocity)` pair by `dt` given an
//! acceleration function `a(x, v)`. The same family drives physics bodies
//! (`Vec2`) and scalar springs (`f32`).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// A quantity an integrator can advance: closed under addition and scaling
pub trait Integrable: Copy + Add<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Integrable for T where T: Copy + Add<Output = T> + Mul<f32, Output = T> {}

/// Integration method
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Velocity first, then position. Cheap and stable enough for most scenes.
    #[default]
    SemiImplicitEuler,
    /// Velocity Verlet: second order, re-evaluates acceleration once per step
    Verlet,
    /// Classic fourth-order Runge-Kutta: four acceleration evaluations per step
    Rk4,
}

impl Integrator {
    /// Advance `x` and `v` by `dt` seconds
    pub fn advance<T, F>(&self, x: T, v: T, dt: f32, accel: F) -> (T, T)
    where
        T: Integrable,
        F: Fn(T, T) -> T,
    {
        match self {
            Integrator::SemiImplicitEuler => {
                let v_next = v + accel(x, v) * dt;
                (x + v_next * dt, v_next)
            }
            Integrator::Verlet => {
                let a = accel(x, v);
                let x_next = x + v * dt + a * (0.5 * dt * dt);
                // Predict velocity for velocity-dependent forces (damping)
                let v_pred = v + a * dt;
                let a_next = accel(x_next, v_pred);
                (x_next, v + (a + a_next) * (0.5 * dt))
            }
            Integrator::Rk4 => {
                let half = dt * 0.5;

                let k1_v = accel(x, v);
                let k1_x = v;

                let k2_v = accel(x + k1_x * half, v + k1_v * half);
                let k2_x = v + k1_v * half;

                let k3_v = accel(x + k2_x * half, v + k2_v * half);
                let k3_x = v + k2_v * half;

                let k4_v = accel(x + k3_x * dt, v + k3_v * dt);
                let k4_x = v + k3_v * dt;

                let sixth = dt / 6.0;
                let v_next = v + (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * sixth;
                let x_next = x + (k1_x + k2_x * 2.0 + k3_x * 2.0 + k4_x) * sixth;
                (x_next, v_next)
            }
        }
    }

    /// Number of acceleration evaluations per step
    pub fn cost(&self) -> u32 {
        match self {
            Integrator::SemiImplicitEuler => 1,
            Integrator::Verlet => 2,
            Integrator::Rk4 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;

    fn fall(integrator: Integrator, steps: usize, dt: f32) -> (f32, f32) {
        let mut x = 0.0f32;
        let mut v = 0.0f32;
        for _ in 0..steps {
            (x, v) = integrator.advance(x, v, dt, |_, _| 10.0);
        }
        (x, v)
    }

    #[test]
    fn test_constant_acceleration_velocity_exact() {
        for integrator in [Integrator::SemiImplicitEuler, Integrator::Verlet, Integrator::Rk4] {
            let (_, v) = fall(integrator, 100, 0.01);
            assert!((v - 10.0).abs() < 1e-3, "{integrator:?}: v = {v}");
        }
    }

    #[test]
    fn test_higher_order_position_exact() {
        // x = a t^2 / 2 = 5.0 after one second
        let (x_verlet, _) = fall(Integrator::Verlet, 100, 0.01);
        let (x_rk4, _) = fall(Integrator::Rk4, 100, 0.01);
        let (x_euler, _) = fall(Integrator::SemiImplicitEuler, 100, 0.01);
        assert!((x_verlet - 5.0).abs() < 1e-3);
        assert!((x_rk4 - 5.0).abs() < 1e-3);
        // Semi-implicit Euler overshoots by a dt * v / 2 term
        assert!(x_euler > 5.0 && x_euler < 5.1);
    }

    #[test]
    fn test_rk4_oscillator_conserves_energy() {
        // Undamped harmonic oscillator, k = m = 1
        let mut x = Vec2::new(1.0, 0.0);
        let mut v = Vec2::ZERO;
        for _ in 0..1000 {
            (x, v) = Integrator::Rk4.advance(x, v, 0.01, |x: Vec2, _| -x);
        }
        let energy = 0.5 * (x.length_squared() + v.length_squared());
        assert!((energy - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_cost() {
        assert!(Integrator::Rk4.cost() > Integrator::Verlet.cost());
        assert!(Integrator::Verlet.cost() > Integrator::SemiImplicitEuler.cost());
    }
}
