//! World configuration

use kinetic_core::{Integrator, MotionError, Result, Vec2};
use serde::{Deserialize, Serialize};

/// Tunables for a [`World`](crate::World)
///
/// Gravity is in m/s^2 and converted with `pixels_per_meter`; every other
/// length is in host units (pixels) and every duration in seconds except
/// `sleep_time_threshold_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec2,
    pub pixels_per_meter: f32,
    /// Length of one internal sub-step, seconds
    pub fixed_time_step: f32,
    /// Sub-steps allowed per `step` call before excess time is dropped
    pub max_sub_steps: u32,
    pub integrator: Integrator,
    /// Solver passes over constraints and contacts per sub-step
    pub constraint_iterations: u32,
    pub sleep_enabled: bool,
    /// px/s
    pub sleep_linear_threshold: f32,
    /// rad/s
    pub sleep_angular_threshold: f32,
    pub sleep_time_threshold_ms: f32,
    /// Penetration tolerated before positional correction kicks in
    pub position_slop: f32,
    /// Fraction of the remaining penetration removed per sub-step
    pub position_correction: f32,
    /// Approach speed (px/s) below which contacts do not bounce
    pub restitution_threshold: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 9.81),
            pixels_per_meter: 100.0,
            fixed_time_step: 1.0 / 120.0,
            max_sub_steps: 8,
            integrator: Integrator::SemiImplicitEuler,
            constraint_iterations: 8,
            sleep_enabled: true,
            sleep_linear_threshold: 5.0,
            sleep_angular_threshold: 0.1,
            sleep_time_threshold_ms: 500.0,
            position_slop: 0.01,
            position_correction: 0.8,
            restitution_threshold: 30.0,
        }
    }
}

impl WorldConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_sleep(mut self, enabled: bool) -> Self {
        self.sleep_enabled = enabled;
        self
    }

    /// Gravity in px/s^2
    pub fn gravity_px(&self) -> Vec2 {
        self.gravity * self.pixels_per_meter
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gravity.is_finite() {
            return Err(MotionError::validation("gravity", "expected finite components"));
        }
        MotionError::ensure_positive("pixels_per_meter", self.pixels_per_meter)?;
        MotionError::ensure_positive("fixed_time_step", self.fixed_time_step)?;
        if self.max_sub_steps == 0 {
            return Err(MotionError::validation("max_sub_steps", "must be at least 1"));
        }
        if self.constraint_iterations == 0 {
            return Err(MotionError::validation("constraint_iterations", "must be at least 1"));
        }
        MotionError::ensure_non_negative("sleep_linear_threshold", self.sleep_linear_threshold)?;
        MotionError::ensure_non_negative("sleep_angular_threshold", self.sleep_angular_threshold)?;
        MotionError::ensure_non_negative("sleep_time_threshold_ms", self.sleep_time_threshold_ms)?;
        MotionError::ensure_non_negative("position_slop", self.position_slop)?;
        let correction = MotionError::ensure_non_negative("position_correction", self.position_correction)?;
        if correction > 1.0 {
            return Err(MotionError::validation(
                "position_correction",
                format!("must be within [0, 1], got {correction}"),
            ));
        }
        MotionError::ensure_non_negative("restitution_threshold", self.restitution_threshold)?;
        Ok(())
    }
}
