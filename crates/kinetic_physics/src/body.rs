//! Rigid bodies
//!
//! A [`BodySpec`] is the plain-data description a host passes in; the world
//! validates it once and keeps its own [`Body`]. Hosts read bodies back as
//! [`BodyState`] snapshots.

use crate::shape::Shape;
use kinetic_core::{MotionError, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned body identifier, never reused within a world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub(crate) u64);

impl BodyId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

fn default_mass() -> f32 {
    1.0
}

fn default_restitution() -> f32 {
    0.2
}

fn default_friction() -> f32 {
    0.3
}

fn default_gravity_scale() -> f32 {
    1.0
}

/// Description of a body to create
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub shape: Shape,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub velocity: Vec2,
    /// Radians
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub angular_velocity: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default)]
    pub linear_damping: f32,
    #[serde(default)]
    pub angular_damping: f32,
    #[serde(default = "default_gravity_scale")]
    pub gravity_scale: f32,
    #[serde(default)]
    pub fixed_rotation: bool,
    #[serde(default)]
    pub is_static: bool,
}

impl BodySpec {
    /// A body moved by forces, gravity and contacts
    pub fn dynamic(shape: Shape) -> Self {
        Self {
            shape,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            angular_velocity: 0.0,
            mass: default_mass(),
            restitution: default_restitution(),
            friction: default_friction(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: default_gravity_scale(),
            fixed_rotation: false,
            is_static: false,
        }
    }

    /// An immovable body (floors, walls)
    pub fn fixed(shape: Shape) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(shape)
        }
    }

    pub fn with_position(mut self, position: impl Into<Vec2>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_velocity(mut self, velocity: impl Into<Vec2>) -> Self {
        self.velocity = velocity.into();
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Reject non-finite or non-physical values
    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        if !self.position.is_finite() {
            return Err(MotionError::validation("position", "expected finite components"));
        }
        if !self.velocity.is_finite() {
            return Err(MotionError::validation("velocity", "expected finite components"));
        }
        MotionError::ensure_finite("rotation", self.rotation)?;
        MotionError::ensure_finite("angular_velocity", self.angular_velocity)?;
        MotionError::ensure_positive("mass", self.mass)?;
        MotionError::ensure_non_negative("restitution", self.restitution)?;
        MotionError::ensure_non_negative("friction", self.friction)?;
        MotionError::ensure_non_negative("linear_damping", self.linear_damping)?;
        MotionError::ensure_non_negative("angular_damping", self.angular_damping)?;
        MotionError::ensure_finite("gravity_scale", self.gravity_scale)?;
        Ok(())
    }
}

/// Read-only view of a body handed to hosts
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BodyState {
    pub id: BodyId,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub sleeping: bool,
    pub is_static: bool,
}

/// A body owned by the world
#[derive(Clone, Debug)]
pub(crate) struct Body {
    pub id: BodyId,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub inv_mass: f32,
    pub inv_inertia: f32,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    pub is_static: bool,
    /// Accumulated force, cleared after each `step` call
    pub force: Vec2,
    pub sleeping: bool,
    pub sleep_timer_ms: f32,
    last_finite: (Vec2, f32),
}

impl Body {
    /// Build from a spec that already passed [`BodySpec::validate`]
    pub fn from_spec(id: BodyId, spec: &BodySpec) -> Self {
        let (inv_mass, inv_inertia) = if spec.is_static {
            (0.0, 0.0)
        } else {
            let inertia = spec.shape.moment_of_inertia(spec.mass);
            let inv_inertia = if spec.fixed_rotation || inertia <= 0.0 {
                0.0
            } else {
                1.0 / inertia
            };
            (1.0 / spec.mass, inv_inertia)
        };

        let velocity = if spec.is_static { Vec2::ZERO } else { spec.velocity };
        let angular_velocity = if spec.is_static || spec.fixed_rotation {
            0.0
        } else {
            spec.angular_velocity
        };

        Self {
            id,
            shape: spec.shape,
            position: spec.position,
            velocity,
            rotation: spec.rotation,
            angular_velocity,
            inv_mass,
            inv_inertia,
            restitution: spec.restitution,
            friction: spec.friction,
            linear_damping: spec.linear_damping,
            angular_damping: spec.angular_damping,
            gravity_scale: spec.gravity_scale,
            is_static: spec.is_static,
            force: Vec2::ZERO,
            sleeping: false,
            sleep_timer_ms: 0.0,
            last_finite: (spec.position, spec.rotation),
        }
    }

    /// Moves under integration this sub-step
    pub fn is_awake_dynamic(&self) -> bool {
        !self.is_static && !self.sleeping
    }

    /// Returns `true` if the body was asleep
    pub fn wake(&mut self) -> bool {
        if self.sleeping && !self.is_static {
            self.sleeping = false;
            self.sleep_timer_ms = 0.0;
            return true;
        }
        false
    }

    pub fn put_to_sleep(&mut self) {
        self.sleeping = true;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.rotation.is_finite()
            && self.angular_velocity.is_finite()
    }

    /// Remember the current pose, or restore the last good one if the state
    /// went non-finite. Returns `true` when a restore happened.
    pub fn checkpoint(&mut self) -> bool {
        if self.is_finite() {
            self.last_finite = (self.position, self.rotation);
            return false;
        }
        (self.position, self.rotation) = self.last_finite;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.force = Vec2::ZERO;
        true
    }

    /// Teleport, keeping the checkpoint in step
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.last_finite.0 = position;
    }

    /// Velocity of the material point at world offset `r` from the center
    pub fn point_velocity(&self, r: Vec2) -> Vec2 {
        self.velocity + Vec2::cross_scalar(self.angular_velocity, r)
    }

    /// Move by `correction` applied at world offset `r`, turning accordingly
    pub fn nudge(&mut self, correction: Vec2, r: Vec2) {
        self.position += correction * self.inv_mass;
        self.rotation += r.cross(correction) * self.inv_inertia;
    }

    /// Apply an impulse at world offset `r` from the center
    pub fn apply_impulse_at(&mut self, impulse: Vec2, r: Vec2) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += r.cross(impulse) * self.inv_inertia;
    }

    pub fn state(&self) -> BodyState {
        BodyState {
            id: self.id,
            shape: self.shape,
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
            angular_velocity: self.angular_velocity,
            sleeping: self.sleeping,
            is_static: self.is_static,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_validation() {
        let spec = BodySpec::dynamic(Shape::circle(10.0)).with_position((1.0, 2.0));
        assert!(spec.validate().is_ok());

        assert!(spec.with_position((f32::NAN, 0.0)).validate().is_err());
        assert!(spec.with_mass(f32::INFINITY).validate().is_err());
        assert!(spec.with_mass(0.0).validate().is_err());
        assert!(BodySpec::dynamic(Shape::circle(f32::NAN)).validate().is_err());
    }

    #[test]
    fn test_static_bodies_have_no_inverse_mass() {
        let body = Body::from_spec(
            BodyId(1),
            &BodySpec::fixed(Shape::rectangle(10.0, 10.0)).with_velocity((5.0, 0.0)),
        );
        assert_eq!(body.inv_mass, 0.0);
        assert_eq!(body.inv_inertia, 0.0);
        assert_eq!(body.velocity, Vec2::ZERO);
        assert!(!body.is_awake_dynamic());
    }

    #[test]
    fn test_fixed_rotation_ignores_torque() {
        let mut body = Body::from_spec(
            BodyId(1),
            &BodySpec::dynamic(Shape::circle(1.0)).with_fixed_rotation(true),
        );
        body.apply_impulse_at(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0));
        assert_eq!(body.angular_velocity, 0.0);
        assert_eq!(body.velocity, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_checkpoint_restores_last_finite_pose() {
        let mut body = Body::from_spec(
            BodyId(7),
            &BodySpec::dynamic(Shape::circle(1.0)).with_position((3.0, 4.0)),
        );
        assert!(!body.checkpoint());
        body.position = Vec2::new(f32::NAN, 0.0);
        body.velocity = Vec2::new(1.0, 1.0);
        assert!(body.checkpoint());
        assert_eq!(body.position, Vec2::new(3.0, 4.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_spec_from_toml_like_json() {
        let spec: BodySpec = serde_json::from_str(
            r#"{"shape":{"type":"circle","radius":10.0},"position":{"x":100.0,"y":0.0}}"#,
        )
        .unwrap();
        assert_eq!(spec.mass, 1.0);
        assert!(!spec.is_static);
        assert_eq!(spec.position, Vec2::new(100.0, 0.0));
    }
}
