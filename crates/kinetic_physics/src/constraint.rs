//! Constraints between pairs of bodies
//!
//! Distance and hinge constraints are solved iteratively on positions with a
//! matching velocity correction. Spring constraints are soft: they add a
//! Hooke force computed by the animation crate's spring model.

use crate::body::{Body, BodyId};
use kinetic_animation::{spring_force, SpringConfig};
use kinetic_core::{MotionError, MotionPolicy, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned constraint identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(pub(crate) u64);

impl ConstraintId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// What a constraint enforces
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Anchors stay exactly `length` apart
    Distance { length: f32 },
    /// Anchors are pulled toward `rest_length` apart
    Spring {
        rest_length: f32,
        #[serde(default)]
        config: SpringConfig,
    },
    /// Anchors coincide; the relative rotation may be limited (radians)
    Hinge {
        #[serde(default)]
        min_angle: Option<f32>,
        #[serde(default)]
        max_angle: Option<f32>,
    },
}

impl ConstraintKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Distance { .. } => "distance",
            ConstraintKind::Spring { .. } => "spring",
            ConstraintKind::Hinge { .. } => "hinge",
        }
    }
}

/// Description of a constraint to create
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub kind: ConstraintKind,
    /// Attachment point in body A's local frame
    #[serde(default)]
    pub anchor_a: Vec2,
    #[serde(default)]
    pub anchor_b: Vec2,
    /// Let the two bodies collide with each other
    #[serde(default)]
    pub collide_connected: bool,
}

impl ConstraintSpec {
    pub fn new(body_a: BodyId, body_b: BodyId, kind: ConstraintKind) -> Self {
        Self {
            body_a,
            body_b,
            kind,
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            collide_connected: false,
        }
    }

    pub fn distance(body_a: BodyId, body_b: BodyId, length: f32) -> Self {
        Self::new(body_a, body_b, ConstraintKind::Distance { length })
    }

    pub fn spring(body_a: BodyId, body_b: BodyId, rest_length: f32, config: SpringConfig) -> Self {
        Self::new(body_a, body_b, ConstraintKind::Spring { rest_length, config })
    }

    pub fn hinge(body_a: BodyId, body_b: BodyId) -> Self {
        Self::new(
            body_a,
            body_b,
            ConstraintKind::Hinge {
                min_angle: None,
                max_angle: None,
            },
        )
    }

    pub fn with_anchors(mut self, anchor_a: impl Into<Vec2>, anchor_b: impl Into<Vec2>) -> Self {
        self.anchor_a = anchor_a.into();
        self.anchor_b = anchor_b.into();
        self
    }

    /// Limit a hinge's relative rotation; ignored by other kinds
    pub fn with_angle_limits(mut self, min: f32, max: f32) -> Self {
        if let ConstraintKind::Hinge {
            min_angle,
            max_angle,
        } = &mut self.kind
        {
            *min_angle = Some(min);
            *max_angle = Some(max);
        }
        self
    }

    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Reject malformed parameters. Body ids are checked by the world.
    pub fn validate(&self) -> Result<()> {
        if self.body_a == self.body_b {
            return Err(MotionError::validation(
                "constraint bodies",
                format!("{} cannot be constrained to itself", self.body_a),
            ));
        }
        if !self.anchor_a.is_finite() || !self.anchor_b.is_finite() {
            return Err(MotionError::validation("anchor", "expected finite components"));
        }
        match self.kind {
            ConstraintKind::Distance { length } => {
                MotionError::ensure_non_negative("length", length)?;
            }
            ConstraintKind::Spring {
                rest_length,
                config,
            } => {
                MotionError::ensure_non_negative("rest_length", rest_length)?;
                config.validate()?;
            }
            ConstraintKind::Hinge {
                min_angle,
                max_angle,
            } => {
                for angle in [min_angle, max_angle].into_iter().flatten() {
                    MotionError::ensure_finite("hinge angle", angle)?;
                }
                if let (Some(min), Some(max)) = (min_angle, max_angle) {
                    if min > max {
                        return Err(MotionError::validation(
                            "hinge angle",
                            format!("min {min} exceeds max {max}"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A constraint owned by the world
#[derive(Clone, Debug)]
pub(crate) struct Constraint {
    pub id: ConstraintId,
    pub spec: ConstraintSpec,
    /// Relative rotation at creation, the hinge's zero angle
    pub reference_angle: f32,
}

impl Constraint {
    pub fn new(id: ConstraintId, spec: ConstraintSpec, a: &Body, b: &Body) -> Self {
        Self {
            id,
            spec,
            reference_angle: b.rotation - a.rotation,
        }
    }

    pub fn involves(&self, body: BodyId) -> bool {
        self.spec.body_a == body || self.spec.body_b == body
    }

    pub fn connects(&self, x: BodyId, y: BodyId) -> bool {
        (self.spec.body_a == x && self.spec.body_b == y)
            || (self.spec.body_a == y && self.spec.body_b == x)
    }

    fn anchors(&self, a: &Body, b: &Body) -> (Vec2, Vec2) {
        (
            a.position + self.spec.anchor_a.rotate(a.rotation),
            b.position + self.spec.anchor_b.rotate(b.rotation),
        )
    }

    /// Apply soft forces for one sub-step of `dt` seconds
    pub fn apply_force(&self, a: &mut Body, b: &mut Body, policy: MotionPolicy, dt: f32) {
        let ConstraintKind::Spring {
            rest_length,
            config,
        } = self.spec.kind
        else {
            return;
        };
        let (wa, wb) = self.anchors(a, b);
        let delta = wb - wa;
        let length = delta.length();
        if length <= f32::EPSILON {
            return;
        }
        let n = delta / length;
        let config = config.with_policy(policy);
        let stretch_rate = (b.velocity - a.velocity).dot(n);
        let force = spring_force(length - rest_length, stretch_rate, &config);
        let impulse = n * (force * dt);
        a.apply_impulse_at(-impulse, wa - a.position);
        b.apply_impulse_at(impulse, wb - b.position);
    }

    /// One solver pass for rigid kinds
    ///
    /// Positions are corrected first, then the relative velocity along the
    /// constrained directions is removed. Both use the effective mass at the
    /// anchors, so off-center anchors turn the bodies.
    pub fn solve(&self, a: &mut Body, b: &mut Body) {
        match self.spec.kind {
            ConstraintKind::Spring { .. } => {}
            ConstraintKind::Distance { length } => {
                let (wa, wb) = self.anchors(a, b);
                let delta = wb - wa;
                let current = delta.length();
                if current <= f32::EPSILON {
                    return;
                }
                let n = delta / current;
                let (ra, rb) = (wa - a.position, wb - b.position);
                let k = a.inv_mass
                    + b.inv_mass
                    + a.inv_inertia * ra.cross(n).powi(2)
                    + b.inv_inertia * rb.cross(n).powi(2);
                if k <= 0.0 {
                    return;
                }
                let correction = n * (-(current - length) / k);
                a.nudge(-correction, ra);
                b.nudge(correction, rb);

                let (wa, wb) = self.anchors(a, b);
                let (ra, rb) = (wa - a.position, wb - b.position);
                let stretch_rate = (b.point_velocity(rb) - a.point_velocity(ra)).dot(n);
                let impulse = n * (-stretch_rate / k);
                a.apply_impulse_at(-impulse, ra);
                b.apply_impulse_at(impulse, rb);
            }
            ConstraintKind::Hinge {
                min_angle,
                max_angle,
            } => {
                let (wa, wb) = self.anchors(a, b);
                let (ra, rb) = (wa - a.position, wb - b.position);
                if let Some(correction) = solve_point(a, b, ra, rb, wb - wa) {
                    a.nudge(-correction, ra);
                    b.nudge(correction, rb);
                }

                let (wa, wb) = self.anchors(a, b);
                let (ra, rb) = (wa - a.position, wb - b.position);
                let drift = b.point_velocity(rb) - a.point_velocity(ra);
                if let Some(impulse) = solve_point(a, b, ra, rb, drift) {
                    a.apply_impulse_at(-impulse, ra);
                    b.apply_impulse_at(impulse, rb);
                }
                self.limit_angle(a, b, min_angle, max_angle);
            }
        }
    }

    fn limit_angle(&self, a: &mut Body, b: &mut Body, min: Option<f32>, max: Option<f32>) {
        let total = a.inv_inertia + b.inv_inertia;
        if total <= 0.0 {
            return;
        }
        let angle = b.rotation - a.rotation - self.reference_angle;
        let target = match (min, max) {
            (Some(min), _) if angle < min => min,
            (_, Some(max)) if angle > max => max,
            _ => return,
        };
        let error = angle - target;
        a.rotation += error * a.inv_inertia / total;
        b.rotation -= error * b.inv_inertia / total;

        // Stop rotating further past the limit
        let closing = b.angular_velocity - a.angular_velocity;
        if closing * error > 0.0 {
            a.angular_velocity += closing * a.inv_inertia / total;
            b.angular_velocity -= closing * b.inv_inertia / total;
        }
    }
}

/// Impulse `p` at anchors `ra`/`rb` that cancels the point error `error`
///
/// Solves `K p = -error` with `K` the 2x2 effective mass of the point pair.
fn solve_point(a: &Body, b: &Body, ra: Vec2, rb: Vec2, error: Vec2) -> Option<Vec2> {
    let m = a.inv_mass + b.inv_mass;
    let (ia, ib) = (a.inv_inertia, b.inv_inertia);
    let k11 = m + ia * ra.y * ra.y + ib * rb.y * rb.y;
    let k12 = -ia * ra.x * ra.y - ib * rb.x * rb.y;
    let k22 = m + ia * ra.x * ra.x + ib * rb.x * rb.x;
    let det = k11 * k22 - k12 * k12;
    if det.abs() <= f32::EPSILON {
        return None;
    }
    Some(Vec2::new(
        -(k22 * error.x - k12 * error.y) / det,
        -(k11 * error.y - k12 * error.x) / det,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySpec;
    use crate::shape::Shape;

    fn body(id: u64, x: f32, y: f32) -> Body {
        Body::from_spec(
            BodyId(id),
            &BodySpec::dynamic(Shape::circle(1.0)).with_position((x, y)),
        )
    }

    #[test]
    fn test_spec_validation() {
        let (a, b) = (BodyId(1), BodyId(2));
        assert!(ConstraintSpec::distance(a, b, 10.0).validate().is_ok());
        assert!(ConstraintSpec::distance(a, a, 10.0).validate().is_err());
        assert!(ConstraintSpec::distance(a, b, -1.0).validate().is_err());
        assert!(ConstraintSpec::hinge(a, b)
            .with_angle_limits(1.0, -1.0)
            .validate()
            .is_err());
        let limp = SpringConfig {
            stiffness: 0.0,
            ..SpringConfig::default()
        };
        assert!(ConstraintSpec::spring(a, b, 5.0, limp).validate().is_err());
    }

    #[test]
    fn test_distance_restores_length() {
        let (mut a, mut b) = (body(1, 0.0, 0.0), body(2, 30.0, 0.0));
        let constraint = Constraint::new(
            ConstraintId(1),
            ConstraintSpec::distance(BodyId(1), BodyId(2), 20.0),
            &a,
            &b,
        );
        constraint.solve(&mut a, &mut b);
        assert!((a.position.x - 5.0).abs() < 1e-5);
        assert!((b.position.x - 25.0).abs() < 1e-5);
        assert!((a.position.distance(b.position) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_distance_against_static_anchor() {
        let mut pivot = Body::from_spec(BodyId(1), &BodySpec::fixed(Shape::circle(1.0)));
        let mut bob = body(2, 0.0, 50.0);
        bob.velocity = Vec2::new(0.0, 10.0);
        let constraint = Constraint::new(
            ConstraintId(1),
            ConstraintSpec::distance(BodyId(1), BodyId(2), 40.0),
            &pivot,
            &bob,
        );
        constraint.solve(&mut pivot, &mut bob);
        assert_eq!(pivot.position, Vec2::ZERO);
        assert!((bob.position.y - 40.0).abs() < 1e-5);
        assert!(bob.velocity.y.abs() < 1e-5);
    }

    #[test]
    fn test_spring_pulls_toward_rest_length() {
        let (mut a, mut b) = (body(1, 0.0, 0.0), body(2, 100.0, 0.0));
        let constraint = Constraint::new(
            ConstraintId(1),
            ConstraintSpec::spring(BodyId(1), BodyId(2), 50.0, SpringConfig::default()),
            &a,
            &b,
        );
        constraint.apply_force(&mut a, &mut b, MotionPolicy::Off, 1.0 / 120.0);
        assert!(a.velocity.x > 0.0);
        assert!(b.velocity.x < 0.0);
        assert!((a.velocity.x + b.velocity.x).abs() < 1e-4);
    }

    #[test]
    fn test_hinge_joins_anchors_and_limits_rotation() {
        let (mut a, mut b) = (body(1, 0.0, 0.0), body(2, 30.0, 0.0));
        let constraint = Constraint::new(
            ConstraintId(1),
            ConstraintSpec::hinge(BodyId(1), BodyId(2))
                .with_anchors((10.0, 0.0), (-10.0, 0.0))
                .with_angle_limits(-0.5, 0.5),
            &a,
            &b,
        );
        b.rotation = 1.0;
        constraint.solve(&mut a, &mut b);
        // Equal inertia: both bodies absorb half of the 0.5 rad overshoot
        assert!((b.rotation - a.rotation - 0.5).abs() < 1e-5);

        b.rotation = a.rotation;
        for _ in 0..8 {
            constraint.solve(&mut a, &mut b);
        }
        let wa = a.position + Vec2::new(10.0, 0.0).rotate(a.rotation);
        let wb = b.position + Vec2::new(-10.0, 0.0).rotate(b.rotation);
        assert!(wa.distance(wb) < 1e-2);
    }
}
