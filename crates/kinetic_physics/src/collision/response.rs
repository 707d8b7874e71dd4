//! Contact response: impulses and positional correction

use super::Contact;
use crate::body::Body;
use kinetic_core::Vec2;

/// Surface properties combined for one contact
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ContactMaterial {
    pub restitution: f32,
    pub friction: f32,
}

impl ContactMaterial {
    /// Bounciest surface wins, friction is the geometric mean
    pub(crate) fn combine(a: &Body, b: &Body, restitution_scale: f32) -> Self {
        Self {
            restitution: a.restitution.max(b.restitution) * restitution_scale,
            friction: (a.friction * b.friction).sqrt(),
        }
    }
}

/// Velocity along the normal with which `b` approaches `a` (negative when closing)
pub(crate) fn normal_velocity(a: &Body, b: &Body, contact: &Contact) -> f32 {
    let ra = contact.point - a.position;
    let rb = contact.point - b.position;
    (b.point_velocity(rb) - a.point_velocity(ra)).dot(contact.normal)
}

/// Apply a normal impulse (with `restitution`) and a Coulomb-clamped friction
/// impulse. Returns the normal impulse magnitude, zero if already separating.
pub(crate) fn resolve_velocity(
    a: &mut Body,
    b: &mut Body,
    contact: &Contact,
    restitution: f32,
    friction: f32,
) -> f32 {
    let n = contact.normal;
    let ra = contact.point - a.position;
    let rb = contact.point - b.position;

    let vn = (b.point_velocity(rb) - a.point_velocity(ra)).dot(n);
    if vn >= 0.0 {
        return 0.0;
    }

    let ra_n = ra.cross(n);
    let rb_n = rb.cross(n);
    let k = a.inv_mass + b.inv_mass + ra_n * ra_n * a.inv_inertia + rb_n * rb_n * b.inv_inertia;
    if k <= 0.0 {
        return 0.0;
    }

    let jn = -(1.0 + restitution) * vn / k;
    a.apply_impulse_at(-(n * jn), ra);
    b.apply_impulse_at(n * jn, rb);

    // Friction against the post-impulse sliding velocity
    let rv = b.point_velocity(rb) - a.point_velocity(ra);
    let sliding = rv - n * rv.dot(n);
    if sliding.length_squared() > f32::EPSILON {
        let t = sliding.normalize();
        let ra_t = ra.cross(t);
        let rb_t = rb.cross(t);
        let kt = a.inv_mass + b.inv_mass + ra_t * ra_t * a.inv_inertia + rb_t * rb_t * b.inv_inertia;
        if kt > 0.0 {
            let limit = friction * jn;
            let jt = (-rv.dot(t) / kt).clamp(-limit, limit);
            a.apply_impulse_at(-(t * jt), ra);
            b.apply_impulse_at(t * jt, rb);
        }
    }

    jn
}

/// Push overlapping bodies apart in proportion to their inverse masses
pub(crate) fn correct_position(
    a: &mut Body,
    b: &mut Body,
    contact: &Contact,
    slop: f32,
    percent: f32,
) {
    let total = a.inv_mass + b.inv_mass;
    if total <= 0.0 {
        return;
    }
    let depth = (contact.penetration - slop).max(0.0);
    if depth == 0.0 {
        return;
    }
    let correction: Vec2 = contact.normal * (depth / total * percent);
    a.position -= correction * a.inv_mass;
    b.position += correction * b.inv_mass;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyId, BodySpec};
    use crate::shape::Shape;

    fn ball(x: f32, vx: f32) -> Body {
        Body::from_spec(
            BodyId(1),
            &BodySpec::dynamic(Shape::circle(10.0))
                .with_position((x, 0.0))
                .with_velocity((vx, 0.0))
                .with_friction(0.0),
        )
    }

    fn head_on() -> Contact {
        Contact {
            normal: Vec2::X,
            penetration: 1.0,
            point: Vec2::new(9.5, 0.0),
        }
    }

    #[test]
    fn test_elastic_exchange() {
        let (mut a, mut b) = (ball(0.0, 100.0), ball(19.0, -100.0));
        let jn = resolve_velocity(&mut a, &mut b, &head_on(), 1.0, 0.0);
        assert!((jn - 200.0).abs() < 1e-3);
        assert!((a.velocity.x + 100.0).abs() < 1e-3);
        assert!((b.velocity.x - 100.0).abs() < 1e-3);
        assert!(a.angular_velocity.abs() < 1e-6);
    }

    #[test]
    fn test_separating_bodies_are_left_alone() {
        let (mut a, mut b) = (ball(0.0, -5.0), ball(19.0, 5.0));
        assert_eq!(resolve_velocity(&mut a, &mut b, &head_on(), 1.0, 0.5), 0.0);
        assert_eq!(a.velocity.x, -5.0);
    }

    #[test]
    fn test_friction_is_clamped_by_normal_impulse() {
        let mut floor = Body::from_spec(
            BodyId(1),
            &BodySpec::fixed(Shape::rectangle(100.0, 10.0)).with_position((0.0, 10.0)),
        );
        let mut puck = Body::from_spec(
            BodyId(2),
            &BodySpec::dynamic(Shape::circle(5.0))
                .with_velocity((100.0, 10.0))
                .with_fixed_rotation(true),
        );
        let contact = Contact {
            normal: Vec2::new(0.0, -1.0),
            penetration: 0.1,
            point: Vec2::new(0.0, 5.0),
        };
        let jn = resolve_velocity(&mut floor, &mut puck, &contact, 0.0, 0.5);
        assert!((jn - 10.0).abs() < 1e-4);
        assert!(puck.velocity.y.abs() < 1e-4);
        // |jt| <= mu * jn = 5, so sliding drops from 100 to 95
        assert!((puck.velocity.x - 95.0).abs() < 1e-3);
        assert_eq!(floor.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_positional_correction_splits_by_mass() {
        let (mut a, mut b) = (ball(0.0, 0.0), ball(15.0, 0.0));
        let contact = Contact {
            normal: Vec2::X,
            penetration: 5.0,
            point: Vec2::new(7.5, 0.0),
        };
        correct_position(&mut a, &mut b, &contact, 0.0, 1.0);
        assert!((a.position.x + 2.5).abs() < 1e-5);
        assert!((b.position.x - 17.5).abs() < 1e-5);
    }
}
