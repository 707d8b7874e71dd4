//! Narrow phase: exact shape-pair tests
//!
//! Circle-circle compares center distance with the radius sum, circle-box
//! finds the closest point on the box in its local frame, and box-box runs a
//! separating-axis test over both boxes' edge normals.

use super::Contact;
use crate::shape::Shape;
use kinetic_core::Vec2;
use smallvec::SmallVec;

/// Support vertices within this depth of the deepest one share the contact point
const CONTACT_MERGE_TOLERANCE: f32 = 0.5;

/// A shape placed in the world
#[derive(Clone, Copy, Debug)]
pub struct Placed {
    pub shape: Shape,
    pub position: Vec2,
    pub rotation: f32,
}

/// Contact between `a` and `b` with the normal pointing from `a` to `b`
pub fn collide(a: &Placed, b: &Placed) -> Option<Contact> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Circle { radius }, Shape::Rectangle { .. }) => {
            circle_box(a.position, radius, b).map(Contact::flipped)
        }
        (Shape::Rectangle { .. }, Shape::Circle { radius }) => circle_box(b.position, radius, a),
        (Shape::Rectangle { .. }, Shape::Rectangle { .. }) => box_box(a, b),
    }
}

fn circle_circle(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Option<Contact> {
    let delta = pb - pa;
    let distance = delta.length();
    let radii = ra + rb;
    if distance >= radii {
        return None;
    }
    // Coincident centers: push apart vertically
    let normal = if distance > f32::EPSILON {
        delta / distance
    } else {
        Vec2::Y
    };
    let penetration = radii - distance;
    Some(Contact {
        normal,
        penetration,
        point: pa + normal * (ra - penetration * 0.5),
    })
}

/// Contact with the normal pointing from the box toward the circle
fn circle_box(center: Vec2, radius: f32, rect: &Placed) -> Option<Contact> {
    let half = rect.shape.half_extents();
    let local = (center - rect.position).rotate(-rect.rotation);
    let clamped = Vec2::new(local.x.clamp(-half.x, half.x), local.y.clamp(-half.y, half.y));

    let inside = local.x.abs() <= half.x && local.y.abs() <= half.y;
    let (normal_local, penetration, closest) = if inside {
        // Leave through the nearest face
        let dx = half.x - local.x.abs();
        let dy = half.y - local.y.abs();
        if dx < dy {
            let sign = local.x.signum();
            (Vec2::new(sign, 0.0), radius + dx, Vec2::new(sign * half.x, local.y))
        } else {
            let sign = if local.y < 0.0 { -1.0 } else { 1.0 };
            (Vec2::new(0.0, sign), radius + dy, Vec2::new(local.x, sign * half.y))
        }
    } else {
        let offset = local - clamped;
        let distance = offset.length();
        if distance >= radius {
            return None;
        }
        (offset / distance, radius - distance, clamped)
    };

    Some(Contact {
        normal: normal_local.rotate(rect.rotation),
        penetration,
        point: rect.position + closest.rotate(rect.rotation),
    })
}

fn box_axes(rotation: f32) -> [Vec2; 2] {
    let x = Vec2::X.rotate(rotation);
    [x, x.perp()]
}

/// Half-width of a box's projection onto `axis`
fn projected_radius(half: Vec2, axes: &[Vec2; 2], axis: Vec2) -> f32 {
    half.x * axes[0].dot(axis).abs() + half.y * axes[1].dot(axis).abs()
}

fn box_box(a: &Placed, b: &Placed) -> Option<Contact> {
    let (half_a, half_b) = (a.shape.half_extents(), b.shape.half_extents());
    let (axes_a, axes_b) = (box_axes(a.rotation), box_axes(b.rotation));
    let delta = b.position - a.position;

    let mut best: Option<(f32, Vec2, bool)> = None;
    for (axis, from_a) in axes_a
        .iter()
        .map(|axis| (*axis, true))
        .chain(axes_b.iter().map(|axis| (*axis, false)))
    {
        let overlap = projected_radius(half_a, &axes_a, axis)
            + projected_radius(half_b, &axes_b, axis)
            - delta.dot(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if best.map_or(true, |(depth, _, _)| overlap < depth) {
            let normal = if delta.dot(axis) < 0.0 { -axis } else { axis };
            best = Some((overlap, normal, from_a));
        }
    }
    let (penetration, normal, from_a) = best?;

    // Deepest vertices of the incident box
    let point = if from_a {
        deepest_point(&b.shape.corners(b.position, b.rotation), -normal)
    } else {
        deepest_point(&a.shape.corners(a.position, a.rotation), normal)
    };

    Some(Contact {
        normal,
        penetration,
        point,
    })
}

/// Average of the corners that reach furthest along `direction`
fn deepest_point(corners: &[Vec2; 4], direction: Vec2) -> Vec2 {
    let depth = corners
        .iter()
        .map(|c| c.dot(direction))
        .fold(f32::NEG_INFINITY, f32::max);
    let support: SmallVec<[Vec2; 4]> = corners
        .iter()
        .copied()
        .filter(|c| depth - c.dot(direction) <= CONTACT_MERGE_TOLERANCE)
        .collect();
    let sum = support.iter().fold(Vec2::ZERO, |acc, c| acc + *c);
    sum / support.len().max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x: f32, y: f32, radius: f32) -> Placed {
        Placed {
            shape: Shape::circle(radius),
            position: Vec2::new(x, y),
            rotation: 0.0,
        }
    }

    fn rect(x: f32, y: f32, w: f32, h: f32, rotation: f32) -> Placed {
        Placed {
            shape: Shape::rectangle(w, h),
            position: Vec2::new(x, y),
            rotation,
        }
    }

    #[test]
    fn test_circle_circle() {
        let contact = collide(&circle(0.0, 0.0, 10.0), &circle(15.0, 0.0, 10.0)).unwrap();
        assert_eq!(contact.normal, Vec2::X);
        assert!((contact.penetration - 5.0).abs() < 1e-5);
        assert!((contact.point.x - 7.5).abs() < 1e-5);

        assert!(collide(&circle(0.0, 0.0, 10.0), &circle(25.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_coincident_circles_still_separate() {
        let contact = collide(&circle(1.0, 1.0, 2.0), &circle(1.0, 1.0, 2.0)).unwrap();
        assert_eq!(contact.normal, Vec2::Y);
        assert!((contact.penetration - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_resting_on_floor() {
        let floor = rect(250.0, 400.0, 500.0, 10.0, 0.0);
        let ball = circle(100.0, 387.0, 10.0);

        let contact = collide(&ball, &floor).unwrap();
        assert!((contact.normal.y - 1.0).abs() < 1e-5);
        assert!((contact.penetration - 2.0).abs() < 1e-4);
        assert!((contact.point.y - 395.0).abs() < 1e-4);

        let reverse = collide(&floor, &ball).unwrap();
        assert!((reverse.normal.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_center_inside_box() {
        let floor = rect(0.0, 0.0, 100.0, 10.0, 0.0);
        let ball = circle(10.0, -3.0, 4.0);
        let contact = collide(&floor, &ball).unwrap();
        assert_eq!(contact.normal, Vec2::new(0.0, -1.0));
        assert!((contact.penetration - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_misses_rotated_box_corner() {
        let diamond = rect(0.0, 0.0, 10.0, 10.0, std::f32::consts::FRAC_PI_4);
        // Inside the axis-aligned corner region but outside the rotated box
        assert!(collide(&circle(6.5, 6.5, 1.0), &diamond).is_none());
        assert!(collide(&circle(7.5, 0.0, 1.0), &diamond).is_some());
    }

    #[test]
    fn test_box_box_overlap() {
        let a = rect(0.0, 0.0, 10.0, 10.0, 0.0);
        let b = rect(0.0, 8.0, 10.0, 10.0, 0.0);
        let contact = collide(&a, &b).unwrap();
        assert!((contact.normal.y - 1.0).abs() < 1e-5);
        assert!((contact.penetration - 2.0).abs() < 1e-5);
        // Both bottom corners of `b` are equally deep
        assert!(contact.point.x.abs() < 1e-4);
        assert!((contact.point.y - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_box_box_separating_axis_from_rotation() {
        let a = rect(0.0, 0.0, 10.0, 10.0, 0.0);
        let diamond = rect(12.5, 0.0, 10.0, 10.0, std::f32::consts::FRAC_PI_4);
        // Diamond tip reaches x = 12.5 - 7.07 = 5.43 > 5
        assert!(collide(&a, &diamond).is_none());
        let closer = rect(11.0, 0.0, 10.0, 10.0, std::f32::consts::FRAC_PI_4);
        let contact = collide(&a, &closer).unwrap();
        assert!(contact.normal.x > 0.9);
    }
}
