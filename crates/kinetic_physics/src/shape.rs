//! Collision shapes

use kinetic_core::{Aabb, MotionError, Result, Vec2};
use serde::{Deserialize, Serialize};

/// Collision geometry, centered on the body position
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f32 },
    /// Oriented box; the body's rotation turns it
    Rectangle { width: f32, height: f32 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle { radius }
    }

    pub fn rectangle(width: f32, height: f32) -> Self {
        Shape::Rectangle { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Shape::Circle { radius } => {
                MotionError::ensure_positive("radius", radius)?;
            }
            Shape::Rectangle { width, height } => {
                MotionError::ensure_positive("width", width)?;
                MotionError::ensure_positive("height", height)?;
            }
        }
        Ok(())
    }

    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rectangle { width, height } => width * height,
        }
    }

    /// Moment of inertia about the center for a body of `mass`
    pub fn moment_of_inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Rectangle { width, height } => mass * (width * width + height * height) / 12.0,
        }
    }

    /// Half extents in the local frame (the radius on both axes for circles)
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::new(radius, radius),
            Shape::Rectangle { width, height } => Vec2::new(width * 0.5, height * 0.5),
        }
    }

    /// World-space bounds at `position` turned by `rotation`
    pub fn aabb(&self, position: Vec2, rotation: f32) -> Aabb {
        let half = match *self {
            Shape::Circle { radius } => Vec2::new(radius, radius),
            Shape::Rectangle { .. } => {
                let h = self.half_extents();
                let (sin, cos) = rotation.sin_cos();
                Vec2::new(
                    cos.abs() * h.x + sin.abs() * h.y,
                    sin.abs() * h.x + cos.abs() * h.y,
                )
            }
        };
        Aabb::from_center_half_extents(position, half)
    }

    /// Corners of a rectangle in world space, counter-clockwise
    pub(crate) fn corners(&self, position: Vec2, rotation: f32) -> [Vec2; 4] {
        let h = self.half_extents();
        [
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
        ]
        .map(|corner| position + corner.rotate(rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(Shape::circle(10.0).validate().is_ok());
        assert!(Shape::circle(0.0).validate().is_err());
        assert!(Shape::circle(f32::NAN).validate().is_err());
        assert!(Shape::rectangle(10.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_inertia() {
        assert_eq!(Shape::circle(2.0).moment_of_inertia(3.0), 6.0);
        assert_eq!(Shape::rectangle(3.0, 4.0).moment_of_inertia(12.0), 25.0);
    }

    #[test]
    fn test_rotated_rectangle_bounds_grow() {
        let shape = Shape::rectangle(10.0, 2.0);
        let flat = shape.aabb(Vec2::ZERO, 0.0);
        assert!((flat.width() - 10.0).abs() < 1e-5);
        assert!((flat.height() - 2.0).abs() < 1e-5);

        let upright = shape.aabb(Vec2::ZERO, std::f32::consts::FRAC_PI_2);
        assert!((upright.width() - 2.0).abs() < 1e-4);
        assert!((upright.height() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_serde_tagging() {
        let shape: Shape = serde_json::from_str(r#"{"type":"circle","radius":4.0}"#).unwrap();
        assert_eq!(shape, Shape::circle(4.0));
    }
}
