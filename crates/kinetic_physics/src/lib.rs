//! Kinetic Physics
//!
//! A 2D rigid-body world for UI motion: circles and oriented boxes, gravity,
//! distance/spring/hinge constraints, impulse-based collisions and sleeping.
//!
//! The world is driven by the host's frame clock through [`World::step`],
//! which subdivides each call into fixed sub-steps. Collision listeners may
//! queue mutations through [`Commands`]; they land when the step returns.
//!
//! # Example
//!
//! ```rust
//! use kinetic_physics::{BodySpec, MotionPolicy, Shape, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
//! world
//!     .add_body(BodySpec::fixed(Shape::rectangle(500.0, 10.0)).with_position((250.0, 400.0)))
//!     .unwrap();
//! let ball = world
//!     .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 0.0)))
//!     .unwrap();
//!
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0);
//! }
//! let y = world.get_body_state(ball).unwrap().position.y;
//! assert!((380.0..400.0).contains(&y));
//! ```

pub mod body;
pub mod collision;
pub mod commands;
pub mod config;
pub mod constraint;
pub mod shape;
pub mod world;

pub use body::{BodyId, BodySpec, BodyState};
pub use collision::Contact;
pub use commands::{CollisionEvent, Command, Commands};
pub use config::WorldConfig;
pub use constraint::{ConstraintId, ConstraintKind, ConstraintSpec};
pub use kinetic_core::{Integrator, MotionError, MotionPolicy, SharedMotionPolicy, Vec2};
pub use shape::Shape;
pub use world::{StepReport, World};
