//! Kinetic Core
//!
//! This crate provides the foundational primitives shared by the Kinetic
//! motion subsystems:
//!
//! - **Geometry**: `Vec2` and axis-aligned bounds for the 2D simulation
//! - **Integrators**: semi-implicit Euler, velocity Verlet, and RK4
//! - **Motion Policy**: maps a reduced-motion preference to parameter scaling
//! - **State Machines**: typed transport state machines for playback
//!
//! # Example
//!
//! ```rust
//! use kinetic_core::{Integrator, MotionPolicy, Vec2};
//!
//! // Fall for one frame under gravity
//! let gravity = Vec2::new(0.0, 981.0);
//! let (x, v) = Integrator::SemiImplicitEuler.advance(
//!     Vec2::ZERO,
//!     Vec2::ZERO,
//!     1.0 / 60.0,
//!     |_, _| gravity,
//! );
//! assert!(x.y > 0.0 && v.y > 0.0);
//!
//! // Reduced motion halves durations
//! assert_eq!(MotionPolicy::Medium.scale_duration(300.0), 150.0);
//! ```

pub mod error;
pub mod fsm;
pub mod geometry;
pub mod integrator;
pub mod policy;

pub use error::{MotionError, Result};
pub use fsm::{StateMachine, StateMachineBuilder, Transition};
pub use geometry::{Aabb, Vec2};
pub use integrator::Integrator;
pub use policy::{MotionPolicy, PhysicsScaling, SharedMotionPolicy, SpringScaling};
