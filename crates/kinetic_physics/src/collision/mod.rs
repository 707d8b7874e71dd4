//! Collision pipeline
//!
//! Per sub-step: [`broad_phase`] pairs bodies whose bounds overlap,
//! [`narrow_phase`] turns candidate pairs into exact contacts, and
//! [`response`] resolves them with impulses and positional correction.

pub mod broad_phase;
pub mod narrow_phase;
pub mod response;

use kinetic_core::Vec2;

/// Exact contact between two shapes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the first body toward the second
    pub normal: Vec2,
    /// Overlap depth along the normal, always positive
    pub penetration: f32,
    /// World-space contact point
    pub point: Vec2,
}

impl Contact {
    /// Same contact seen from the other body
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}
