//! Deferred world mutation
//!
//! Collision listeners run while the world is mid-step, so they cannot touch
//! the body or constraint tables directly. They queue [`Command`]s instead and
//! the world applies the whole batch, in order, once the step finishes.

use crate::body::{BodyId, BodySpec};
use crate::constraint::{ConstraintId, ConstraintSpec};
use kinetic_core::{Result, Vec2};
use serde::Serialize;

/// Contact reported to collision listeners
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CollisionEvent {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Unit normal from `body_a` toward `body_b`
    pub normal: Vec2,
    pub penetration: f32,
    pub point: Vec2,
    /// Closing speed along the normal before the impulse, px/s
    pub approach_speed: f32,
}

impl CollisionEvent {
    pub fn involves(&self, body: BodyId) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// The body on the other side of the contact from `body`
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }
}

/// A queued mutation
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    AddBody(BodyId, BodySpec),
    RemoveBody(BodyId),
    AddConstraint(ConstraintId, ConstraintSpec),
    RemoveConstraint(ConstraintId),
    ApplyForce(BodyId, Vec2),
    ApplyImpulse(BodyId, Vec2),
}

/// Mutation buffer handed to collision listeners
///
/// Ids for queued additions are handed out immediately so a listener can
/// refer to a body it just spawned (for instance to constrain it).
#[derive(Debug)]
pub struct Commands {
    next_body: u64,
    next_constraint: u64,
    queue: Vec<Command>,
}

impl Commands {
    pub(crate) fn new(next_body: u64, next_constraint: u64) -> Self {
        Self {
            next_body,
            next_constraint,
            queue: Vec::new(),
        }
    }

    /// Queue a body; the spec is validated now
    pub fn add_body(&mut self, spec: BodySpec) -> Result<BodyId> {
        spec.validate()?;
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.queue.push(Command::AddBody(id, spec));
        Ok(id)
    }

    pub fn remove_body(&mut self, id: BodyId) {
        self.queue.push(Command::RemoveBody(id));
    }

    /// Queue a constraint; parameters are validated now, body ids when applied
    pub fn add_constraint(&mut self, spec: ConstraintSpec) -> Result<ConstraintId> {
        spec.validate()?;
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.queue.push(Command::AddConstraint(id, spec));
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) {
        self.queue.push(Command::RemoveConstraint(id));
    }

    pub fn apply_force(&mut self, id: BodyId, force: impl Into<Vec2>) {
        self.queue.push(Command::ApplyForce(id, force.into()));
    }

    pub fn apply_impulse(&mut self, id: BodyId, impulse: impl Into<Vec2>) {
        self.queue.push(Command::ApplyImpulse(id, impulse.into()));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn next_ids(&self) -> (u64, u64) {
        (self.next_body, self.next_constraint)
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.queue.drain(..)
    }
}
