//! Physics world
//!
//! Owns every body and constraint and advances them in fixed sub-steps:
//!
//! 1. spring constraint forces
//! 2. integration of awake dynamic bodies
//! 3. rigid constraint iterations (distance, hinge)
//! 4. broad phase, narrow phase, contact impulses, positional correction
//! 5. collision listeners (queueing [`Commands`])
//! 6. non-finite recovery and sleep bookkeeping
//!
//! Commands queued by listeners are applied once the whole `step` call ends.

use crate::body::{Body, BodyId, BodySpec, BodyState};
use crate::collision::broad_phase::sweep_and_prune;
use crate::collision::narrow_phase::{collide, Placed};
use crate::collision::response::{
    correct_position, normal_velocity, resolve_velocity, ContactMaterial,
};
use crate::collision::Contact;
use crate::commands::{CollisionEvent, Command, Commands};
use crate::config::WorldConfig;
use crate::constraint::{Constraint, ConstraintId, ConstraintSpec};
use kinetic_core::{Aabb, MotionError, MotionPolicy, Result, SharedMotionPolicy, Vec2};
use rustc_hash::FxHashMap;
use std::fmt;

/// Accumulated time within this of a full sub-step still runs it
const STEP_EPSILON: f32 = 1e-6;

/// Padding around a changed region when waking sleepers, host units
const WAKE_MARGIN: f32 = 1.0;

type CollisionListener = Box<dyn FnMut(&CollisionEvent, &mut Commands) + Send>;

/// What happened during one [`World::step`] call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    pub sub_steps: u32,
    /// Contacts resolved, summed over sub-steps
    pub contacts: usize,
    /// Bodies reset after their state went non-finite
    pub recovered: Vec<BodyId>,
    pub woken: usize,
    pub slept: usize,
    /// Seconds discarded because `max_sub_steps` was reached
    pub dropped: f32,
}

struct ContactPair {
    a: usize,
    b: usize,
    contact: Contact,
    approach_speed: f32,
}

/// The physics world
pub struct World {
    config: WorldConfig,
    policy: SharedMotionPolicy,
    /// Insertion order
    bodies: Vec<Body>,
    index: FxHashMap<BodyId, usize>,
    constraints: Vec<Constraint>,
    next_body: u64,
    next_constraint: u64,
    accumulator: f32,
    listeners: Vec<CollisionListener>,
}

impl World {
    pub fn new(config: WorldConfig, policy: impl Into<SharedMotionPolicy>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            policy: policy.into(),
            bodies: Vec::new(),
            index: FxHashMap::default(),
            constraints: Vec::new(),
            next_body: 1,
            next_constraint: 1,
            accumulator: 0.0,
            listeners: Vec::new(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn policy(&self) -> MotionPolicy {
        self.policy.get()
    }

    /// Change the policy; shared handles see it too
    pub fn set_policy(&mut self, policy: MotionPolicy) {
        self.policy.set(policy);
    }

    pub fn shared_policy(&self) -> &SharedMotionPolicy {
        &self.policy
    }

    // ------------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------------

    /// Validate and insert a body
    pub fn add_body(&mut self, spec: BodySpec) -> Result<BodyId> {
        spec.validate()?;
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.insert_body(id, &spec);
        Ok(id)
    }

    fn insert_body(&mut self, id: BodyId, spec: &BodySpec) {
        self.index.insert(id, self.bodies.len());
        self.bodies.push(Body::from_spec(id, spec));
        tracing::debug!("added {} ({:?})", id, spec.shape);
    }

    /// Remove a body and every constraint attached to it
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        let Some(index) = self.index.remove(&id) else {
            tracing::warn!("remove_body: unknown {}", id);
            return false;
        };
        let removed = self.bodies.remove(index);
        self.reindex();

        // Sleepers it supported or held
        let partners: Vec<BodyId> = self
            .constraints
            .iter()
            .filter(|c| c.involves(id))
            .map(|c| if c.spec.body_a == id { c.spec.body_b } else { c.spec.body_a })
            .collect();
        self.wake_touching(bounds(&removed), "removal");
        for partner in partners {
            self.wake(partner);
        }

        let before = self.constraints.len();
        self.constraints.retain(|c| !c.involves(id));
        let dropped = before - self.constraints.len();
        if dropped > 0 {
            tracing::debug!("removed {} with {} attached constraint(s)", id, dropped);
        } else {
            tracing::debug!("removed {}", id);
        }
        true
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            self.index.insert(body.id, i);
        }
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let index = *self.index.get(&id)?;
        self.bodies.get_mut(index)
    }

    /// Snapshot of one body, `None` for unknown ids
    pub fn get_body_state(&self, id: BodyId) -> Option<BodyState> {
        self.index.get(&id).map(|&i| self.bodies[i].state())
    }

    /// Snapshots of every body in insertion order
    pub fn bodies(&self) -> Vec<BodyState> {
        self.bodies.iter().map(Body::state).collect()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Accumulate a force (host units) for the next `step`
    ///
    /// Ignored for static and unknown bodies.
    pub fn apply_force(&mut self, id: BodyId, force: impl Into<Vec2>) {
        let force = force.into();
        if !force.is_finite() {
            tracing::warn!("apply_force: ignoring non-finite force on {}", id);
            return;
        }
        if let Some(body) = self.body_mut(id).filter(|b| !b.is_static) {
            body.force += force;
            if body.wake() {
                tracing::debug!("{} woken by force", id);
            }
        }
    }

    /// Change a body's velocity by `impulse / mass` immediately
    ///
    /// Ignored for static and unknown bodies.
    pub fn apply_impulse(&mut self, id: BodyId, impulse: impl Into<Vec2>) {
        let impulse = impulse.into();
        if !impulse.is_finite() {
            tracing::warn!("apply_impulse: ignoring non-finite impulse on {}", id);
            return;
        }
        if let Some(body) = self.body_mut(id).filter(|b| !b.is_static) {
            body.velocity += impulse * body.inv_mass;
            if body.wake() {
                tracing::debug!("{} woken by impulse", id);
            }
        }
    }

    /// Teleport a body; unknown ids are ignored
    pub fn set_position(&mut self, id: BodyId, position: impl Into<Vec2>) -> Result<()> {
        let position = position.into();
        if !position.is_finite() {
            return Err(MotionError::validation("position", "expected finite components"));
        }
        let Some(body) = self.body_mut(id) else {
            tracing::warn!("set_position: unknown {}", id);
            return Ok(());
        };
        let old = bounds(body);
        body.set_position(position);
        body.wake();
        let new = bounds(body);
        self.wake_touching(old.union(&new), "teleport");
        Ok(())
    }

    /// Overwrite a dynamic body's velocity; static and unknown ids are ignored
    pub fn set_velocity(&mut self, id: BodyId, velocity: impl Into<Vec2>) -> Result<()> {
        let velocity = velocity.into();
        if !velocity.is_finite() {
            return Err(MotionError::validation("velocity", "expected finite components"));
        }
        match self.body_mut(id) {
            Some(body) if !body.is_static => {
                body.velocity = velocity;
                body.wake();
            }
            Some(_) => {}
            None => tracing::warn!("set_velocity: unknown {}", id),
        }
        Ok(())
    }

    /// Wake a sleeping body. Returns `true` if it was asleep.
    pub fn wake(&mut self, id: BodyId) -> bool {
        self.body_mut(id).map_or(false, Body::wake)
    }

    /// Wake every sleeping body whose bounds touch `region`
    fn wake_touching(&mut self, region: Aabb, cause: &str) {
        let margin = Vec2::new(WAKE_MARGIN, WAKE_MARGIN);
        let region = Aabb {
            min: region.min - margin,
            max: region.max + margin,
        };
        for body in self.bodies.iter_mut().filter(|b| b.sleeping) {
            if bounds(body).overlaps(&region) && body.wake() {
                tracing::debug!("{} woken by {}", body.id, cause);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------------

    /// Validate and insert a constraint
    ///
    /// Returns `Ok(None)` (and logs a warning) when either body is unknown.
    pub fn add_constraint(&mut self, spec: ConstraintSpec) -> Result<Option<ConstraintId>> {
        spec.validate()?;
        let id = ConstraintId(self.next_constraint);
        if !self.insert_constraint(id, spec) {
            return Ok(None);
        }
        self.next_constraint += 1;
        Ok(Some(id))
    }

    fn insert_constraint(&mut self, id: ConstraintId, spec: ConstraintSpec) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&spec.body_a), self.index.get(&spec.body_b))
        else {
            let missing = if self.index.contains_key(&spec.body_a) {
                spec.body_b
            } else {
                spec.body_a
            };
            tracing::warn!(
                "dropping {} constraint: {}",
                spec.kind.name(),
                MotionError::UnknownReference {
                    kind: "body",
                    id: missing.to_string(),
                }
            );
            return false;
        };
        let constraint = Constraint::new(id, spec, &self.bodies[a], &self.bodies[b]);
        self.constraints.push(constraint);
        for i in [a, b] {
            if self.bodies[i].wake() {
                tracing::debug!("{} woken by {}", self.bodies[i].id, id);
            }
        }
        tracing::debug!("added {} ({} between {} and {})", id, spec.kind.name(), spec.body_a, spec.body_b);
        true
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.id != id);
        if self.constraints.len() == before {
            tracing::warn!("remove_constraint: unknown {}", id);
            return false;
        }
        true
    }

    pub fn get_constraint(&self, id: ConstraintId) -> Option<ConstraintSpec> {
        self.constraints.iter().find(|c| c.id == id).map(|c| c.spec)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Register a listener called once per contact per sub-step
    ///
    /// Mutations go through the [`Commands`] buffer and are applied when the
    /// current `step` returns.
    pub fn on_collision<F>(&mut self, listener: F)
    where
        F: FnMut(&CollisionEvent, &mut Commands) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ------------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds
    ///
    /// Time is consumed in `fixed_time_step` sub-steps; a remainder smaller
    /// than one sub-step carries over to the next call.
    pub fn step(&mut self, dt: f32) -> StepReport {
        let mut report = StepReport::default();
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!("step: ignoring invalid dt {}", dt);
            return report;
        }

        let h = self.config.fixed_time_step;
        let policy = self.policy.get();
        let mut commands = Commands::new(self.next_body, self.next_constraint);

        self.accumulator += dt;
        while self.accumulator + STEP_EPSILON >= h && report.sub_steps < self.config.max_sub_steps
        {
            self.sub_step(h, policy, &mut commands, &mut report);
            self.accumulator -= h;
            report.sub_steps += 1;
        }
        self.accumulator = self.accumulator.max(0.0);
        if self.accumulator >= h {
            let kept = self.accumulator % h;
            report.dropped = self.accumulator - kept;
            self.accumulator = kept;
            tracing::debug!(
                "step: dropped {:.4}s after {} sub-steps",
                report.dropped,
                report.sub_steps
            );
        }

        for body in &mut self.bodies {
            body.force = Vec2::ZERO;
        }
        self.apply_commands(commands);
        report
    }

    fn apply_commands(&mut self, mut commands: Commands) {
        let (next_body, next_constraint) = commands.next_ids();
        self.next_body = self.next_body.max(next_body);
        self.next_constraint = self.next_constraint.max(next_constraint);

        if !commands.is_empty() {
            tracing::debug!("applying {} deferred command(s)", commands.len());
        }
        for command in commands.drain() {
            match command {
                Command::AddBody(id, spec) => self.insert_body(id, &spec),
                Command::RemoveBody(id) => {
                    self.remove_body(id);
                }
                Command::AddConstraint(id, spec) => {
                    self.insert_constraint(id, spec);
                }
                Command::RemoveConstraint(id) => {
                    self.remove_constraint(id);
                }
                Command::ApplyForce(id, force) => self.apply_force(id, force),
                Command::ApplyImpulse(id, impulse) => self.apply_impulse(id, impulse),
            }
        }
    }

    fn sub_step(
        &mut self,
        h: f32,
        policy: MotionPolicy,
        commands: &mut Commands,
        report: &mut StepReport,
    ) {
        self.apply_constraint_forces(h, policy, report);
        self.integrate(h);
        self.solve_constraints(report);

        let contacts = self.find_contacts(report);
        report.contacts += contacts.len();
        self.resolve_contacts(&contacts, policy);
        self.notify(&contacts, commands);

        self.recover_non_finite(report);
        if self.config.sleep_enabled {
            self.update_sleep(h, report);
        }
        tracing::trace!("sub-step: {} contact(s)", contacts.len());
    }

    fn apply_constraint_forces(&mut self, h: f32, policy: MotionPolicy, report: &mut StepReport) {
        for constraint in &self.constraints {
            let Some((a, b)) = wake_pair(&mut self.bodies, &self.index, constraint, report) else {
                continue;
            };
            constraint.apply_force(a, b, policy, h);
        }
    }

    fn integrate(&mut self, h: f32) {
        let gravity = self.config.gravity_px();
        let integrator = self.config.integrator;
        for body in self.bodies.iter_mut().filter(|b| b.is_awake_dynamic()) {
            let accel = gravity * body.gravity_scale + body.force * body.inv_mass;
            let damping = body.linear_damping;
            (body.position, body.velocity) =
                integrator.advance(body.position, body.velocity, h, |_, v: Vec2| accel - v * damping);

            if body.inv_inertia > 0.0 {
                let damping = body.angular_damping;
                (body.rotation, body.angular_velocity) =
                    integrator.advance(body.rotation, body.angular_velocity, h, |_, w: f32| -w * damping);
            }
        }
    }

    fn solve_constraints(&mut self, report: &mut StepReport) {
        if self.constraints.is_empty() {
            return;
        }
        for _ in 0..self.config.constraint_iterations {
            for constraint in &self.constraints {
                if let Some((a, b)) = wake_pair(&mut self.bodies, &self.index, constraint, report) {
                    constraint.solve(a, b);
                }
            }
        }
    }

    fn find_contacts(&mut self, report: &mut StepReport) -> Vec<ContactPair> {
        let boxes: Vec<Aabb> = self.bodies.iter().map(bounds).collect();

        let mut contacts = Vec::new();
        for (i, j) in sweep_and_prune(&boxes) {
            let (a, b) = (&self.bodies[i], &self.bodies[j]);
            // Static-static, sleeping-sleeping and sleeping-static pairs never move
            if !a.is_awake_dynamic() && !b.is_awake_dynamic() {
                continue;
            }
            if self
                .constraints
                .iter()
                .any(|c| !c.spec.collide_connected && c.connects(a.id, b.id))
            {
                continue;
            }
            let Some(contact) = collide(&placed(a), &placed(b)) else {
                continue;
            };

            let (a, b) = pair_mut(&mut self.bodies, i, j);
            for body in [a, b] {
                if body.wake() {
                    report.woken += 1;
                    tracing::debug!("{} woken by contact", body.id);
                }
            }
            let (a, b) = (&self.bodies[i], &self.bodies[j]);
            contacts.push(ContactPair {
                a: i,
                b: j,
                approach_speed: -normal_velocity(a, b, &contact),
                contact,
            });
        }
        contacts
    }

    fn resolve_contacts(&mut self, contacts: &[ContactPair], policy: MotionPolicy) {
        if contacts.is_empty() {
            return;
        }
        let restitution_scale = policy.physics_scaling().restitution;
        let threshold = self.config.restitution_threshold;

        for iteration in 0..self.config.constraint_iterations {
            for pair in contacts {
                let (a, b) = pair_mut(&mut self.bodies, pair.a, pair.b);
                let material = ContactMaterial::combine(a, b, restitution_scale);
                // Bounce once; later passes only remove residual approach
                let restitution = if iteration == 0 && pair.approach_speed >= threshold {
                    material.restitution
                } else {
                    0.0
                };
                resolve_velocity(a, b, &pair.contact, restitution, material.friction);
            }
        }

        let (slop, percent) = (self.config.position_slop, self.config.position_correction);
        for pair in contacts {
            let (a, b) = pair_mut(&mut self.bodies, pair.a, pair.b);
            correct_position(a, b, &pair.contact, slop, percent);
        }
    }

    fn notify(&mut self, contacts: &[ContactPair], commands: &mut Commands) {
        if self.listeners.is_empty() {
            return;
        }
        for pair in contacts {
            let event = CollisionEvent {
                body_a: self.bodies[pair.a].id,
                body_b: self.bodies[pair.b].id,
                normal: pair.contact.normal,
                penetration: pair.contact.penetration,
                point: pair.contact.point,
                approach_speed: pair.approach_speed,
            };
            for listener in &mut self.listeners {
                listener(&event, commands);
            }
        }
    }

    fn recover_non_finite(&mut self, report: &mut StepReport) {
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            if body.checkpoint() {
                let error = MotionError::NumericalInstability {
                    body: body.id.to_string(),
                };
                tracing::warn!("{}; restored last finite position", error);
                if !report.recovered.contains(&body.id) {
                    report.recovered.push(body.id);
                }
            }
        }
    }

    fn update_sleep(&mut self, h: f32, report: &mut StepReport) {
        let linear = self.config.sleep_linear_threshold;
        let angular = self.config.sleep_angular_threshold;
        let threshold_ms = self.config.sleep_time_threshold_ms;

        for body in self.bodies.iter_mut().filter(|b| b.is_awake_dynamic()) {
            let resting = body.velocity.length() < linear && body.angular_velocity.abs() < angular;
            if !resting {
                body.sleep_timer_ms = 0.0;
                continue;
            }
            body.sleep_timer_ms += h * 1000.0;
            if body.sleep_timer_ms >= threshold_ms {
                body.put_to_sleep();
                report.slept += 1;
                tracing::debug!("{} fell asleep at {:?}", body.id, body.position);
            }
        }
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("policy", &self.policy.get())
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("listeners", &self.listeners.len())
            .field("accumulator", &self.accumulator)
            .finish()
    }
}

fn bounds(body: &Body) -> Aabb {
    body.shape.aabb(body.position, body.rotation)
}

fn placed(body: &Body) -> Placed {
    Placed {
        shape: body.shape,
        position: body.position,
        rotation: body.rotation,
    }
}

/// Two distinct elements of `items` mutably, in the order asked for
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

/// Bodies of a constraint if either one is awake, waking the other
fn wake_pair<'a>(
    bodies: &'a mut [Body],
    index: &FxHashMap<BodyId, usize>,
    constraint: &Constraint,
    report: &mut StepReport,
) -> Option<(&'a mut Body, &'a mut Body)> {
    let i = *index.get(&constraint.spec.body_a)?;
    let j = *index.get(&constraint.spec.body_b)?;
    let (a, b) = pair_mut(bodies, i, j);
    if !a.is_awake_dynamic() && !b.is_awake_dynamic() {
        return None;
    }
    for body in [&mut *a, &mut *b] {
        if body.wake() {
            report.woken += 1;
            tracing::debug!("{} woken by {}", body.id, constraint.id);
        }
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use std::sync::{Arc, Mutex};

    fn zero_gravity() -> World {
        World::new(WorldConfig::default().with_gravity(Vec2::ZERO), MotionPolicy::Off).unwrap()
    }

    #[test]
    fn test_free_fall_matches_gravity() {
        let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
        let ball = world.add_body(BodySpec::dynamic(Shape::circle(5.0))).unwrap();
        let report = world.step(0.5);

        assert_eq!(report.sub_steps, 8);
        let state = world.get_body_state(ball).unwrap();
        // 8 sub-steps of 1/120 s were run; the rest was dropped
        let t = 8.0 / 120.0;
        assert!((state.velocity.y - 981.0 * t).abs() < 1e-2);
        assert!(report.dropped > 0.4);
    }

    #[test]
    fn test_remainder_carries_to_next_step() {
        let mut world = zero_gravity();
        assert_eq!(world.step(1.0 / 240.0).sub_steps, 0);
        assert_eq!(world.step(1.0 / 240.0).sub_steps, 1);
        assert_eq!(world.step(1.0 / 60.0).sub_steps, 2);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut world = zero_gravity();
        assert_eq!(world.step(f32::NAN), StepReport::default());
        assert_eq!(world.step(-1.0), StepReport::default());
    }

    #[test]
    fn test_static_bodies_ignore_forces() {
        let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
        let wall = world
            .add_body(BodySpec::fixed(Shape::rectangle(10.0, 100.0)).with_position((50.0, 50.0)))
            .unwrap();
        world.apply_force(wall, (1000.0, 0.0));
        world.apply_impulse(wall, (1000.0, 0.0));
        world.step(0.1);
        let state = world.get_body_state(wall).unwrap();
        assert_eq!(state.position, Vec2::new(50.0, 50.0));
        assert_eq!(state.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_force_lasts_one_step() {
        let mut world = zero_gravity();
        let ball = world.add_body(BodySpec::dynamic(Shape::circle(1.0)).with_mass(2.0)).unwrap();
        world.apply_force(ball, (120.0, 0.0));
        world.step(1.0 / 120.0);
        let after_force = world.get_body_state(ball).unwrap().velocity.x;
        assert!((after_force - 0.5).abs() < 1e-4);

        world.step(1.0 / 120.0);
        assert_eq!(world.get_body_state(ball).unwrap().velocity.x, after_force);
    }

    #[test]
    fn test_reduced_policy_removes_bounce() {
        let bounce = |policy: MotionPolicy| {
            let mut world = World::new(
                WorldConfig::default().with_gravity(Vec2::ZERO).with_sleep(false),
                policy,
            )
            .unwrap();
            world
                .add_body(BodySpec::fixed(Shape::rectangle(200.0, 10.0)).with_position((0.0, 20.0)))
                .unwrap();
            let ball = world
                .add_body(
                    BodySpec::dynamic(Shape::circle(5.0))
                        .with_velocity((0.0, 200.0))
                        .with_restitution(1.0),
                )
                .unwrap();
            for _ in 0..12 {
                world.step(1.0 / 120.0);
            }
            world.get_body_state(ball).unwrap().velocity.y
        };

        assert!(bounce(MotionPolicy::Off) < -150.0);
        assert!(bounce(MotionPolicy::High).abs() < 1e-3);
    }

    #[test]
    fn test_spring_constraint_oscillates_around_rest_length() {
        let mut world = zero_gravity();
        let a = world.add_body(BodySpec::fixed(Shape::circle(1.0))).unwrap();
        let b = world
            .add_body(BodySpec::dynamic(Shape::circle(1.0)).with_position((100.0, 0.0)))
            .unwrap();
        let spring = kinetic_animation::SpringConfig::new(200.0, 30.0, 1.0);
        world
            .add_constraint(ConstraintSpec::spring(a, b, 50.0, spring))
            .unwrap()
            .unwrap();

        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }
        let x = world.get_body_state(b).unwrap().position.x;
        assert!((x - 50.0).abs() < 1.0, "settled at {x}");
    }

    #[test]
    fn test_distance_constraint_makes_a_pendulum() {
        let mut world = World::new(WorldConfig::default().with_sleep(false), MotionPolicy::Off).unwrap();
        let pivot = world
            .add_body(BodySpec::fixed(Shape::circle(2.0)).with_position((0.0, 0.0)))
            .unwrap();
        let bob = world
            .add_body(BodySpec::dynamic(Shape::circle(5.0)).with_position((80.0, 0.0)))
            .unwrap();
        world
            .add_constraint(ConstraintSpec::distance(pivot, bob, 80.0))
            .unwrap()
            .unwrap();

        for _ in 0..90 {
            world.step(1.0 / 60.0);
            let position = world.get_body_state(bob).unwrap().position;
            assert!((position.length() - 80.0).abs() < 0.5);
        }
    }

    #[test]
    fn test_removing_body_drops_its_constraints() {
        let mut world = zero_gravity();
        let a = world.add_body(BodySpec::dynamic(Shape::circle(1.0))).unwrap();
        let b = world
            .add_body(BodySpec::dynamic(Shape::circle(1.0)).with_position((10.0, 0.0)))
            .unwrap();
        world.add_constraint(ConstraintSpec::distance(a, b, 10.0)).unwrap();
        assert_eq!(world.constraint_count(), 1);

        assert!(world.remove_body(a));
        assert_eq!(world.constraint_count(), 0);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.get_body_state(b).unwrap().position, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_collision_listener_sees_each_contact() {
        let mut world = zero_gravity();
        let a = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_velocity((60.0, 0.0)))
            .unwrap();
        let b = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((25.0, 0.0)))
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        world.on_collision(move |event, _| sink.lock().unwrap().push((event.body_a, event.body_b)));

        let mut contacts = 0;
        for _ in 0..30 {
            contacts += world.step(1.0 / 60.0).contacts;
        }
        assert!(contacts > 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), contacts);
        assert_eq!(seen[0], (a, b));
    }

    #[test]
    fn test_pair_mut_order() {
        let mut items = [1, 2, 3];
        let (x, y) = pair_mut(&mut items, 2, 0);
        assert_eq!((*x, *y), (3, 1));
    }
}
