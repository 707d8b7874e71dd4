//! Spring physics animation
//!
//! Damped harmonic oscillators that drive one or more values toward a target.
//! Supports preset configurations, custom parameters, retargeting mid-flight
//! (velocity is inherited), and a completion callback fired when the spring
//! comes to rest.

use kinetic_core::{Integrator, MotionError, MotionPolicy, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Step used when estimating how long a spring takes to settle
const SETTLE_ESTIMATE_STEP: f32 = 1.0 / 120.0;

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
    /// Distance from target below which the spring may rest
    pub rest_displacement: f32,
    /// Speed below which the spring may rest
    pub rest_velocity: f32,
}

impl SpringConfig {
    /// Create a new spring configuration with default rest thresholds
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            ..Self::stiff()
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::preset(120.0, 14.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::preset(180.0, 12.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::preset(400.0, 30.0)
    }

    /// A very stiff spring with minimal oscillation (good for quick responses)
    pub fn snappy() -> Self {
        Self::preset(600.0, 40.0)
    }

    /// A slow spring with no overshoot (critically damped)
    pub fn molasses() -> Self {
        Self::preset(100.0, 20.0)
    }

    fn preset(stiffness: f32, damping: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass: 1.0,
            // Within 0.5 units and under 5 units/s is imperceptible for pixel values
            rest_displacement: 0.5,
            rest_velocity: 5.0,
        }
    }

    /// Builder: set rest thresholds (use small values for 0..1 properties like opacity)
    pub fn with_rest_thresholds(mut self, displacement: f32, velocity: f32) -> Self {
        self.rest_displacement = displacement;
        self.rest_velocity = velocity;
        self
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Ratio of damping to critical damping
    pub fn damping_ratio(&self) -> f32 {
        self.damping / self.critical_damping()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    /// Check if the spring is critically damped (no oscillation, fastest settling)
    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 0.01
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }

    /// Stiffen and damp the spring according to a motion policy
    pub fn with_policy(mut self, policy: MotionPolicy) -> Self {
        let scaling = policy.spring_scaling();
        self.stiffness *= scaling.stiffness;
        let floor = scaling.damping_ratio_floor * self.critical_damping();
        self.damping = self.damping.max(floor);
        self
    }

    /// Reject non-finite or non-physical parameters
    pub fn validate(&self) -> Result<()> {
        MotionError::ensure_positive("spring stiffness", self.stiffness)?;
        MotionError::ensure_non_negative("spring damping", self.damping)?;
        MotionError::ensure_positive("spring mass", self.mass)?;
        MotionError::ensure_non_negative("spring rest displacement", self.rest_displacement)?;
        MotionError::ensure_non_negative("spring rest velocity", self.rest_velocity)?;
        Ok(())
    }

    /// Simulated time (seconds) for a spring released at `from` with
    /// `velocity` to settle at `to`, capped at `max_secs`
    pub fn settle_time(&self, from: f32, to: f32, velocity: f32, max_secs: f32) -> f32 {
        let mut value = from;
        let mut vel = velocity;
        let mut t = 0.0;
        while t < max_secs {
            if self.is_at_rest(value, vel, to) {
                return t;
            }
            (value, vel) = advance(self, Integrator::Rk4, value, vel, to, SETTLE_ESTIMATE_STEP);
            t += SETTLE_ESTIMATE_STEP;
        }
        max_secs
    }

    /// Value of a spring released at rest from `from` toward `to`, `t` seconds in
    pub fn sample(&self, from: f32, to: f32, t: f32) -> f32 {
        let mut value = from;
        let mut vel = 0.0;
        let mut elapsed = 0.0;
        while elapsed < t {
            if self.is_at_rest(value, vel, to) {
                return to;
            }
            let dt = SETTLE_ESTIMATE_STEP.min(t - elapsed);
            (value, vel) = advance(self, Integrator::Rk4, value, vel, to, dt);
            elapsed += dt;
        }
        value
    }

    fn is_at_rest(&self, value: f32, velocity: f32, target: f32) -> bool {
        (target - value).abs() < self.rest_displacement && velocity.abs() < self.rest_velocity
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// Hooke's law with viscous damping: `-k * x - c * v`
pub fn spring_force(displacement: f32, velocity: f32, config: &SpringConfig) -> f32 {
    -config.stiffness * displacement - config.damping * velocity
}

fn advance(
    config: &SpringConfig,
    integrator: Integrator,
    value: f32,
    velocity: f32,
    target: f32,
    dt: f32,
) -> (f32, f32) {
    integrator.advance(value, velocity, dt, |x: f32, v: f32| {
        spring_force(x - target, v, config) / config.mass
    })
}

/// Outcome delivered to a spring's completion callback
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringResult {
    /// `true` when the spring settled at its target, `false` when stopped early
    pub finished: bool,
    pub value: f32,
}

/// What happened during a call to [`Spring::step`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpringStatus {
    /// Still moving toward the target
    Active,
    /// Came to rest during this step
    Settled,
    /// Already at rest or stopped; nothing was integrated
    Idle,
}

/// Imperative retarget request
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringStart {
    pub to: f32,
    pub from: Option<f32>,
    pub velocity: Option<f32>,
}

impl SpringStart {
    pub fn to(to: f32) -> Self {
        Self {
            to,
            ..Default::default()
        }
    }

    pub fn from(mut self, from: f32) -> Self {
        self.from = Some(from);
        self
    }

    pub fn velocity(mut self, velocity: f32) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

type RestCallback = Box<dyn FnMut(SpringResult) + Send>;

/// A spring-based animator for a single value
pub struct Spring {
    config: SpringConfig,
    integrator: Integrator,
    value: f32,
    velocity: f32,
    target: f32,
    /// Simulated time since creation or the last `reset`
    elapsed: f32,
    resting: bool,
    stopped: bool,
    on_rest: Option<RestCallback>,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            integrator: Integrator::Rk4,
            value: initial,
            velocity: 0.0,
            target: initial,
            elapsed: 0.0,
            resting: true,
            stopped: false,
            on_rest: None,
        }
    }

    /// Builder: choose the integrator (RK4 by default)
    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Register the completion callback
    pub fn on_rest<F: FnMut(SpringResult) + Send + 'static>(&mut self, callback: F) {
        self.on_rest = Some(Box::new(callback));
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        if !self.is_settled() {
            self.resting = false;
            self.stopped = false;
        }
    }

    /// Retarget, optionally jumping to `from` and overriding velocity.
    /// Internal time keeps running.
    pub fn start(&mut self, start: SpringStart) {
        if let Some(from) = start.from {
            self.value = from;
        }
        if let Some(velocity) = start.velocity {
            self.velocity = velocity;
        }
        self.target = start.to;
        self.resting = false;
        self.stopped = false;
    }

    /// Freeze at the current value
    pub fn stop(&mut self) {
        if self.stopped || self.resting {
            return;
        }
        self.stopped = true;
        self.velocity = 0.0;
        self.notify(false);
    }

    /// Hard reset position and velocity (defaults to the current target)
    pub fn reset(&mut self, value: Option<f32>) {
        let value = value.unwrap_or(self.target);
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
        self.elapsed = 0.0;
        self.resting = true;
        self.stopped = false;
    }

    /// Check if the spring is within its rest thresholds
    pub fn is_settled(&self) -> bool {
        self.config.is_at_rest(self.value, self.velocity, self.target)
    }

    /// Whether the next `step` will integrate
    pub fn is_animating(&self) -> bool {
        !self.resting && !self.stopped
    }

    /// Advance the spring by `dt` seconds
    pub fn step(&mut self, dt: f32) -> SpringStatus {
        if !self.is_animating() {
            return SpringStatus::Idle;
        }
        if dt <= 0.0 || !dt.is_finite() {
            return SpringStatus::Active;
        }

        self.elapsed += dt;
        (self.value, self.velocity) = advance(
            &self.config,
            self.integrator,
            self.value,
            self.velocity,
            self.target,
            dt,
        );

        if !self.value.is_finite() || !self.velocity.is_finite() {
            tracing::warn!(
                "spring diverged (stiffness {}, dt {}); snapping to target",
                self.config.stiffness,
                dt
            );
            self.value = self.target;
            self.velocity = 0.0;
        }

        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            self.resting = true;
            self.notify(true);
            return SpringStatus::Settled;
        }

        SpringStatus::Active
    }

    fn notify(&mut self, finished: bool) {
        let value = self.value;
        if let Some(callback) = self.on_rest.as_mut() {
            callback(SpringResult { finished, value });
        }
    }
}

impl fmt::Debug for Spring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spring")
            .field("config", &self.config)
            .field("integrator", &self.integrator)
            .field("value", &self.value)
            .field("velocity", &self.velocity)
            .field("target", &self.target)
            .field("resting", &self.resting)
            .field("stopped", &self.stopped)
            .finish()
    }
}

// ============================================================================
// Multi-dimensional springs
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
struct Channel {
    value: f32,
    velocity: f32,
    target: f32,
}

/// Values delivered to a multi-spring completion callback
#[derive(Clone, Debug, PartialEq)]
pub struct MultiSpringResult {
    pub finished: bool,
    pub values: SmallVec<[f32; 4]>,
}

type MultiRestCallback = Box<dyn FnMut(&MultiSpringResult) + Send>;

/// Several values sharing one spring configuration (x/y, rgba, scale pairs).
/// Rests only when every channel is within its thresholds.
pub struct MultiSpring {
    config: SpringConfig,
    integrator: Integrator,
    channels: SmallVec<[Channel; 4]>,
    elapsed: f32,
    resting: bool,
    stopped: bool,
    on_rest: Option<MultiRestCallback>,
}

impl MultiSpring {
    pub fn new(config: SpringConfig, initial: &[f32]) -> Self {
        Self {
            config,
            integrator: Integrator::Rk4,
            channels: initial
                .iter()
                .map(|&value| Channel {
                    value,
                    velocity: 0.0,
                    target: value,
                })
                .collect(),
            elapsed: 0.0,
            resting: true,
            stopped: false,
            on_rest: None,
        }
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn on_rest<F: FnMut(&MultiSpringResult) + Send + 'static>(&mut self, callback: F) {
        self.on_rest = Some(Box::new(callback));
    }

    pub fn dimensions(&self) -> usize {
        self.channels.len()
    }

    pub fn values(&self) -> SmallVec<[f32; 4]> {
        self.channels.iter().map(|c| c.value).collect()
    }

    pub fn velocities(&self) -> SmallVec<[f32; 4]> {
        self.channels.iter().map(|c| c.velocity).collect()
    }

    pub fn targets(&self) -> SmallVec<[f32; 4]> {
        self.channels.iter().map(|c| c.target).collect()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Retarget every channel. Extra targets are ignored, missing ones keep their target.
    pub fn set_target(&mut self, targets: &[f32]) {
        for (channel, &target) in self.channels.iter_mut().zip(targets) {
            channel.target = target;
        }
        if !self.is_settled() {
            self.resting = false;
            self.stopped = false;
        }
    }

    /// Retarget with optional starting values and velocities
    pub fn start(&mut self, to: &[f32], from: Option<&[f32]>, velocity: Option<&[f32]>) {
        if let Some(from) = from {
            for (channel, &value) in self.channels.iter_mut().zip(from) {
                channel.value = value;
            }
        }
        if let Some(velocity) = velocity {
            for (channel, &v) in self.channels.iter_mut().zip(velocity) {
                channel.velocity = v;
            }
        }
        for (channel, &target) in self.channels.iter_mut().zip(to) {
            channel.target = target;
        }
        self.resting = false;
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        if self.stopped || self.resting {
            return;
        }
        self.stopped = true;
        for channel in &mut self.channels {
            channel.velocity = 0.0;
        }
        self.notify(false);
    }

    pub fn reset(&mut self, values: Option<&[f32]>) {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            let value = values
                .and_then(|v| v.get(i).copied())
                .unwrap_or(channel.target);
            *channel = Channel {
                value,
                velocity: 0.0,
                target: value,
            };
        }
        self.elapsed = 0.0;
        self.resting = true;
        self.stopped = false;
    }

    pub fn is_settled(&self) -> bool {
        self.channels
            .iter()
            .all(|c| self.config.is_at_rest(c.value, c.velocity, c.target))
    }

    pub fn is_animating(&self) -> bool {
        !self.resting && !self.stopped
    }

    pub fn step(&mut self, dt: f32) -> SpringStatus {
        if !self.is_animating() {
            return SpringStatus::Idle;
        }
        if dt <= 0.0 || !dt.is_finite() {
            return SpringStatus::Active;
        }

        self.elapsed += dt;
        for channel in &mut self.channels {
            let (value, velocity) = advance(
                &self.config,
                self.integrator,
                channel.value,
                channel.velocity,
                channel.target,
                dt,
            );
            if value.is_finite() && velocity.is_finite() {
                channel.value = value;
                channel.velocity = velocity;
            } else {
                tracing::warn!("multi-spring channel diverged; snapping to target");
                channel.value = channel.target;
                channel.velocity = 0.0;
            }
        }

        if self.is_settled() {
            for channel in &mut self.channels {
                channel.value = channel.target;
                channel.velocity = 0.0;
            }
            self.resting = true;
            self.notify(true);
            return SpringStatus::Settled;
        }

        SpringStatus::Active
    }

    fn notify(&mut self, finished: bool) {
        let result = MultiSpringResult {
            finished,
            values: self.values(),
        };
        if let Some(callback) = self.on_rest.as_mut() {
            callback(&result);
        }
    }
}

impl fmt::Debug for MultiSpring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiSpring")
            .field("config", &self.config)
            .field("values", &self.values())
            .field("targets", &self.targets())
            .field("resting", &self.resting)
            .finish()
    }
}
