//! Animation scheduler
//!
//! Owns springs, multi-springs and playback controllers and advances them
//! all from one host tick. Defaults come from the injected
//! [`AnimationContext`].

use crate::clock::FrameClock;
use crate::context::AnimationContext;
use crate::playback::PlaybackController;
use crate::spring::{MultiSpring, Spring, SpringStatus};
use crate::timeline::Stage;
use kinetic_core::Result;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct SpringId;
    pub struct MultiSpringId;
    pub struct PlaybackId;
}

/// What changed during one scheduler tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Springs (single or multi) that came to rest this tick
    pub settled: usize,
    /// Springs still moving after the tick
    pub animating: usize,
    /// Playback controllers still playing after the tick
    pub playing: usize,
}

/// The animation scheduler that ticks all active animations
pub struct AnimationScheduler {
    context: AnimationContext,
    springs: SlotMap<SpringId, Spring>,
    multi_springs: SlotMap<MultiSpringId, MultiSpring>,
    playbacks: SlotMap<PlaybackId, PlaybackController>,
}

impl AnimationScheduler {
    pub fn new(context: AnimationContext) -> Self {
        Self {
            context,
            springs: SlotMap::with_key(),
            multi_springs: SlotMap::with_key(),
            playbacks: SlotMap::with_key(),
        }
    }

    pub fn context(&self) -> &AnimationContext {
        &self.context
    }

    // ------------------------------------------------------------------------
    // Springs
    // ------------------------------------------------------------------------

    pub fn add_spring(&mut self, spring: Spring) -> SpringId {
        self.springs.insert(spring)
    }

    /// Spring at `initial` using the context's default configuration
    pub fn spawn_spring(&mut self, initial: f32) -> SpringId {
        let spring = Spring::new(self.context.spring_config(), initial);
        self.springs.insert(spring)
    }

    pub fn get_spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(id)
    }

    pub fn get_spring_mut(&mut self, id: SpringId) -> Option<&mut Spring> {
        self.springs.get_mut(id)
    }

    pub fn remove_spring(&mut self, id: SpringId) -> Option<Spring> {
        self.springs.remove(id)
    }

    pub fn add_multi_spring(&mut self, spring: MultiSpring) -> MultiSpringId {
        self.multi_springs.insert(spring)
    }

    pub fn spawn_multi_spring(&mut self, initial: &[f32]) -> MultiSpringId {
        let spring = MultiSpring::new(self.context.spring_config(), initial);
        self.multi_springs.insert(spring)
    }

    pub fn get_multi_spring(&self, id: MultiSpringId) -> Option<&MultiSpring> {
        self.multi_springs.get(id)
    }

    pub fn get_multi_spring_mut(&mut self, id: MultiSpringId) -> Option<&mut MultiSpring> {
        self.multi_springs.get_mut(id)
    }

    pub fn remove_multi_spring(&mut self, id: MultiSpringId) -> Option<MultiSpring> {
        self.multi_springs.remove(id)
    }

    // ------------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------------

    pub fn add_playback(&mut self, playback: PlaybackController) -> PlaybackId {
        self.playbacks.insert(playback)
    }

    /// Resolve `stages` with the context's pattern and policy and register a controller
    pub fn spawn_timeline(&mut self, stages: Vec<Stage>) -> Result<PlaybackId> {
        let playback = PlaybackController::with_policy(
            self.context.policy.clone(),
            stages,
            self.context.pattern.clone(),
        )?;
        Ok(self.playbacks.insert(playback))
    }

    pub fn get_playback(&self, id: PlaybackId) -> Option<&PlaybackController> {
        self.playbacks.get(id)
    }

    pub fn get_playback_mut(&mut self, id: PlaybackId) -> Option<&mut PlaybackController> {
        self.playbacks.get_mut(id)
    }

    pub fn remove_playback(&mut self, id: PlaybackId) -> Option<PlaybackController> {
        self.playbacks.remove(id)
    }

    /// Re-resolve every controller whose timeline predates a policy change
    pub fn refresh_policy(&mut self) -> Result<usize> {
        let mut refreshed = 0;
        for (_, playback) in self.playbacks.iter_mut() {
            if playback.refresh_policy()? {
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    // ------------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------------

    /// Tick all animations by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();

        for (_, spring) in self.springs.iter_mut() {
            match spring.step(dt) {
                SpringStatus::Settled => report.settled += 1,
                SpringStatus::Active => report.animating += 1,
                SpringStatus::Idle => {}
            }
        }
        for (_, spring) in self.multi_springs.iter_mut() {
            match spring.step(dt) {
                SpringStatus::Settled => report.settled += 1,
                SpringStatus::Active => report.animating += 1,
                SpringStatus::Idle => {}
            }
        }

        let dt_ms = dt * 1000.0;
        for (_, playback) in self.playbacks.iter_mut() {
            playback.tick(dt_ms);
            if playback.is_playing() {
                report.playing += 1;
            }
        }

        tracing::trace!("scheduler tick {:.4}s: {:?}", dt, report);
        report
    }

    /// Tick with the next delta from `clock`
    pub fn tick_clock<C: FrameClock>(&mut self, clock: &mut C) -> TickReport {
        let dt = clock.delta();
        self.tick(dt)
    }

    /// Check if any animations are still active
    pub fn has_active_animations(&self) -> bool {
        self.springs.iter().any(|(_, s)| s.is_animating())
            || self.multi_springs.iter().any(|(_, s)| s.is_animating())
            || self.playbacks.iter().any(|(_, p)| p.is_playing())
    }

    /// Iterate over all springs (immutable)
    pub fn springs_iter(&self) -> impl Iterator<Item = (SpringId, &Spring)> {
        self.springs.iter()
    }

    pub fn playbacks_iter(&self) -> impl Iterator<Item = (PlaybackId, &PlaybackController)> {
        self.playbacks.iter()
    }

    /// Get the number of springs in the scheduler
    pub fn spring_count(&self) -> usize {
        self.springs.len() + self.multi_springs.len()
    }

    pub fn playback_count(&self) -> usize {
        self.playbacks.len()
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(AnimationContext::default())
    }
}
