//! Playback controller
//!
//! Drives a [`ResolvedTimeline`] from host ticks. Elapsed time is global
//! (it spans every repeat); the resolved timeline maps it to an iteration and
//! an iteration-local time, from which active and completed stages follow.
//!
//! Stage events are derived from region changes. Every stage is either
//! before, inside, or after its span at the current local time; moving into
//! the span fires `StageStarted`, leaving it fires `StageCompleted`, and
//! jumping over it fires both. This holds in either direction, so reverse
//! and yoyo plays report stages the same way forward plays do.
//!
//! Seeking is silent apart from completions: each stage that ends up after
//! its span and was not there before gets one `StageCompleted`, in timeline
//! order, followed by `Seeked`.

use super::events::{Direction, LifecycleEvent, PlaybackSnapshot, PlaybackState, TransportEvent};
use super::interceptor::{EventInterceptor, InterceptorChain};
use crate::timeline::{
    Pattern, Repeat, ResolvedStage, ResolvedTimeline, Stage, StageKind, TimelineResolver,
};
use kinetic_core::{MotionError, Result, SharedMotionPolicy, StateMachine};
use std::fmt;

type Listener = Box<dyn FnMut(&LifecycleEvent) + Send>;

/// Where the current local time sits relative to a stage span
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Before,
    Active,
    After,
}

impl Region {
    fn of(stage: &ResolvedStage, local_ms: f32) -> Self {
        if stage.is_completed_at(local_ms) {
            Region::After
        } else if stage.is_active_at(local_ms) {
            Region::Active
        } else {
            Region::Before
        }
    }
}

/// Definitions kept for re-resolution when the motion policy changes
struct TimelineSource {
    stages: Vec<Stage>,
    pattern: Pattern,
    policy: SharedMotionPolicy,
}

fn transport() -> StateMachine<PlaybackState, TransportEvent> {
    use PlaybackState::*;
    StateMachine::builder(Idle)
        .on_any(&[Idle, Paused, Finished], TransportEvent::Play, Playing)
        .on(Playing, TransportEvent::Pause, Paused)
        .on(Paused, TransportEvent::Resume, Playing)
        .on(Playing, TransportEvent::Complete, Finished)
        .on_any(&[Playing, Paused, Finished], TransportEvent::Stop, Idle)
        .build()
}

/// Transport and lifecycle events for one resolved timeline
pub struct PlaybackController {
    timeline: ResolvedTimeline,
    source: Option<TimelineSource>,
    transport: StateMachine<PlaybackState, TransportEvent>,
    elapsed_ms: f32,
    local_ms: f32,
    iteration: u32,
    direction: Direction,
    speed: f32,
    regions: Vec<Region>,
    interceptors: InterceptorChain,
    listeners: Vec<Listener>,
    pending: Vec<LifecycleEvent>,
}

impl PlaybackController {
    pub fn new(timeline: ResolvedTimeline) -> Self {
        let regions = vec![Region::Before; timeline.len()];
        Self {
            timeline,
            source: None,
            transport: transport(),
            elapsed_ms: 0.0,
            local_ms: 0.0,
            iteration: 0,
            direction: Direction::Forward,
            speed: 1.0,
            regions,
            interceptors: InterceptorChain::new(),
            listeners: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Resolve `stages` under the current value of `policy`, keeping the
    /// definitions so [`refresh_policy`](Self::refresh_policy) can re-resolve
    pub fn with_policy(policy: SharedMotionPolicy, stages: Vec<Stage>, pattern: Pattern) -> Result<Self> {
        let timeline = TimelineResolver::new(policy.get()).resolve(&stages, &pattern)?;
        let mut controller = Self::new(timeline);
        controller.source = Some(TimelineSource {
            stages,
            pattern,
            policy,
        });
        Ok(controller)
    }

    /// Re-resolve if the shared policy changed since the last resolution.
    /// Playback progress is preserved. Returns whether anything changed.
    pub fn refresh_policy(&mut self) -> Result<bool> {
        let Some(source) = &self.source else {
            return Ok(false);
        };
        let policy = source.policy.get();
        if policy == self.timeline.policy() {
            return Ok(false);
        }

        let timeline = TimelineResolver::new(policy)
            .with_repeat(self.timeline.repeat())
            .resolve(&source.stages, &source.pattern)?;
        let progress = self.progress();
        tracing::debug!(
            "motion policy changed to {}: iteration {}ms -> {}ms",
            policy,
            self.timeline.iteration_duration(),
            timeline.iteration_duration()
        );

        self.timeline = timeline;
        let position = self.position_for_progress(progress);
        self.relocate(position);
        Ok(true)
    }

    /// Replace the timeline-level repeat directive, keeping the elapsed time
    pub fn set_repeat(&mut self, repeat: Repeat) -> Result<()> {
        self.timeline = self.timeline.clone().with_repeat(repeat)?;
        let position = self.elapsed_ms.min(self.timeline.total_duration());
        self.relocate(position);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    pub fn on_event<F: FnMut(&LifecycleEvent) + Send + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    pub fn on_start<F: FnMut() + Send + 'static>(&mut self, mut callback: F) {
        self.on_event(move |event| {
            if matches!(event, LifecycleEvent::Started) {
                callback();
            }
        });
    }

    pub fn on_update<F: FnMut(f32) + Send + 'static>(&mut self, mut callback: F) {
        self.on_event(move |event| {
            if let LifecycleEvent::Update { progress, .. } = event {
                callback(*progress);
            }
        });
    }

    pub fn on_complete<F: FnMut() + Send + 'static>(&mut self, mut callback: F) {
        self.on_event(move |event| {
            if matches!(event, LifecycleEvent::Completed) {
                callback();
            }
        });
    }

    /// Append an interceptor to the lifecycle channel
    pub fn add_interceptor<I: EventInterceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.push(interceptor);
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Start or resume playback. A finished controller restarts from the
    /// beginning of the current direction.
    pub fn play(&mut self) {
        match self.state() {
            PlaybackState::Playing => return,
            PlaybackState::Paused => return self.resume(),
            PlaybackState::Idle | PlaybackState::Finished => {
                if self.at_end() {
                    self.rewind();
                }
            }
        }
        if self.transport.send(TransportEvent::Play).is_none() {
            return;
        }
        tracing::debug!("playback started at {}ms ({:?})", self.elapsed_ms, self.direction);
        self.pending.push(LifecycleEvent::Started);
        // Zero-length stages at the starting point fire right away
        self.sweep(self.local_ms);
        self.check_completion();
        self.flush();
    }

    pub fn pause(&mut self) {
        if self.transport.send(TransportEvent::Pause).is_some() {
            self.pending.push(LifecycleEvent::Paused);
            self.flush();
        }
    }

    pub fn resume(&mut self) {
        if self.transport.send(TransportEvent::Resume).is_some() {
            self.pending.push(LifecycleEvent::Resumed);
            self.flush();
        }
    }

    /// Return to idle at the start of the timeline
    pub fn stop(&mut self) {
        if self.transport.send(TransportEvent::Stop).is_none() {
            return;
        }
        self.elapsed_ms = 0.0;
        self.iteration = 0;
        self.prime(0.0);
        self.pending.push(LifecycleEvent::Stopped);
        self.flush();
    }

    /// Hard reset: idle, start of timeline, forward, normal speed. No events.
    pub fn reset(&mut self) {
        self.transport.restart();
        self.elapsed_ms = 0.0;
        self.iteration = 0;
        self.direction = Direction::Forward;
        self.speed = 1.0;
        self.prime(0.0);
        self.pending.clear();
    }

    /// Jump to a global elapsed time, clamped to the timeline
    pub fn seek(&mut self, elapsed_ms: f32) -> Result<()> {
        let requested = MotionError::ensure_finite("seek time", elapsed_ms)?;
        let target = requested.clamp(0.0, self.timeline.total_duration());
        let (iteration, local) = self.timeline.iteration_at(target);

        for (i, stage) in self.timeline.stages().enumerate() {
            let region = Region::of(stage, local);
            if region == Region::After && self.regions[i] != Region::After {
                self.pending.push(LifecycleEvent::StageCompleted {
                    stage: stage.id.clone(),
                });
            }
            self.regions[i] = region;
        }
        self.elapsed_ms = target;
        self.iteration = iteration;
        self.local_ms = local;
        self.pending.push(LifecycleEvent::Seeked { to_ms: target });

        self.check_completion();
        self.flush();
        Ok(())
    }

    /// Seek to a fraction of the total duration (of the current iteration
    /// when repeating forever)
    pub fn seek_progress(&mut self, progress: f32) -> Result<()> {
        let progress = MotionError::ensure_finite("seek progress", progress)?.clamp(0.0, 1.0);
        self.seek(self.position_for_progress(progress))
    }

    /// Flip the playback direction without moving
    pub fn reverse(&mut self) {
        self.direction = self.direction.flipped();
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn set_speed(&mut self, speed: f32) -> Result<()> {
        self.speed = MotionError::ensure_positive("playback speed", speed)?;
        Ok(())
    }

    /// Advance playback by `dt_ms` of host time
    pub fn tick(&mut self, dt_ms: f32) -> PlaybackSnapshot {
        if self.state() != PlaybackState::Playing {
            return self.snapshot();
        }
        if !dt_ms.is_finite() || dt_ms < 0.0 {
            tracing::warn!("ignoring playback tick with dt {}ms", dt_ms);
            return self.snapshot();
        }

        let step = dt_ms * self.speed;
        let target = match self.direction {
            Direction::Forward => (self.elapsed_ms + step).min(self.timeline.total_duration()),
            Direction::Reverse => (self.elapsed_ms - step).max(0.0),
        };
        self.advance_to(target);
        self.pending.push(LifecycleEvent::Update {
            progress: self.progress(),
            elapsed_ms: self.elapsed_ms,
        });
        self.check_completion();
        self.flush();
        self.snapshot()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.transport.current_state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_in(PlaybackState::Playing)
    }

    pub fn is_finished(&self) -> bool {
        self.transport.is_in(PlaybackState::Finished)
    }

    pub fn timeline(&self) -> &ResolvedTimeline {
        &self.timeline
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed_ms
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// `elapsed / total`, or progress through the current iteration when
    /// repeating forever
    pub fn progress(&self) -> f32 {
        let total = self.timeline.total_duration();
        if total.is_infinite() {
            let iteration = self.timeline.iteration_duration();
            return if iteration > 0.0 {
                (self.local_ms / iteration).clamp(0.0, 1.0)
            } else {
                1.0
            };
        }
        if total <= 0.0 {
            return if self.is_finished() { 1.0 } else { 0.0 };
        }
        (self.elapsed_ms / total).clamp(0.0, 1.0)
    }

    /// Current value of a tween or spring stage
    pub fn value(&self, stage: &str) -> Option<f32> {
        self.timeline.value_at(stage, self.local_ms)
    }

    pub fn active_stages(&self) -> Vec<String> {
        self.stages_in(Region::Active)
    }

    pub fn completed_stages(&self) -> Vec<String> {
        self.stages_in(Region::After)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state(),
            progress: self.progress(),
            elapsed_ms: self.elapsed_ms,
            iteration: self.iteration,
            direction: self.direction,
            active_stages: self.active_stages(),
            completed_stages: self.completed_stages(),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn stages_in(&self, region: Region) -> Vec<String> {
        self.timeline
            .stages()
            .zip(&self.regions)
            .filter(|(_, r)| **r == region)
            .map(|(stage, _)| stage.id.clone())
            .collect()
    }

    fn at_end(&self) -> bool {
        match self.direction {
            Direction::Forward => self.elapsed_ms >= self.timeline.total_duration(),
            Direction::Reverse => self.elapsed_ms <= 0.0,
        }
    }

    /// Move to the starting edge for the current direction
    fn rewind(&mut self) {
        let start = match self.direction {
            Direction::Forward => 0.0,
            Direction::Reverse => {
                let total = self.timeline.total_duration();
                if total.is_finite() {
                    total
                } else {
                    0.0
                }
            }
        };
        let (iteration, local) = self.timeline.iteration_at(start);
        self.elapsed_ms = start;
        self.iteration = iteration;
        self.prime(local);
    }

    fn position_for_progress(&self, progress: f32) -> f32 {
        let total = self.timeline.total_duration();
        if total.is_finite() {
            return progress * total;
        }
        let iteration = self.timeline.iteration_duration();
        let cycle = iteration + self.timeline.repeat().delay_ms;
        self.iteration as f32 * cycle + progress * iteration
    }

    /// Silently place playback at `elapsed_ms`
    fn relocate(&mut self, elapsed_ms: f32) {
        let (iteration, local) = self.timeline.iteration_at(elapsed_ms);
        self.elapsed_ms = elapsed_ms;
        self.iteration = iteration;
        self.local_ms = local;
        self.regions = self
            .timeline
            .stages()
            .map(|stage| Region::of(stage, local))
            .collect();
    }

    /// Local time at the (first, last) moment of iteration `k`
    fn iteration_edges(&self, k: u32) -> (f32, f32) {
        let length = self.timeline.iteration_duration();
        if self.timeline.repeat().yoyo && k % 2 == 1 {
            (length, 0.0)
        } else {
            (0.0, length)
        }
    }

    /// Enter an iteration at `local_ms` with every stage still ahead
    fn prime(&mut self, local_ms: f32) {
        let region = if local_ms <= 0.0 {
            Region::Before
        } else {
            Region::After
        };
        self.regions.clear();
        self.regions.resize(self.timeline.len(), region);
        self.local_ms = local_ms;
    }

    fn advance_to(&mut self, elapsed_ms: f32) {
        let (target_iteration, local) = self.timeline.iteration_at(elapsed_ms);

        while self.iteration < target_iteration {
            let (_, end) = self.iteration_edges(self.iteration);
            self.sweep(end);
            self.iteration += 1;
            let (start, _) = self.iteration_edges(self.iteration);
            self.prime(start);
            self.pending.push(LifecycleEvent::Repeated {
                iteration: self.iteration,
            });
        }
        while self.iteration > target_iteration {
            let (start, _) = self.iteration_edges(self.iteration);
            self.sweep(start);
            self.iteration -= 1;
            let (_, end) = self.iteration_edges(self.iteration);
            self.prime(end);
            self.pending.push(LifecycleEvent::Repeated {
                iteration: self.iteration,
            });
        }

        self.sweep(local);
        self.elapsed_ms = elapsed_ms;
    }

    /// Move local time to `target`, queueing stage events for every region change
    fn sweep(&mut self, target: f32) {
        let increasing = target >= self.local_ms;
        let count = self.regions.len();
        for step in 0..count {
            let i = if increasing { step } else { count - 1 - step };
            let Some(stage) = self.timeline.stage_at(i) else {
                continue;
            };
            let old = self.regions[i];
            let new = Region::of(stage, target);
            if old == new {
                continue;
            }

            let jumped = old != Region::Active && new != Region::Active;
            if new == Region::Active || jumped {
                self.pending.push(LifecycleEvent::StageStarted {
                    stage: stage.id.clone(),
                });
                if let StageKind::Event { name } = &stage.kind {
                    self.pending.push(LifecycleEvent::Marker {
                        stage: stage.id.clone(),
                        name: name.clone(),
                    });
                }
            }
            if old == Region::Active || jumped {
                self.pending.push(LifecycleEvent::StageCompleted {
                    stage: stage.id.clone(),
                });
            }
            self.regions[i] = new;
        }
        self.local_ms = target;
    }

    fn check_completion(&mut self) {
        if self.is_playing() && self.at_end() {
            self.transport.send(TransportEvent::Complete);
            tracing::debug!("playback completed at {}ms", self.elapsed_ms);
            self.pending.push(LifecycleEvent::Completed);
        }
    }

    fn flush(&mut self) {
        for event in std::mem::take(&mut self.pending) {
            let Some(event) = self.interceptors.run(event) else {
                continue;
            };
            for listener in &mut self.listeners {
                listener(&event);
            }
        }
    }
}

impl fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state())
            .field("elapsed_ms", &self.elapsed_ms)
            .field("iteration", &self.iteration)
            .field("direction", &self.direction)
            .field("stages", &self.timeline.len())
            .field("interceptors", &self.interceptors)
            .finish()
    }
}
