//! Timeline documents
//!
//! ```toml
//! pattern = { type = "staggered", delay_ms = 80.0 }
//! repeat = { count = { times = 1 }, delay_ms = 200.0 }
//!
//! [[stages]]
//! id = "header"
//! duration_ms = 300.0
//!
//! [[stages]]
//! id = "cards"
//! duration_ms = 400.0
//! depends_on = ["header"]
//! ```

use anyhow::{Context, Result};
use kinetic_animation::{
    FixedClock, FrameClock, LifecycleEvent, LoggingInterceptor, Pattern, PlaybackController,
    PlaybackState, RelationOptions, Repeat, ResolvedTimeline, Stage, StaggerOptions,
    TimelineResolver,
};
use kinetic_core::MotionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest playback the CLI will drive, ms
const MAX_PLAY_MS: f32 = 600_000.0;

/// Serializable subset of [`Pattern`]; custom timing needs code
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternDoc {
    #[default]
    Sequential,
    Parallel,
    Staggered(StaggerOptions),
    Relation(RelationOptions),
}

impl From<PatternDoc> for Pattern {
    fn from(doc: PatternDoc) -> Self {
        match doc {
            PatternDoc::Sequential => Pattern::Sequential,
            PatternDoc::Parallel => Pattern::Parallel,
            PatternDoc::Staggered(options) => Pattern::Staggered(options),
            PatternDoc::Relation(options) => Pattern::Relation(options),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineDoc {
    #[serde(default)]
    pub pattern: PatternDoc,
    #[serde(default)]
    pub repeat: Repeat,
    pub stages: Vec<Stage>,
}

impl TimelineDoc {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(&self, policy: MotionPolicy) -> Result<ResolvedTimeline> {
        let timeline = TimelineResolver::new(policy)
            .with_repeat(self.repeat)
            .resolve(&self.stages, &self.pattern.into())
            .context("Failed to resolve timeline")?;
        Ok(timeline)
    }
}

#[derive(Serialize)]
struct StageRow<'a> {
    id: &'a str,
    start_ms: f32,
    end_ms: f32,
    duration_ms: f32,
    delay_ms: f32,
    depends_on: &'a [String],
}

#[derive(Serialize)]
struct TimelineSummary<'a> {
    policy: String,
    iteration_ms: f32,
    /// `null` when the timeline repeats forever
    total_ms: Option<f32>,
    stages: Vec<StageRow<'a>>,
}

fn summarize(timeline: &ResolvedTimeline, policy: MotionPolicy) -> TimelineSummary<'_> {
    let total = timeline.total_duration();
    TimelineSummary {
        policy: policy.to_string(),
        iteration_ms: timeline.iteration_duration(),
        total_ms: total.is_finite().then_some(total),
        stages: timeline
            .stages()
            .map(|stage| StageRow {
                id: &stage.id,
                start_ms: stage.start_ms,
                end_ms: stage.end_ms,
                duration_ms: stage.duration_ms,
                delay_ms: stage.delay_ms,
                depends_on: &stage.depends_on,
            })
            .collect(),
    }
}

/// Print the resolved timeline and, with `play`, every lifecycle event
pub fn run(doc: &TimelineDoc, policy: MotionPolicy, play: bool, fps: u32) -> Result<()> {
    let timeline = doc.resolve(policy)?;
    println!("{}", serde_json::to_string_pretty(&summarize(&timeline, policy))?);
    if play {
        drive(timeline, fps, MAX_PLAY_MS, |event| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!("could not encode {}: {}", event.name(), err),
        });
    }
    Ok(())
}

/// Play `timeline` to completion on a fixed clock, handing every event except
/// per-tick updates to `sink`. Playback longer than `limit_ms` is stopped.
fn drive<F>(timeline: ResolvedTimeline, fps: u32, limit_ms: f32, sink: F) -> PlaybackState
where
    F: FnMut(&LifecycleEvent) + Send + 'static,
{
    let mut playback = PlaybackController::new(timeline);
    playback.add_interceptor(LoggingInterceptor::new("kinetic"));
    playback.add_interceptor(|event: LifecycleEvent| match event {
        LifecycleEvent::Update { .. } => None,
        other => Some(other),
    });
    playback.on_event(sink);

    let mut clock = FixedClock::from_fps(fps);
    playback.play();
    while playback.state() == PlaybackState::Playing {
        let dt_ms = clock.delta() * 1000.0;
        playback.tick(dt_ms);
        if clock.now() * 1000.0 > limit_ms && playback.state() == PlaybackState::Playing {
            tracing::warn!("stopping after {}s of playback", limit_ms / 1000.0);
            playback.stop();
        }
    }
    playback.state()
}
