//! Playback states, lifecycle events and snapshots

use serde::Serialize;

/// Transport state of a playback controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
}

/// Inputs to the transport state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TransportEvent {
    Play,
    Pause,
    Resume,
    Complete,
    Stop,
}

/// Direction elapsed time moves while playing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Events emitted on the playback lifecycle channel
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started,
    /// Emitted once per tick while playing
    Update { progress: f32, elapsed_ms: f32 },
    StageStarted { stage: String },
    StageCompleted { stage: String },
    /// An event stage was reached
    Marker { stage: String, name: String },
    /// A new timeline iteration began
    Repeated { iteration: u32 },
    Paused,
    Resumed,
    Stopped,
    Completed,
    Seeked { to_ms: f32 },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Started => "started",
            LifecycleEvent::Update { .. } => "update",
            LifecycleEvent::StageStarted { .. } => "stage_started",
            LifecycleEvent::StageCompleted { .. } => "stage_completed",
            LifecycleEvent::Marker { .. } => "marker",
            LifecycleEvent::Repeated { .. } => "repeated",
            LifecycleEvent::Paused => "paused",
            LifecycleEvent::Resumed => "resumed",
            LifecycleEvent::Stopped => "stopped",
            LifecycleEvent::Completed => "completed",
            LifecycleEvent::Seeked { .. } => "seeked",
        }
    }
}

/// Per-tick view of a playback controller for the host renderer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub progress: f32,
    pub elapsed_ms: f32,
    pub iteration: u32,
    pub direction: Direction,
    pub active_stages: Vec<String>,
    pub completed_stages: Vec<String>,
}
