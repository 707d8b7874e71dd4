//! Timeline orchestration
//!
//! Stages are declared as plain data, then resolved once into a
//! [`ResolvedTimeline`] of concrete offsets that playback controllers read.

mod pattern;
mod resolver;
mod stage;

pub use pattern::{
    CustomTiming, Pattern, RelationMode, RelationOptions, StaggerFrom, StaggerOptions,
};
pub use resolver::{
    resolve, Repeat, RepeatCount, ResolvedStage, ResolvedTimeline, TimelineResolver,
};
pub use stage::{ReducedStage, Stage, StageKind};
