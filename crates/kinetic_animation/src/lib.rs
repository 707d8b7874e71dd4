//! Kinetic Animation System
//!
//! Spring physics, timeline resolution, and playback orchestration.
//!
//! # Features
//!
//! - **Spring Physics**: damped oscillators with stiffness, damping, mass and rest thresholds
//! - **Timelines**: stage dependency graphs resolved against sequential,
//!   parallel, staggered, relation-based or custom timing patterns
//! - **Playback**: transport controls, seeking, repeats and an interceptor
//!   chain on the lifecycle channel
//! - **Reduced Motion**: every duration and spring reads one injected `MotionPolicy`
//!
//! # Example
//!
//! ```rust
//! use kinetic_animation::{resolve, Pattern, PlaybackController, Stage};
//!
//! let stages = vec![
//!     Stage::new("header", 200.0),
//!     Stage::new("body", 300.0).depends_on(["header"]).with_delay(100.0),
//! ];
//! let timeline = resolve(&stages, &Pattern::Sequential).unwrap();
//! assert_eq!(timeline.stage("body").unwrap().start_ms, 300.0);
//!
//! let mut playback = PlaybackController::new(timeline);
//! playback.play();
//! let snapshot = playback.tick(250.0);
//! assert!(snapshot.completed_stages.contains(&"header".to_string()));
//! ```

pub mod clock;
pub mod context;
pub mod easing;
pub mod playback;
pub mod scheduler;
pub mod spring;
pub mod timeline;

pub use clock::{FixedClock, FrameClock, SystemClock};
pub use context::AnimationContext;
pub use easing::Easing;
pub use kinetic_core::{MotionError, MotionPolicy, SharedMotionPolicy};
pub use playback::{
    Direction, EventInterceptor, LifecycleEvent, LoggingInterceptor, PlaybackController,
    PlaybackSnapshot, PlaybackState, ThrottleUpdates,
};
pub use scheduler::{AnimationScheduler, MultiSpringId, PlaybackId, SpringId, TickReport};
pub use spring::{
    spring_force, MultiSpring, MultiSpringResult, Spring, SpringConfig, SpringResult, SpringStart,
    SpringStatus,
};
pub use timeline::{
    resolve, CustomTiming, Pattern, ReducedStage, RelationMode, RelationOptions, Repeat,
    RepeatCount, ResolvedStage, ResolvedTimeline, Stage, StageKind, StaggerFrom, StaggerOptions,
    TimelineResolver,
};
