//! Timeline playback
//!
//! A [`PlaybackController`] turns host ticks into transport state, stage
//! activity and lifecycle events. Events pass through an interceptor chain
//! before reaching listeners.

mod controller;
mod events;
mod interceptor;

pub use controller::PlaybackController;
pub use events::{Direction, LifecycleEvent, PlaybackSnapshot, PlaybackState};
pub use interceptor::{EventInterceptor, InterceptorChain, LoggingInterceptor, ThrottleUpdates};
