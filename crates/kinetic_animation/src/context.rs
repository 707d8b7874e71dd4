//! Injected animation defaults
//!
//! Replaces an ambient global context: whoever builds springs or timelines
//! receives an [`AnimationContext`] and reads defaults from it.

use crate::spring::SpringConfig;
use crate::timeline::{Pattern, Stage, TimelineResolver};
use kinetic_core::{MotionPolicy, Result, SharedMotionPolicy};

/// Defaults shared by everything an [`AnimationScheduler`](crate::AnimationScheduler) creates
#[derive(Clone, Debug, Default)]
pub struct AnimationContext {
    pub policy: SharedMotionPolicy,
    /// Spring configuration used when a caller does not pass one
    pub spring: SpringConfig,
    /// Pattern used when a caller does not pass one
    pub pattern: Pattern,
}

impl AnimationContext {
    pub fn new(policy: SharedMotionPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn with_spring(mut self, spring: SpringConfig) -> Self {
        self.spring = spring;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Current policy value
    pub fn motion_policy(&self) -> MotionPolicy {
        self.policy.get()
    }

    /// Default spring adjusted for the current policy
    pub fn spring_config(&self) -> SpringConfig {
        self.spring.with_policy(self.motion_policy())
    }

    pub fn resolver(&self) -> TimelineResolver {
        TimelineResolver::new(self.motion_policy())
    }

    /// Resolve with the default pattern under the current policy
    pub fn resolve(&self, stages: &[Stage]) -> Result<crate::timeline::ResolvedTimeline> {
        self.resolver().resolve(stages, &self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_reads_policy_on_demand() {
        let policy = SharedMotionPolicy::new(MotionPolicy::Off);
        let context = AnimationContext::new(policy.clone()).with_spring(SpringConfig::wobbly());
        assert_eq!(context.spring_config(), SpringConfig::wobbly());

        policy.set(MotionPolicy::High);
        assert!(!context.spring_config().is_underdamped());

        let timeline = context.resolve(&[Stage::new("a", 100.0)]).unwrap();
        assert_eq!(timeline.iteration_duration(), 0.0);
    }
}
