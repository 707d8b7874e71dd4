//! Motion policy adapter
//!
//! Hosts detect reduced-motion preferences however they like (platform
//! settings, user toggles) and hand the result to Kinetic as a single
//! `MotionPolicy`. This module maps that value to per-subsystem scaling.
//! Nothing here reads ambient state: the policy is injected at construction
//! and re-queried on demand through [`SharedMotionPolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Reduced-motion intensity requested by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPolicy {
    /// Full motion
    #[default]
    Off,
    Low,
    Medium,
    /// Motion collapses to its end state
    High,
}

/// Spring parameter scaling for a policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringScaling {
    /// Multiplier applied to stiffness
    pub stiffness: f32,
    /// Minimum damping ratio (1.0 = critically damped)
    pub damping_ratio_floor: f32,
}

/// Physics parameter scaling for a policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsScaling {
    /// Multiplier applied to combined restitution
    pub restitution: f32,
    /// Multiplier applied to spring constraint stiffness
    pub stiffness: f32,
    /// Minimum damping ratio for spring constraints
    pub damping_ratio_floor: f32,
}

impl MotionPolicy {
    pub const ALL: [MotionPolicy; 4] = [
        MotionPolicy::Off,
        MotionPolicy::Low,
        MotionPolicy::Medium,
        MotionPolicy::High,
    ];

    /// Whether any reduction is requested
    pub fn is_reduced(&self) -> bool {
        !matches!(self, MotionPolicy::Off)
    }

    /// Multiplier applied to every duration and delay
    pub fn duration_scale(&self) -> f32 {
        match self {
            MotionPolicy::Off => 1.0,
            MotionPolicy::Low => 0.75,
            MotionPolicy::Medium => 0.5,
            MotionPolicy::High => 0.0,
        }
    }

    /// Scale a duration in milliseconds
    pub fn scale_duration(&self, duration_ms: f32) -> f32 {
        duration_ms * self.duration_scale()
    }

    pub fn spring_scaling(&self) -> SpringScaling {
        match self {
            MotionPolicy::Off => SpringScaling {
                stiffness: 1.0,
                damping_ratio_floor: 0.0,
            },
            MotionPolicy::Low => SpringScaling {
                stiffness: 1.25,
                damping_ratio_floor: 0.7,
            },
            MotionPolicy::Medium => SpringScaling {
                stiffness: 1.5,
                damping_ratio_floor: 0.85,
            },
            MotionPolicy::High => SpringScaling {
                stiffness: 2.0,
                damping_ratio_floor: 1.0,
            },
        }
    }

    pub fn physics_scaling(&self) -> PhysicsScaling {
        let spring = self.spring_scaling();
        let restitution = match self {
            MotionPolicy::Off => 1.0,
            MotionPolicy::Low => 0.75,
            MotionPolicy::Medium => 0.5,
            MotionPolicy::High => 0.0,
        };
        PhysicsScaling {
            restitution,
            stiffness: spring.stiffness,
            damping_ratio_floor: spring.damping_ratio_floor,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            MotionPolicy::Off => 0,
            MotionPolicy::Low => 1,
            MotionPolicy::Medium => 2,
            MotionPolicy::High => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MotionPolicy::Low,
            2 => MotionPolicy::Medium,
            3 => MotionPolicy::High,
            _ => MotionPolicy::Off,
        }
    }
}

impl From<bool> for MotionPolicy {
    /// Map a plain "prefers reduced motion" flag
    fn from(reduced: bool) -> Self {
        if reduced {
            MotionPolicy::High
        } else {
            MotionPolicy::Off
        }
    }
}

impl fmt::Display for MotionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionPolicy::Off => "off",
            MotionPolicy::Low => "low",
            MotionPolicy::Medium => "medium",
            MotionPolicy::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for MotionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(MotionPolicy::Off),
            "low" => Ok(MotionPolicy::Low),
            "medium" => Ok(MotionPolicy::Medium),
            "high" | "reduce" => Ok(MotionPolicy::High),
            other => Err(format!(
                "unknown motion policy `{other}` (expected off, low, medium or high)"
            )),
        }
    }
}

/// Shared, re-queryable motion policy
///
/// Cloning shares the underlying value: the host flips it once and every
/// subsystem holding a clone sees the new policy next time it asks.
#[derive(Clone, Debug, Default)]
pub struct SharedMotionPolicy {
    inner: Arc<AtomicU8>,
}

impl SharedMotionPolicy {
    pub fn new(policy: MotionPolicy) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(policy.to_u8())),
        }
    }

    pub fn get(&self) -> MotionPolicy {
        MotionPolicy::from_u8(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, policy: MotionPolicy) {
        let previous = self.inner.swap(policy.to_u8(), Ordering::Relaxed);
        if previous != policy.to_u8() {
            tracing::debug!("motion policy changed: {} -> {}", MotionPolicy::from_u8(previous), policy);
        }
    }
}

impl From<MotionPolicy> for SharedMotionPolicy {
    fn from(policy: MotionPolicy) -> Self {
        Self::new(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_scaling_is_monotonic() {
        let scales: Vec<f32> = MotionPolicy::ALL.iter().map(|p| p.duration_scale()).collect();
        assert!(scales.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(MotionPolicy::Off.scale_duration(400.0), 400.0);
        assert_eq!(MotionPolicy::High.scale_duration(400.0), 0.0);
    }

    #[test]
    fn test_springs_get_stiffer_and_less_bouncy() {
        let off = MotionPolicy::Off.spring_scaling();
        let high = MotionPolicy::High.spring_scaling();
        assert!(high.stiffness > off.stiffness);
        assert!(high.damping_ratio_floor > off.damping_ratio_floor);
        assert_eq!(MotionPolicy::High.physics_scaling().restitution, 0.0);
    }

    #[test]
    fn test_parse_and_display() {
        for policy in MotionPolicy::ALL {
            assert_eq!(policy.to_string().parse::<MotionPolicy>(), Ok(policy));
        }
        assert!("sideways".parse::<MotionPolicy>().is_err());
        assert_eq!(MotionPolicy::from(true), MotionPolicy::High);
    }

    #[test]
    fn test_shared_policy_requery() {
        let shared = SharedMotionPolicy::new(MotionPolicy::Off);
        let observer = shared.clone();
        assert!(!observer.get().is_reduced());

        shared.set(MotionPolicy::Medium);
        assert_eq!(observer.get(), MotionPolicy::Medium);
    }
}
