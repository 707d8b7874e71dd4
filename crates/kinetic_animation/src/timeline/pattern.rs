//! Timing patterns
//!
//! A pattern maps a list of stages to start offsets. `Sequential` chains
//! stages end-to-start and is resolved against stage ends by the resolver;
//! every other pattern yields a fixed offset per stage.

use super::stage::Stage;
use kinetic_core::{MotionError, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a stagger starts from
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StaggerFrom {
    /// First to last (sequential index)
    #[default]
    Start,
    /// Last to first
    End,
    /// From the middle index outward
    Center,
    /// Seeded jitter across the stagger range
    Random { seed: u64 },
    /// A straight wave front sweeping along `direction`; `spacing` units of
    /// distance count as one stagger step
    Wave { direction: Vec2, spacing: f32 },
    /// Rings expanding from `origin` (the first positioned stage when unset)
    Ripple { origin: Option<Vec2>, spacing: f32 },
}

/// Options for the staggered pattern
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaggerOptions {
    /// Delay per stagger step
    pub delay_ms: f32,
    pub from: StaggerFrom,
    /// Cap on the number of stagger steps
    pub limit: Option<usize>,
}

impl Default for StaggerOptions {
    fn default() -> Self {
        Self {
            delay_ms: 50.0,
            from: StaggerFrom::Start,
            limit: None,
        }
    }
}

impl StaggerOptions {
    pub fn new(delay_ms: f32) -> Self {
        Self {
            delay_ms,
            ..Default::default()
        }
    }

    pub fn from(mut self, from: StaggerFrom) -> Self {
        self.from = from;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Gestalt relation used by the relation pattern
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationMode {
    /// Delay grows with distance to `focal`, or to the nearest earlier stage
    Proximity { focal: Option<Vec2> },
    /// Stages sharing a category start together; each new category waits one step
    Similarity,
}

/// Options for the relation pattern
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationOptions {
    pub mode: RelationMode,
    pub base_delay_ms: f32,
    pub max_delay_ms: f32,
    /// Distance that maps to one `base_delay_ms`
    pub distance_unit: f32,
}

impl Default for RelationOptions {
    fn default() -> Self {
        Self {
            mode: RelationMode::Proximity { focal: None },
            base_delay_ms: 50.0,
            max_delay_ms: 1000.0,
            distance_unit: 100.0,
        }
    }
}

/// Caller-supplied delay function: `(stage, index, total) -> delay_ms`
#[derive(Clone)]
pub struct CustomTiming(Arc<dyn Fn(&Stage, usize, usize) -> f32 + Send + Sync>);

impl CustomTiming {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Stage, usize, usize) -> f32 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTiming(..)")
    }
}

/// Rule mapping stages to start offsets
#[derive(Clone, Debug, Default)]
pub enum Pattern {
    /// Each stage starts when the previous one (in list order) ends
    #[default]
    Sequential,
    /// Every stage starts together
    Parallel,
    Staggered(StaggerOptions),
    Relation(RelationOptions),
    /// Explicit delay plus a caller-computed offset
    Custom(CustomTiming),
}

impl Pattern {
    pub fn staggered(delay_ms: f32) -> Self {
        Pattern::Staggered(StaggerOptions::new(delay_ms))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Stage, usize, usize) -> f32 + Send + Sync + 'static,
    {
        Pattern::Custom(CustomTiming::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::Sequential => "sequential",
            Pattern::Parallel => "parallel",
            Pattern::Staggered(_) => "staggered",
            Pattern::Relation(_) => "relation",
            Pattern::Custom(_) => "custom",
        }
    }

    /// Whether offsets chain off previous stage ends
    pub fn is_chained(&self) -> bool {
        matches!(self, Pattern::Sequential)
    }

    /// Pattern offset for every stage. Chained patterns yield zeros; for
    /// `Custom` the offset is added to the stage's explicit delay by the resolver.
    pub(crate) fn fixed_offsets(&self, stages: &[Stage]) -> Result<Vec<f32>> {
        let total = stages.len();
        let offsets = match self {
            Pattern::Sequential | Pattern::Parallel => vec![0.0; total],
            Pattern::Staggered(options) => stagger_offsets(options, stages)?,
            Pattern::Relation(options) => relation_offsets(options, stages)?,
            Pattern::Custom(timing) => {
                let mut offsets = Vec::with_capacity(total);
                for (index, stage) in stages.iter().enumerate() {
                    let offset = (timing.0)(stage, index, total);
                    if !offset.is_finite() || offset < 0.0 {
                        return Err(MotionError::Configuration(format!(
                            "custom pattern returned {offset} for stage `{}`",
                            stage.id
                        )));
                    }
                    offsets.push(offset);
                }
                offsets
            }
        };
        Ok(offsets)
    }
}

fn stagger_offsets(options: &StaggerOptions, stages: &[Stage]) -> Result<Vec<f32>> {
    MotionError::ensure_non_negative("stagger delay", options.delay_ms)?;
    let total = stages.len();
    let last = total.saturating_sub(1);

    let steps: Vec<f32> = match options.from {
        StaggerFrom::Start => (0..total).map(|i| i as f32).collect(),
        StaggerFrom::End => (0..total).map(|i| (last - i) as f32).collect(),
        StaggerFrom::Center => {
            let center = total / 2;
            (0..total).map(|i| i.abs_diff(center) as f32).collect()
        }
        StaggerFrom::Random { seed } => {
            let mut rng = Lcg::new(seed);
            (0..total).map(|_| rng.next_unit() * last as f32).collect()
        }
        StaggerFrom::Wave { direction, spacing } => {
            let spacing = MotionError::ensure_positive("wave spacing", spacing)?;
            let direction = direction.normalize();
            if direction == Vec2::ZERO {
                return Err(MotionError::Configuration(
                    "wave direction must not be zero".to_string(),
                ));
            }
            let projections: Vec<Option<f32>> = stages
                .iter()
                .map(|s| s.position.map(|p| p.dot(direction)))
                .collect();
            let min = projections.iter().flatten().copied().fold(f32::INFINITY, f32::min);
            projections
                .iter()
                .enumerate()
                .map(|(i, p)| match p {
                    Some(p) => (p - min) / spacing,
                    None => i as f32,
                })
                .collect()
        }
        StaggerFrom::Ripple { origin, spacing } => {
            let spacing = MotionError::ensure_positive("ripple spacing", spacing)?;
            let origin = origin.or_else(|| stages.iter().find_map(|s| s.position));
            stages
                .iter()
                .enumerate()
                .map(|(i, s)| match (s.position, origin) {
                    (Some(p), Some(o)) => p.distance(o) / spacing,
                    _ => i as f32,
                })
                .collect()
        }
    };

    Ok(steps
        .into_iter()
        .map(|step| {
            let step = match options.limit {
                Some(limit) => step.min(limit as f32),
                None => step,
            };
            step * options.delay_ms
        })
        .collect())
}

fn relation_offsets(options: &RelationOptions, stages: &[Stage]) -> Result<Vec<f32>> {
    MotionError::ensure_non_negative("relation base delay", options.base_delay_ms)?;
    MotionError::ensure_non_negative("relation max delay", options.max_delay_ms)?;
    let unit = MotionError::ensure_positive("relation distance unit", options.distance_unit)?;
    let clamp = |delay: f32| delay.clamp(0.0, options.max_delay_ms);

    let offsets = match options.mode {
        RelationMode::Proximity { focal: Some(focal) } => stages
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let steps = s.position.map(|p| p.distance(focal) / unit).unwrap_or(i as f32);
                clamp(steps * options.base_delay_ms)
            })
            .collect(),
        RelationMode::Proximity { focal: None } => {
            let mut offsets: Vec<f32> = Vec::with_capacity(stages.len());
            for (i, stage) in stages.iter().enumerate() {
                if i == 0 {
                    offsets.push(0.0);
                    continue;
                }
                // Chain off the nearest earlier stage; unpositioned stages are one unit away
                let nearest = stage.position.and_then(|p| {
                    stages[..i]
                        .iter()
                        .enumerate()
                        .filter_map(|(j, prior)| prior.position.map(|q| (j, p.distance(q))))
                        .min_by(|a, b| a.1.total_cmp(&b.1))
                });
                let (j, distance) = nearest.unwrap_or((i - 1, unit));
                offsets.push(clamp(offsets[j] + distance / unit * options.base_delay_ms));
            }
            offsets
        }
        RelationMode::Similarity => {
            let mut categories: Vec<Option<&str>> = Vec::new();
            stages
                .iter()
                .map(|s| {
                    let category = s.category.as_deref();
                    let slot = match category {
                        Some(_) => categories.iter().position(|c| *c == category),
                        None => None,
                    };
                    let slot = slot.unwrap_or_else(|| {
                        categories.push(category);
                        categories.len() - 1
                    });
                    clamp(slot as f32 * options.base_delay_ms)
                })
                .collect()
        }
    };
    Ok(offsets)
}

/// Seeded linear congruential generator for reproducible jitter
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Uniform sample in `[0, 1)`
    fn next_unit(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(n: usize) -> Vec<Stage> {
        (0..n).map(|i| Stage::new(format!("s{i}"), 100.0)).collect()
    }

    #[test]
    fn test_stagger_directions() {
        let s = stages(5);
        let start = Pattern::staggered(100.0).fixed_offsets(&s).unwrap();
        assert_eq!(start, vec![0.0, 100.0, 200.0, 300.0, 400.0]);

        let end = Pattern::Staggered(StaggerOptions::new(100.0).from(StaggerFrom::End))
            .fixed_offsets(&s)
            .unwrap();
        assert_eq!(end, vec![400.0, 300.0, 200.0, 100.0, 0.0]);

        let center = Pattern::Staggered(StaggerOptions::new(100.0).from(StaggerFrom::Center))
            .fixed_offsets(&s)
            .unwrap();
        assert_eq!(center, vec![200.0, 100.0, 0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_stagger_limit() {
        let offsets = Pattern::Staggered(StaggerOptions::new(10.0).limit(2))
            .fixed_offsets(&stages(5))
            .unwrap();
        assert_eq!(offsets, vec![0.0, 10.0, 20.0, 20.0, 20.0]);
    }

    #[test]
    fn test_random_stagger_is_seeded() {
        let s = stages(8);
        let pattern = Pattern::Staggered(StaggerOptions::new(100.0).from(StaggerFrom::Random { seed: 7 }));
        let a = pattern.fixed_offsets(&s).unwrap();
        let b = pattern.fixed_offsets(&s).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&o| (0.0..=700.0).contains(&o)));

        let other = Pattern::Staggered(StaggerOptions::new(100.0).from(StaggerFrom::Random { seed: 8 }))
            .fixed_offsets(&s)
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_ripple_uses_distance() {
        let s = vec![
            Stage::new("a", 10.0).at(Vec2::new(0.0, 0.0)),
            Stage::new("b", 10.0).at(Vec2::new(30.0, 40.0)),
            Stage::new("c", 10.0).at(Vec2::new(0.0, 10.0)),
        ];
        let offsets = Pattern::Staggered(StaggerOptions::new(20.0).from(StaggerFrom::Ripple {
            origin: None,
            spacing: 10.0,
        }))
        .fixed_offsets(&s)
        .unwrap();
        assert_eq!(offsets, vec![0.0, 100.0, 20.0]);
    }

    #[test]
    fn test_wave_projects_onto_direction() {
        let s = vec![
            Stage::new("a", 10.0).at(Vec2::new(100.0, 0.0)),
            Stage::new("b", 10.0).at(Vec2::new(0.0, 50.0)),
            Stage::new("c", 10.0).at(Vec2::new(200.0, 9.0)),
        ];
        let offsets = Pattern::Staggered(StaggerOptions::new(10.0).from(StaggerFrom::Wave {
            direction: Vec2::X,
            spacing: 100.0,
        }))
        .fixed_offsets(&s)
        .unwrap();
        assert_eq!(offsets, vec![10.0, 0.0, 20.0]);
    }

    #[test]
    fn test_proximity_to_focal_is_clamped() {
        let s = vec![
            Stage::new("near", 10.0).at(Vec2::new(100.0, 0.0)),
            Stage::new("far", 10.0).at(Vec2::new(10_000.0, 0.0)),
        ];
        let options = RelationOptions {
            mode: RelationMode::Proximity {
                focal: Some(Vec2::ZERO),
            },
            base_delay_ms: 50.0,
            max_delay_ms: 500.0,
            distance_unit: 100.0,
        };
        let offsets = Pattern::Relation(options).fixed_offsets(&s).unwrap();
        assert_eq!(offsets, vec![50.0, 500.0]);
    }

    #[test]
    fn test_proximity_chains_to_nearest_prior() {
        let s = vec![
            Stage::new("a", 10.0).at(Vec2::new(0.0, 0.0)),
            Stage::new("b", 10.0).at(Vec2::new(100.0, 0.0)),
            Stage::new("c", 10.0).at(Vec2::new(0.0, 100.0)),
        ];
        let offsets = Pattern::Relation(RelationOptions::default()).fixed_offsets(&s).unwrap();
        // c is nearest to a (100) rather than b (141)
        assert_eq!(offsets, vec![0.0, 50.0, 50.0]);
    }

    #[test]
    fn test_similarity_groups_categories() {
        let s = vec![
            Stage::new("a", 10.0).category("card"),
            Stage::new("b", 10.0).category("icon"),
            Stage::new("c", 10.0).category("card"),
            Stage::new("d", 10.0),
        ];
        let options = RelationOptions {
            mode: RelationMode::Similarity,
            base_delay_ms: 100.0,
            ..Default::default()
        };
        let offsets = Pattern::Relation(options).fixed_offsets(&s).unwrap();
        assert_eq!(offsets, vec![0.0, 100.0, 0.0, 200.0]);
    }

    #[test]
    fn test_custom_offsets() {
        let s = vec![
            Stage::new("a", 10.0).with_delay(5.0),
            Stage::new("b", 10.0),
        ];
        let pattern = Pattern::custom(|_, index, total| (total - index) as f32 * 10.0);
        assert_eq!(pattern.fixed_offsets(&s).unwrap(), vec![20.0, 10.0]);

        let broken = Pattern::custom(|_, _, _| f32::NAN);
        assert!(matches!(
            broken.fixed_offsets(&s),
            Err(MotionError::Configuration(_))
        ));
    }
}
