//! Timeline resolution
//!
//! Turns stage definitions plus a pattern into concrete start and end offsets.
//! Resolution runs in four passes:
//!
//! 1. validation and dependency filtering (unknown ids are dropped)
//! 2. cycle detection on the dependency graph
//! 3. per-stage timing after the motion policy and stage kind are applied
//! 4. start offsets in topological order: sequential chaining or fixed
//!    pattern offsets for independent stages, dependency ends for the rest

use super::pattern::Pattern;
use super::stage::{Stage, StageKind, MAX_SPRING_STAGE_SECS};
use crate::easing::Easing;
use indexmap::IndexMap;
use kinetic_core::{MotionError, MotionPolicy, Result};
use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How many times a whole timeline plays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    /// Additional plays after the first
    Times(u32),
    Infinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount::Times(0)
    }
}

/// Timeline-level repeat directive
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repeat {
    pub count: RepeatCount,
    /// Pause between iterations
    pub delay_ms: f32,
    /// Play every other iteration backwards
    pub yoyo: bool,
}

impl Repeat {
    pub fn times(n: u32) -> Self {
        Self {
            count: RepeatCount::Times(n),
            ..Default::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            count: RepeatCount::Infinite,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.count == RepeatCount::Infinite
    }

    /// Total number of plays, `None` when infinite
    pub fn plays(&self) -> Option<u32> {
        match self.count {
            RepeatCount::Times(n) => Some(n.saturating_add(1)),
            RepeatCount::Infinite => None,
        }
    }
}

/// A stage with its computed placement on the timeline
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStage {
    pub id: String,
    /// Position in the original definition list
    pub index: usize,
    pub start_ms: f32,
    pub end_ms: f32,
    /// Length of a single play after policy and kind dispatch
    pub duration_ms: f32,
    /// Delay that was actually applied
    pub delay_ms: f32,
    /// Dependencies that referenced real stages
    pub depends_on: Vec<String>,
    pub repeat: u32,
    pub yoyo: bool,
    pub easing: Easing,
    pub kind: StageKind,
    pub group: Option<String>,
    pub category: Option<String>,
}

impl ResolvedStage {
    /// Time covered by every play of the stage
    pub fn span_ms(&self) -> f32 {
        self.end_ms - self.start_ms
    }

    pub fn is_active_at(&self, local_ms: f32) -> bool {
        self.start_ms <= local_ms && local_ms < self.end_ms
    }

    pub fn is_completed_at(&self, local_ms: f32) -> bool {
        self.end_ms <= local_ms
    }

    /// Progress of the current play in `0.0..=1.0`, with yoyo plays running backwards
    pub fn progress_at(&self, local_ms: f32) -> f32 {
        let final_progress = if self.yoyo && self.repeat % 2 == 1 {
            0.0
        } else {
            1.0
        };
        if local_ms < self.start_ms {
            return 0.0;
        }
        if self.duration_ms <= 0.0 {
            return final_progress;
        }

        let t = (local_ms - self.start_ms).min(self.span_ms());
        let play = ((t / self.duration_ms) as u32).min(self.repeat);
        let within = ((t - play as f32 * self.duration_ms) / self.duration_ms).clamp(0.0, 1.0);
        if self.yoyo && play % 2 == 1 {
            1.0 - within
        } else {
            within
        }
    }

    /// Value produced by the stage at `local_ms`, for tween and spring stages
    pub fn value_at(&self, local_ms: f32) -> Option<f32> {
        let progress = self.progress_at(local_ms);
        match &self.kind {
            StageKind::Tween { from, to } => Some(self.easing.interpolate(*from, *to, progress)),
            StageKind::Spring { from, to, config } => {
                if progress >= 1.0 {
                    Some(*to)
                } else {
                    Some(config.sample(*from, *to, progress * self.duration_ms / 1000.0))
                }
            }
            _ => None,
        }
    }
}

/// The resolved timeline, with stages in timeline order
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTimeline {
    stages: IndexMap<String, ResolvedStage>,
    iteration_ms: f32,
    repeat: Repeat,
    policy: MotionPolicy,
}

impl ResolvedTimeline {
    /// Stages ordered by start, then end, then definition index
    pub fn stages(&self) -> impl Iterator<Item = &ResolvedStage> {
        self.stages.values()
    }

    pub fn stage(&self, id: &str) -> Option<&ResolvedStage> {
        self.stages.get(id)
    }

    /// Stage at a position in timeline order
    pub fn stage_at(&self, index: usize) -> Option<&ResolvedStage> {
        self.stages.get_index(index).map(|(_, stage)| stage)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a ResolvedStage> {
        self.stages
            .values()
            .filter(move |s| s.group.as_deref() == Some(group))
    }

    /// Duration of one play: the latest stage end
    pub fn iteration_duration(&self) -> f32 {
        self.iteration_ms
    }

    /// Duration of every play including inter-repeat delays; infinite for endless repeats
    pub fn total_duration(&self) -> f32 {
        match self.repeat.count {
            RepeatCount::Infinite => f32::INFINITY,
            RepeatCount::Times(n) => self.iteration_ms * (n as f32 + 1.0) + self.repeat.delay_ms * n as f32,
        }
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn policy(&self) -> MotionPolicy {
        self.policy
    }

    /// Replace the timeline-level repeat directive
    pub fn with_repeat(mut self, repeat: Repeat) -> Result<Self> {
        MotionError::ensure_non_negative("repeat delay", repeat.delay_ms)?;
        self.repeat = repeat;
        Ok(self)
    }

    /// Map global elapsed time to `(iteration, local time within the iteration)`.
    /// Inter-repeat delays hold the end of the finished iteration.
    pub fn iteration_at(&self, elapsed_ms: f32) -> (u32, f32) {
        let iteration = self.iteration_ms;
        if iteration <= 0.0 {
            return (self.repeat.plays().map_or(0, |p| p - 1), 0.0);
        }

        let elapsed = elapsed_ms.max(0.0);
        let cycle = iteration + self.repeat.delay_ms;
        let mut k = (elapsed / cycle).floor() as u32;
        if let Some(plays) = self.repeat.plays() {
            k = k.min(plays - 1);
        }
        let within = elapsed - k as f32 * cycle;
        let local = within.min(iteration);
        if self.repeat.yoyo && k % 2 == 1 {
            (k, iteration - local)
        } else {
            (k, local)
        }
    }

    /// Stage ids whose span contains `local_ms`, in timeline order
    pub fn active_at(&self, local_ms: f32) -> Vec<&str> {
        self.stages
            .values()
            .filter(|s| s.is_active_at(local_ms))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Stage ids that have ended by `local_ms`, in timeline order
    pub fn completed_at(&self, local_ms: f32) -> Vec<&str> {
        self.stages
            .values()
            .filter(|s| s.is_completed_at(local_ms))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Value of a tween or spring stage at `local_ms` (iteration-local time)
    pub fn value_at(&self, id: &str, local_ms: f32) -> Option<f32> {
        self.stages.get(id)?.value_at(local_ms)
    }
}

/// Resolves stage lists under a motion policy
#[derive(Clone, Copy, Debug, Default)]
pub struct TimelineResolver {
    policy: MotionPolicy,
    repeat: Repeat,
}

/// Per-stage timing after policy and kind dispatch
struct Timing {
    duration_ms: f32,
    delay_ms: f32,
    kind: StageKind,
}

impl TimelineResolver {
    pub fn new(policy: MotionPolicy) -> Self {
        Self {
            policy,
            repeat: Repeat::default(),
        }
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn policy(&self) -> MotionPolicy {
        self.policy
    }

    pub fn resolve(&self, stages: &[Stage], pattern: &Pattern) -> Result<ResolvedTimeline> {
        MotionError::ensure_non_negative("repeat delay", self.repeat.delay_ms)?;

        let mut index_of: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, stage) in stages.iter().enumerate() {
            stage.validate()?;
            if index_of.insert(stage.id.as_str(), i).is_some() {
                return Err(MotionError::validation(
                    "stage id",
                    format!("duplicate stage id `{}`", stage.id),
                ));
            }
        }

        let deps = filter_dependencies(stages, &index_of);
        let (order, chain) = schedule(stages, &deps, pattern.is_chained())?;

        let timings: Vec<Timing> = stages.iter().map(|s| self.timing(s)).collect();

        // Offsets are computed against the policy-adjusted stages
        let effective: Vec<Stage> = stages
            .iter()
            .zip(&timings)
            .map(|(stage, timing)| Stage {
                duration_ms: timing.duration_ms,
                delay_ms: timing.delay_ms,
                kind: timing.kind.clone(),
                ..stage.clone()
            })
            .collect();
        let scale = self.policy.duration_scale();
        let offsets: Vec<f32> = pattern
            .fixed_offsets(&effective)?
            .into_iter()
            .map(|offset| offset * scale)
            .collect();

        let span = |i: usize| timings[i].duration_ms * (stages[i].repeat as f32 + 1.0);
        let mut starts = vec![0.0f32; stages.len()];
        let mut ends = vec![0.0f32; stages.len()];

        for &i in &order {
            starts[i] = if deps[i].is_empty() {
                match pattern {
                    Pattern::Sequential => chain[i].map_or(0.0, |prev| ends[prev]),
                    Pattern::Custom(_) => timings[i].delay_ms + offsets[i],
                    _ => offsets[i],
                }
            } else {
                let after = deps[i].iter().map(|&d| ends[d]).fold(0.0f32, f32::max);
                let offset = if pattern.is_chained() { 0.0 } else { offsets[i] };
                after + timings[i].delay_ms + offset
            };
            ends[i] = starts[i] + span(i);
        }

        let mut resolved: Vec<ResolvedStage> = stages
            .iter()
            .zip(timings)
            .enumerate()
            .map(|(i, (stage, timing))| ResolvedStage {
                id: stage.id.clone(),
                index: i,
                start_ms: starts[i],
                end_ms: ends[i],
                duration_ms: timing.duration_ms,
                delay_ms: timing.delay_ms,
                depends_on: deps[i].iter().map(|&d| stages[d].id.clone()).collect(),
                repeat: stage.repeat,
                yoyo: stage.yoyo,
                easing: stage.easing,
                kind: timing.kind,
                group: stage.group.clone(),
                category: stage.category.clone(),
            })
            .collect();
        resolved.sort_by(|a, b| {
            a.start_ms
                .total_cmp(&b.start_ms)
                .then(a.end_ms.total_cmp(&b.end_ms))
                .then(a.index.cmp(&b.index))
        });

        let iteration_ms = resolved.iter().map(|s| s.end_ms).fold(0.0f32, f32::max);
        tracing::debug!(
            "resolved {} stages ({} pattern, policy {}): iteration {}ms",
            resolved.len(),
            pattern.name(),
            self.policy,
            iteration_ms
        );

        Ok(ResolvedTimeline {
            stages: resolved.into_iter().map(|s| (s.id.clone(), s)).collect(),
            iteration_ms,
            repeat: self.repeat,
            policy: self.policy,
        })
    }

    fn timing(&self, stage: &Stage) -> Timing {
        let (mut duration_ms, delay_ms, kind) = match (&stage.reduced, self.policy.is_reduced()) {
            (Some(reduced), true) => (
                reduced.duration_ms,
                reduced.delay_ms,
                reduced.kind.clone().unwrap_or_else(|| stage.kind.clone()),
            ),
            _ => (
                self.policy.scale_duration(stage.duration_ms),
                self.policy.scale_duration(stage.delay_ms),
                stage.kind.clone(),
            ),
        };

        let kind = match kind {
            StageKind::Spring { from, to, config } => {
                let config = config.with_policy(self.policy);
                if duration_ms == 0.0 {
                    let settle_ms = config.settle_time(from, to, 0.0, MAX_SPRING_STAGE_SECS) * 1000.0;
                    duration_ms = self.policy.scale_duration(settle_ms);
                }
                StageKind::Spring { from, to, config }
            }
            kind if kind.is_instant() => {
                duration_ms = 0.0;
                kind
            }
            kind => kind,
        };

        Timing {
            duration_ms,
            delay_ms,
            kind,
        }
    }
}

/// Resolve with no motion reduction and no timeline repeat
pub fn resolve(stages: &[Stage], pattern: &Pattern) -> Result<ResolvedTimeline> {
    TimelineResolver::default().resolve(stages, pattern)
}

/// Dependency indices per stage; unknown ids are dropped with a warning
fn filter_dependencies(stages: &[Stage], index_of: &FxHashMap<&str, usize>) -> Vec<Vec<usize>> {
    stages
        .iter()
        .map(|stage| {
            let mut deps: Vec<usize> = Vec::with_capacity(stage.depends_on.len());
            for dep in &stage.depends_on {
                match index_of.get(dep.as_str()) {
                    Some(&d) if !deps.contains(&d) => deps.push(d),
                    Some(_) => {}
                    None => tracing::warn!(
                        "{}",
                        MotionError::UnknownReference {
                            kind: "dependency",
                            id: format!("{dep} (of stage `{}`)", stage.id),
                        }
                    ),
                }
            }
            deps
        })
        .collect()
}

/// Resolution order plus, for chained patterns, the stage each independent
/// stage follows
///
/// An independent stage follows the nearest earlier stage in list order that
/// does not already wait on it. A cycle among the declared dependencies is an
/// error; chain links never introduce one.
fn schedule(
    stages: &[Stage],
    deps: &[Vec<usize>],
    chained: bool,
) -> Result<(Vec<usize>, Vec<Option<usize>>)> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(stages.len(), stages.len());
    let nodes: Vec<NodeIndex> = (0..stages.len()).map(|i| graph.add_node(i)).collect();
    for (i, stage_deps) in deps.iter().enumerate() {
        for &d in stage_deps {
            graph.add_edge(nodes[d], nodes[i], ());
        }
    }
    if toposort(&graph, None).is_err() {
        return Err(cycle_error(stages, &graph));
    }

    let mut chain = vec![None; stages.len()];
    if chained {
        for i in (1..stages.len()).filter(|&i| deps[i].is_empty()) {
            let prev = (0..i)
                .rev()
                .find(|&p| !has_path_connecting(&graph, nodes[i], nodes[p], None));
            if let Some(p) = prev {
                graph.add_edge(nodes[p], nodes[i], ());
                chain[i] = Some(p);
            }
        }
    }

    match toposort(&graph, None) {
        Ok(sorted) => Ok((sorted.into_iter().map(|n| graph[n]).collect(), chain)),
        Err(_) => Err(cycle_error(stages, &graph)),
    }
}

/// The stages on a cycle, in definition order
fn cycle_error(stages: &[Stage], graph: &DiGraph<usize, ()>) -> MotionError {
    let mut members: Vec<usize> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(|n| graph[n])
        .collect();
    members.sort_unstable();
    MotionError::DependencyCycle {
        stages: members.into_iter().map(|i| stages[i].id.clone()).collect(),
    }
}
