//! Physics scene documents
//!
//! ```toml
//! [world]
//! max_sub_steps = 8
//!
//! [[bodies]]
//! name = "floor"
//! shape = { type = "rectangle", width = 500.0, height = 10.0 }
//! position = { x = 250.0, y = 400.0 }
//! is_static = true
//!
//! [[constraints]]
//! a = "anchor"
//! b = "ball"
//! kind = { type = "distance", length = 80.0 }
//! ```

use anyhow::{Context, Result};
use kinetic_animation::{FixedClock, FrameClock};
use kinetic_core::MotionPolicy;
use kinetic_physics::{
    BodyId, BodySpec, BodyState, ConstraintKind, ConstraintSpec, Vec2, World, WorldConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A body with the name constraints and output refer to it by
#[derive(Debug, Deserialize)]
pub struct NamedBody {
    pub name: String,
    #[serde(flatten)]
    pub spec: BodySpec,
}

/// A constraint between two named bodies
#[derive(Debug, Deserialize)]
pub struct ConstraintDoc {
    pub a: String,
    pub b: String,
    pub kind: ConstraintKind,
    #[serde(default)]
    pub anchor_a: Vec2,
    #[serde(default)]
    pub anchor_b: Vec2,
    #[serde(default)]
    pub collide_connected: bool,
}

/// Top-level scene document
#[derive(Debug, Deserialize)]
pub struct SceneDoc {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub bodies: Vec<NamedBody>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDoc>,
}

impl SceneDoc {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build a world holding every body and constraint in the document
    pub fn build(&self, policy: MotionPolicy) -> Result<(World, NameTable)> {
        let mut world = World::new(self.world, policy).context("Invalid [world] section")?;
        let mut names = NameTable::default();

        for body in &self.bodies {
            let id = world
                .add_body(body.spec)
                .with_context(|| format!("Invalid body `{}`", body.name))?;
            names.insert(&body.name, id);
        }

        for (index, doc) in self.constraints.iter().enumerate() {
            let (Some(a), Some(b)) = (names.id(&doc.a), names.id(&doc.b)) else {
                anyhow::bail!(
                    "Constraint #{index} refers to unknown body `{}` or `{}`",
                    doc.a,
                    doc.b
                );
            };
            let spec = ConstraintSpec {
                body_a: a,
                body_b: b,
                kind: doc.kind,
                anchor_a: doc.anchor_a,
                anchor_b: doc.anchor_b,
                collide_connected: doc.collide_connected,
            };
            world
                .add_constraint(spec)
                .with_context(|| format!("Invalid constraint #{index}"))?;
        }

        Ok((world, names))
    }
}

/// Body names in document order
#[derive(Debug, Default)]
pub struct NameTable {
    entries: Vec<(String, BodyId)>,
}

impl NameTable {
    fn insert(&mut self, name: &str, id: BodyId) {
        self.entries.push((name.to_string(), id));
    }

    fn id(&self, name: &str) -> Option<BodyId> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn name(&self, id: BodyId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| *entry == id)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Serialize)]
struct BodyLine<'a> {
    name: &'a str,
    #[serde(flatten)]
    state: BodyState,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    frame: u64,
    time: f32,
    bodies: Vec<BodyLine<'a>>,
}

/// Step the scene for `seconds` and print every `every`th frame as a JSON line
pub fn simulate(doc: &SceneDoc, seconds: f32, fps: u32, policy: MotionPolicy, every: u32) -> Result<()> {
    let (mut world, names) = doc.build(policy)?;
    world.on_collision(|event, _| {
        tracing::trace!(
            "contact {} -> {} at ({:.1}, {:.1})",
            event.body_a,
            event.body_b,
            event.point.x,
            event.point.y
        );
    });

    let mut clock = FixedClock::from_fps(fps);
    let frames = (seconds / clock.step()).ceil().max(0.0) as u64;
    tracing::info!(
        "simulating {} bodies for {:.2}s ({} frames, policy {})",
        world.body_count(),
        seconds,
        frames,
        policy
    );

    let mut totals = (0usize, 0usize);
    for _ in 0..frames {
        let report = world.step(clock.delta());
        totals.0 += report.contacts;
        totals.1 += report.recovered.len();

        if clock.frames() % u64::from(every) == 0 || clock.frames() == frames {
            let states = world.bodies();
            let line = FrameLine {
                frame: clock.frames(),
                time: clock.now(),
                bodies: states
                    .into_iter()
                    .map(|state| BodyLine {
                        name: names.name(state.id).unwrap_or("?"),
                        state,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }

    tracing::info!("done: {} contacts, {} recoveries", totals.0, totals.1);
    Ok(())
}
