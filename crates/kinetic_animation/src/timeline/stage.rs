//! Stage definitions
//!
//! A stage is one named unit of timed work. Its `kind` decides what the stage
//! produces while active (an eased tween, a spring sample, a callback marker)
//! and is dispatched once, when the timeline is resolved.

use crate::easing::Easing;
use crate::spring::SpringConfig;
use kinetic_core::{MotionError, Result, Vec2};
use serde::{Deserialize, Serialize};

/// Longest simulated settle time for spring stages without an explicit duration
pub(crate) const MAX_SPRING_STAGE_SECS: f32 = 10.0;

/// What a stage does while it is active
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageKind {
    /// Occupies time without producing a value
    #[default]
    Hold,
    /// Interpolates a value with the stage easing
    Tween { from: f32, to: f32 },
    /// Drives a value with a spring. A zero duration is replaced by the
    /// spring's simulated settle time.
    Spring {
        from: f32,
        to: f32,
        #[serde(default)]
        config: SpringConfig,
    },
    /// Zero-length marker whose start and completion fire callbacks
    Callback,
    /// Zero-length marker that carries a named host event
    Event { name: String },
}

impl StageKind {
    /// Markers have no duration of their own
    pub fn is_instant(&self) -> bool {
        matches!(self, StageKind::Callback | StageKind::Event { .. })
    }
}

/// Replacement timing used when reduced motion is active
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducedStage {
    pub duration_ms: f32,
    pub delay_ms: f32,
    /// Optional replacement behaviour (e.g. a fade instead of a slide)
    pub kind: Option<StageKind>,
}

/// A stage definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    pub id: String,
    pub duration_ms: f32,
    /// Base delay. Patterns other than `Custom` replace it for stages without
    /// dependencies; for dependent stages it is the gap after the last dependency.
    pub delay_ms: f32,
    pub depends_on: Vec<String>,
    /// Spatial position used by wave, ripple and proximity patterns
    pub position: Option<Vec2>,
    /// Tag used by the similarity pattern
    pub category: Option<String>,
    pub group: Option<String>,
    /// Additional plays of this stage
    pub repeat: u32,
    /// Alternate direction on every repeat
    pub yoyo: bool,
    pub easing: Easing,
    pub kind: StageKind,
    pub reduced: Option<ReducedStage>,
}

impl Stage {
    pub fn new(id: impl Into<String>, duration_ms: f32) -> Self {
        Self {
            id: id.into(),
            duration_ms,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn kind(mut self, kind: StageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn tween(self, from: f32, to: f32) -> Self {
        self.kind(StageKind::Tween { from, to })
    }

    pub fn reduced(mut self, reduced: ReducedStage) -> Self {
        self.reduced = Some(reduced);
        self
    }

    /// Creation-time validation
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(MotionError::validation("stage id", "must not be empty"));
        }
        MotionError::ensure_non_negative("stage duration", self.duration_ms)?;
        MotionError::ensure_non_negative("stage delay", self.delay_ms)?;
        if let Some(position) = self.position {
            if !position.is_finite() {
                return Err(MotionError::validation(
                    "stage position",
                    format!("stage `{}` has a non-finite position", self.id),
                ));
            }
        }
        if let Some(reduced) = &self.reduced {
            MotionError::ensure_non_negative("reduced stage duration", reduced.duration_ms)?;
            MotionError::ensure_non_negative("reduced stage delay", reduced.delay_ms)?;
            if let Some(kind) = &reduced.kind {
                validate_kind(kind)?;
            }
        }
        validate_kind(&self.kind)
    }
}

fn validate_kind(kind: &StageKind) -> Result<()> {
    match kind {
        StageKind::Tween { from, to } => {
            MotionError::ensure_finite("tween from", *from)?;
            MotionError::ensure_finite("tween to", *to)?;
        }
        StageKind::Spring { from, to, config } => {
            MotionError::ensure_finite("spring from", *from)?;
            MotionError::ensure_finite("spring to", *to)?;
            config.validate()?;
        }
        StageKind::Event { name } if name.is_empty() => {
            return Err(MotionError::validation("event name", "must not be empty"));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let stage = Stage::new("card", 300.0)
            .with_delay(50.0)
            .depends_on(["header"])
            .at(Vec2::new(10.0, 20.0))
            .category("card")
            .repeat(2)
            .yoyo()
            .tween(0.0, 1.0);

        assert_eq!(stage.depends_on, vec!["header".to_string()]);
        assert_eq!(stage.repeat, 2);
        assert!(stage.yoyo);
        assert_eq!(stage.kind, StageKind::Tween { from: 0.0, to: 1.0 });
        assert!(stage.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_malformed_stages() {
        assert!(Stage::new("", 100.0).validate().is_err());
        assert!(Stage::new("a", -1.0).validate().is_err());
        assert!(Stage::new("a", f32::NAN).validate().is_err());
        assert!(Stage::new("a", 1.0).with_delay(f32::INFINITY).validate().is_err());
        assert!(Stage::new("a", 1.0).tween(0.0, f32::NAN).validate().is_err());
        assert!(Stage::new("a", 1.0)
            .kind(StageKind::Event { name: String::new() })
            .validate()
            .is_err());
    }

    #[test]
    fn test_instant_kinds() {
        assert!(StageKind::Callback.is_instant());
        assert!(StageKind::Event { name: "ping".into() }.is_instant());
        assert!(!StageKind::Hold.is_instant());
    }
}
