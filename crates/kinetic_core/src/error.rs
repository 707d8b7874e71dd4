//! Motion error types

use thiserror::Error;

/// Errors raised by the physics world, springs, and timeline resolver.
///
/// Validation and cycle errors are fatal to the call that produced them only;
/// the owning world or timeline stays usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A spec carried a malformed value (non-finite, negative, empty)
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A spec referenced an id that does not exist
    #[error("unknown {kind} `{id}`")]
    UnknownReference { kind: &'static str, id: String },

    /// The stage dependency graph contains a cycle
    #[error("dependency cycle detected involving stages: {}", .stages.join(" -> "))]
    DependencyCycle { stages: Vec<String> },

    /// Pattern or timeline options that cannot be resolved
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Integration produced NaN or infinity for a body
    #[error("numerical instability in body {body}")]
    NumericalInstability { body: String },
}

impl MotionError {
    /// Shorthand for a validation error
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        MotionError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Reject a value that is NaN or infinite
    pub fn ensure_finite(field: &'static str, value: f32) -> Result<f32> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::validation(field, format!("expected a finite number, got {value}")))
        }
    }

    /// Reject a value that is non-finite or negative
    pub fn ensure_non_negative(field: &'static str, value: f32) -> Result<f32> {
        let value = Self::ensure_finite(field, value)?;
        if value < 0.0 {
            return Err(Self::validation(field, format!("must not be negative, got {value}")));
        }
        Ok(value)
    }

    /// Reject a value that is non-finite, zero or negative
    pub fn ensure_positive(field: &'static str, value: f32) -> Result<f32> {
        let value = Self::ensure_finite(field, value)?;
        if value <= 0.0 {
            return Err(Self::validation(field, format!("must be positive, got {value}")));
        }
        Ok(value)
    }
}

/// Result type for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_helpers() {
        assert_eq!(MotionError::ensure_finite("x", 1.5), Ok(1.5));
        assert!(MotionError::ensure_finite("x", f32::NAN).is_err());
        assert!(MotionError::ensure_non_negative("mass", -1.0).is_err());
        assert_eq!(MotionError::ensure_non_negative("mass", 0.0), Ok(0.0));
        assert!(MotionError::ensure_positive("radius", 0.0).is_err());
        assert!(MotionError::ensure_positive("radius", f32::INFINITY).is_err());
    }

    #[test]
    fn test_cycle_message_lists_stages() {
        let err = MotionError::DependencyCycle {
            stages: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected involving stages: a -> b"
        );
    }
}
