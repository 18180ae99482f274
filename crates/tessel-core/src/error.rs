//! Structural model errors.
//!
//! Every variant is ERROR severity: it aborts loading and surfaces as a
//! [`ValidationEvent`] with a stable event id.

use thiserror::Error;

use crate::event::ValidationEvent;
use crate::shape_id::ShapeId;

/// Errors raised while building, flattening, or checking a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid shape id: `{0}`")]
    InvalidShapeId(String),

    #[error("`{referenced_by}` {relationship} `{id}`, which cannot be resolved")]
    UnresolvedShape {
        id: ShapeId,
        referenced_by: ShapeId,
        relationship: String,
    },

    #[error("conflicting definitions for `{id}`: {reason}")]
    ShapeConflict { id: ShapeId, reason: String },

    #[error("conflicting values for metadata key `{key}`")]
    MetadataConflict { key: String },

    #[error("mixin cycle detected: {}", render_path(.path))]
    MixinCycle { id: ShapeId, path: Vec<ShapeId> },

    #[error("invalid mixin usage on `{id}`: {reason}")]
    InvalidMixinUsage { id: ShapeId, reason: String },

    #[error("invalid default value on `{id}`: {reason}")]
    InvalidDefaultValue { id: ShapeId, reason: String },

    #[error("default value of `{id}` is {found}, but its target declares {expected}")]
    DefaultValueMismatch {
        id: ShapeId,
        expected: String,
        found: String,
    },

    #[error("trait `{trait_id}` conflicts with `{conflicts_with}` on `{id}`")]
    TraitConflict {
        id: ShapeId,
        trait_id: ShapeId,
        conflicts_with: ShapeId,
    },

    #[error("trait `{trait_id}` cannot be applied to `{id}`; it is limited to shapes matching `{selector}`")]
    TraitSelectorMismatch {
        id: ShapeId,
        trait_id: ShapeId,
        selector: String,
    },

    #[error("backward incompatible change to `{id}`: {from} -> {to}")]
    BackwardCompatibilityViolation {
        id: ShapeId,
        from: String,
        to: String,
    },
}

impl ModelError {
    /// Stable event id used when this error is reported as a validation event.
    pub fn event_id(&self) -> &'static str {
        match self {
            ModelError::InvalidShapeId(_) => "InvalidShapeId",
            ModelError::UnresolvedShape { .. } => "UnresolvedShape",
            ModelError::ShapeConflict { .. } | ModelError::MetadataConflict { .. } => {
                "ShapeConflict"
            }
            ModelError::MixinCycle { .. } => "MixinCycle",
            ModelError::InvalidMixinUsage { .. } => "InvalidMixinUsage",
            ModelError::InvalidDefaultValue { .. } => "InvalidDefaultValue",
            ModelError::DefaultValueMismatch { .. } => "DefaultValueMismatch",
            ModelError::TraitConflict { .. } => "TraitConflict",
            ModelError::TraitSelectorMismatch { .. } => "TraitTarget",
            ModelError::BackwardCompatibilityViolation { .. } => "BackwardCompatibility",
        }
    }

    /// The shape the error is attached to, if any.
    pub fn shape_id(&self) -> Option<&ShapeId> {
        match self {
            ModelError::InvalidShapeId(_) | ModelError::MetadataConflict { .. } => None,
            ModelError::UnresolvedShape { referenced_by, .. } => Some(referenced_by),
            ModelError::ShapeConflict { id, .. }
            | ModelError::MixinCycle { id, .. }
            | ModelError::InvalidMixinUsage { id, .. }
            | ModelError::InvalidDefaultValue { id, .. }
            | ModelError::DefaultValueMismatch { id, .. }
            | ModelError::TraitConflict { id, .. }
            | ModelError::TraitSelectorMismatch { id, .. }
            | ModelError::BackwardCompatibilityViolation { id, .. } => Some(id),
        }
    }

    /// Convert to an ERROR-severity validation event.
    pub fn to_event(&self) -> ValidationEvent {
        ValidationEvent::error(self.event_id(), self.shape_id().cloned(), self.to_string())
    }
}

fn render_path(path: &[ShapeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Severity;

    #[test]
    fn errors_become_error_events() {
        let err = ModelError::MixinCycle {
            id: ShapeId::new("ns", "A"),
            path: vec![
                ShapeId::new("ns", "A"),
                ShapeId::new("ns", "B"),
                ShapeId::new("ns", "A"),
            ],
        };
        let event = err.to_event();
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.id, "MixinCycle");
        assert_eq!(event.shape_id, Some(ShapeId::new("ns", "A")));
        assert!(event.message.contains("ns#A -> ns#B -> ns#A"));
    }

    #[test]
    fn unresolved_shape_is_attached_to_referrer() {
        let err = ModelError::UnresolvedShape {
            id: ShapeId::new("ns", "Missing"),
            referenced_by: ShapeId::new("ns", "A").with_member("m"),
            relationship: "targets".into(),
        };
        assert_eq!(err.shape_id().map(ToString::to_string).as_deref(), Some("ns#A$m"));
        assert_eq!(err.to_string(), "`ns#A$m` targets `ns#Missing`, which cannot be resolved");
    }
}
