//! Suppressions from the `@suppress` trait and `suppressions` metadata.

use serde::Deserialize;
use tessel_core::traits::{ids, string_list};
use tessel_core::{Model, ShapeId, ValidationEvent};
use tracing::warn;

/// Metadata key holding model-wide suppressions.
pub const SUPPRESSIONS_KEY: &str = "suppressions";

/// Namespace wildcard in a metadata suppression.
const ANY_NAMESPACE: &str = "*";

/// One entry of the `suppressions` metadata list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataSuppression {
    pub id: String,
    pub namespace: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl MetadataSuppression {
    fn matches(&self, event: &ValidationEvent) -> bool {
        if self.id != event.id {
            return false;
        }
        self.namespace == ANY_NAMESPACE
            || event
                .shape_id
                .as_ref()
                .is_some_and(|id| id.namespace() == self.namespace)
    }
}

/// Every suppression that applies to a model.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    metadata: Vec<MetadataSuppression>,
}

impl Suppressions {
    /// Read metadata suppressions. Malformed entries are skipped with a
    /// warning.
    pub fn from_model(model: &Model) -> Self {
        let entries = model
            .metadata()
            .get(SUPPRESSIONS_KEY)
            .and_then(|value| value.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let metadata = entries
            .iter()
            .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                Ok(suppression) => Some(suppression),
                Err(err) => {
                    warn!(error = %err, "ignoring malformed suppression");
                    None
                }
            })
            .collect();
        Self { metadata }
    }

    /// The reason `event` is suppressed, or `None` if it is not.
    ///
    /// ERROR events are never suppressed. A trait suppression has an empty
    /// reason.
    pub fn reason(&self, model: &Model, event: &ValidationEvent) -> Option<String> {
        if !event.severity.can_suppress() {
            return None;
        }
        if suppressed_by_trait(model, event) {
            return Some(String::new());
        }
        self.metadata
            .iter()
            .find(|s| s.matches(event))
            .map(|s| s.reason.clone().unwrap_or_default())
    }

    /// Split events into reported and suppressed, recording each suppression
    /// reason on the event.
    pub fn apply(
        &self,
        model: &Model,
        events: Vec<ValidationEvent>,
    ) -> (Vec<ValidationEvent>, Vec<ValidationEvent>) {
        let mut reported = Vec::new();
        let mut suppressed = Vec::new();
        for mut event in events {
            match self.reason(model, &event) {
                Some(reason) => {
                    event.suppression_reason = Some(reason);
                    suppressed.push(event);
                }
                None => reported.push(event),
            }
        }
        (reported, suppressed)
    }
}

/// `@suppress` applies to events on the shape itself and on its members.
fn suppressed_by_trait(model: &Model, event: &ValidationEvent) -> bool {
    let Some(shape_id) = &event.shape_id else {
        return false;
    };
    let lists = |id: &ShapeId| {
        model
            .get_shape(id)
            .and_then(|shape| shape.get_trait(&ids::suppress()))
            .is_some_and(|value| string_list(value).contains(&event.id.as_str()))
    };
    lists(shape_id) || (shape_id.is_member() && lists(&shape_id.without_member()))
}
