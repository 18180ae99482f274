//! Validation events and their severities.

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shape_id::ShapeId;

/// Severity of a validation event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Note,
    Warning,
    Danger,
    Error,
}

impl Severity {
    /// ERROR events describe structural problems and can never be suppressed.
    pub fn can_suppress(self) -> bool {
        self != Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "NOTE"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Danger => write!(f, "DANGER"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NOTE" => Ok(Severity::Note),
            "WARNING" => Ok(Severity::Warning),
            "DANGER" => Ok(Severity::Danger),
            "ERROR" => Ok(Severity::Error),
            other => Err(format!("unknown severity `{other}`")),
        }
    }
}

/// A finding reported while validating a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEvent {
    pub id: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<ShapeId>,
    pub message: String,
    /// Set once the event has been matched by a suppression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppression_reason: Option<String>,
}

impl ValidationEvent {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        shape_id: Option<ShapeId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            shape_id,
            message: message.into(),
            suppression_reason: None,
        }
    }

    pub fn error(id: impl Into<String>, shape_id: Option<ShapeId>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Error, shape_id, message)
    }

    pub fn danger(id: impl Into<String>, shape_id: Option<ShapeId>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Danger, shape_id, message)
    }

    pub fn warning(id: impl Into<String>, shape_id: Option<ShapeId>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Warning, shape_id, message)
    }

    pub fn note(id: impl Into<String>, shape_id: Option<ShapeId>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Note, shape_id, message)
    }

    /// Reporting order: severity descending, then shape id, then event id.
    pub fn report_order(&self, other: &Self) -> Ordering {
        (Reverse(self.severity), &self.shape_id, &self.id, &self.message).cmp(&(
            Reverse(other.severity),
            &other.shape_id,
            &other.id,
            &other.message,
        ))
    }
}

impl fmt::Display for ValidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.severity)?;
        match &self.shape_id {
            Some(id) => write!(f, "{id}: ")?,
            None => write!(f, "-: ")?,
        }
        write!(f, "{} | {}", self.message, self.id)
    }
}

/// Sort events into reporting order and drop exact duplicates.
pub fn sort_events(events: &mut Vec<ValidationEvent>) {
    events.sort_by(ValidationEvent::report_order);
    events.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Danger);
        assert!(Severity::Danger > Severity::Warning);
        assert!(Severity::Warning > Severity::Note);
        assert!(!Severity::Error.can_suppress());
        assert!(Severity::Danger.can_suppress());
    }

    #[test]
    fn events_sort_by_severity_then_shape_then_id() {
        let a = Some(ShapeId::new("ns", "A"));
        let b = Some(ShapeId::new("ns", "B"));
        let mut events = vec![
            ValidationEvent::note("Z", a.clone(), "n"),
            ValidationEvent::error("Y", b.clone(), "e"),
            ValidationEvent::error("X", b.clone(), "e"),
            ValidationEvent::error("Y", a.clone(), "e"),
            ValidationEvent::warning("W", a.clone(), "w"),
            ValidationEvent::warning("W", a.clone(), "w"),
        ];
        sort_events(&mut events);
        let order: Vec<_> = events
            .iter()
            .map(|e| format!("{}:{}:{}", e.severity, e.shape_id.as_ref().unwrap().name(), e.id))
            .collect();
        assert_eq!(
            order,
            vec!["ERROR:A:Y", "ERROR:B:X", "ERROR:B:Y", "WARNING:A:W", "NOTE:A:Z"]
        );
    }

    #[test]
    fn display_format() {
        let event = ValidationEvent::danger("ChangedDefault", Some(ShapeId::new("ns", "A").with_member("b")), "changed");
        assert_eq!(event.to_string(), "[DANGER] ns#A$b: changed | ChangedDefault");
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
    }
}
