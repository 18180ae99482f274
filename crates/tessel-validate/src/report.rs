//! Validation report with summary counts and sorted events.

use std::fmt;

use serde::Serialize;
use tessel_core::event::sort_events;
use tessel_core::{Severity, ValidationEvent};

/// Event counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub dangers: usize,
    pub warnings: usize,
    pub notes: usize,
    pub suppressed: usize,
}

/// The outcome of validating a model.
///
/// Reported events exclude suppressed ones. Both lists are kept in reporting
/// order: severity descending, then shape id, then event id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    events: Vec<ValidationEvent>,
    suppressed: Vec<ValidationEvent>,
}

impl ValidationReport {
    pub fn new(mut events: Vec<ValidationEvent>, mut suppressed: Vec<ValidationEvent>) -> Self {
        sort_events(&mut events);
        sort_events(&mut suppressed);
        Self { events, suppressed }
    }

    /// Unsuppressed events.
    pub fn events(&self) -> &[ValidationEvent] {
        &self.events
    }

    /// Events that matched a suppression, each with its reason.
    pub fn suppressed(&self) -> &[ValidationEvent] {
        &self.suppressed
    }

    pub fn into_events(self) -> Vec<ValidationEvent> {
        self.events
    }

    pub fn has_errors(&self) -> bool {
        self.fails(Severity::Error)
    }

    /// Whether any unsuppressed event is at least as severe as `threshold`.
    pub fn fails(&self, threshold: Severity) -> bool {
        self.events.iter().any(|e| e.severity >= threshold)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            errors: self.count(Severity::Error),
            dangers: self.count(Severity::Danger),
            warnings: self.count(Severity::Warning),
            notes: self.count(Severity::Note),
            suppressed: self.suppressed.len(),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(f, "=== Validation Report ===")?;
        writeln!(
            f,
            "Errors: {} | Danger: {} | Warnings: {} | Notes: {} | Suppressed: {}",
            summary.errors, summary.dangers, summary.warnings, summary.notes, summary.suppressed,
        )?;
        if self.events.is_empty() {
            writeln!(f, "No events.")?;
        } else {
            writeln!(f, "--- Events ---")?;
            for event in &self.events {
                writeln!(f, "{event}")?;
            }
        }
        Ok(())
    }
}
