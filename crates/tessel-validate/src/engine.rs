//! Validation engine orchestrator.
//!
//! Runs the built-in validators and the validators configured in model
//! metadata, then applies suppressions and sorts the result into a
//! [`ValidationReport`].

use std::collections::BTreeSet;
use std::panic;
use std::thread;

use tessel_core::{Model, ValidationEvent};
use tracing::{debug, instrument};

use crate::advisory::advisory;
use crate::builtin::structural;
use crate::config::load_validators;
use crate::report::ValidationReport;
use crate::suppression::Suppressions;
use crate::validator::{Validator, ValidatorRegistry};

/// The main validation engine.
#[derive(Debug)]
pub struct ValidationEngine {
    registry: ValidatorRegistry,
    disabled: BTreeSet<String>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// An engine with every structural and advisory validator registered.
    pub fn new() -> Self {
        let mut registry = ValidatorRegistry::new();
        for validator in structural().into_iter().chain(advisory()) {
            registry.register(validator);
        }
        Self {
            registry,
            disabled: BTreeSet::new(),
        }
    }

    /// An engine with only the structural validators.
    pub fn structural_only() -> Self {
        let mut registry = ValidatorRegistry::new();
        for validator in structural() {
            registry.register(validator);
        }
        Self {
            registry,
            disabled: BTreeSet::new(),
        }
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.registry.register(validator);
        self
    }

    /// Drop events with this id from reports. ERROR events are always kept.
    pub fn disable(mut self, event_id: impl Into<String>) -> Self {
        self.disabled.insert(event_id.into());
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Run the full validation pipeline on a model.
    #[instrument(skip_all, fields(shapes = model.len()))]
    pub fn validate(&self, model: &Model) -> ValidationReport {
        // 1. Registered validators, one thread each
        let mut events = run_all(self.registry.validators(), model);

        // 2. Validators configured in metadata
        let (configured, config_events) = load_validators(model);
        events.extend(config_events);
        for validator in &configured {
            events.extend(validator.validate(model));
        }

        // 3. Disabled event ids
        events.retain(|e| !e.severity.can_suppress() || !self.disabled.contains(&e.id));

        // 4. Suppressions
        let (reported, suppressed) = Suppressions::from_model(model).apply(model, events);
        debug!(
            reported = reported.len(),
            suppressed = suppressed.len(),
            configured = configured.len(),
            "validation finished"
        );

        // 5. Build report
        ValidationReport::new(reported, suppressed)
    }
}

/// Run validators concurrently over a shared model. Results are collected in
/// registration order, so the output does not depend on scheduling.
fn run_all(validators: &[Box<dyn Validator>], model: &Model) -> Vec<ValidationEvent> {
    thread::scope(|scope| {
        let handles: Vec<_> = validators
            .iter()
            .map(|validator| {
                scope.spawn(move || {
                    let events = validator.validate(model);
                    debug!(validator = validator.name(), events = events.len(), "validator ran");
                    events
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::traits::ids;
    use tessel_core::{Severity, ShapeGraph, ShapeId, ShapeKind};

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    #[test]
    fn suppressed_condition_is_still_detected() {
        let mut graph = ShapeGraph::with_prelude();
        graph
            .add_shape(
                ShapeBuilder::structure(id("Undocumented"))
                    .with_trait(ids::suppress(), json!(["MissingDocumentation"]))
                    .member("name", ShapeId::prelude("String"))
                    .build(),
            )
            .unwrap();
        graph
            .put_metadata("validators", json!([{ "name": "MissingDocumentation" }]))
            .unwrap();
        let model = graph.freeze();

        let report = ValidationEngine::new().validate(&model);
        assert!(report
            .events()
            .iter()
            .all(|e| e.id != "MissingDocumentation"));
        assert_eq!(report.suppressed().len(), 2);
        assert!(report
            .suppressed()
            .iter()
            .all(|e| e.id == "MissingDocumentation"));
    }

    #[test]
    fn errors_survive_disabling() {
        let mut graph = ShapeGraph::with_prelude();
        graph
            .add_shape(ShapeBuilder::new(id("Empty"), ShapeKind::Enum).build())
            .unwrap();
        graph
            .add_shape(ShapeBuilder::new(id("Count"), ShapeKind::Integer).build())
            .unwrap();
        graph
            .add_shape(ShapeBuilder::structure(id("Holder")).member("n", id("Count")).build())
            .unwrap();
        let model = graph.freeze();

        let report = ValidationEngine::new()
            .disable("EnumShape")
            .disable("AmbiguousNullability")
            .validate(&model);
        let ids: Vec<_> = report.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["EnumShape"]);
        assert!(report.has_errors());

        let report = ValidationEngine::new().validate(&model);
        assert_eq!(report.count(Severity::Warning), 1);
    }

    #[test]
    fn structural_only_skips_advisories() {
        let mut graph = ShapeGraph::with_prelude();
        graph
            .add_shape(ShapeBuilder::new(id("Count"), ShapeKind::Integer).build())
            .unwrap();
        graph
            .add_shape(ShapeBuilder::structure(id("Holder")).member("n", id("Count")).build())
            .unwrap();
        let model = graph.freeze();

        assert_eq!(ValidationEngine::structural_only().registry().len(), 5);
        assert!(ValidationEngine::structural_only()
            .validate(&model)
            .events()
            .is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut graph = ShapeGraph::with_prelude();
        for name in ["A", "B", "C", "D"] {
            graph
                .add_shape(
                    ShapeBuilder::structure(id(name))
                        .with_trait(ids::required(), json!({}))
                        .build(),
                )
                .unwrap();
        }
        let model = graph.freeze();
        let engine = ValidationEngine::new();
        let first = engine.validate(&model);
        for _ in 0..8 {
            assert_eq!(engine.validate(&model), first);
        }
        assert_eq!(first.count(Severity::Error), 4);
    }
}
