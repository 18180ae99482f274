//! Staged assembly pipeline.
//!
//! Fragments are merged into one graph, traits from `apply` statements are
//! attached, references are checked, 1.0 shapes are upgraded, mixins are
//! flattened, and the frozen model is indexed and validated. Each stage runs
//! over the whole model before the next begins. Assembly is all-or-nothing:
//! any ERROR event leaves the result without a model.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tessel_core::{Model, ModelError, Severity, ShapeGraph, ValidationEvent};
use tessel_resolve::{flatten_all, NullabilityIndex};
use tessel_validate::{Suppressions, ValidationEngine, ValidationReport};
use tracing::{debug, instrument};

use crate::ast::{discover, Fragment, IdlVersion};
use crate::error::AssembleError;
use crate::upgrade::upgrade;

/// Collects model fragments and assembles them into a validated model.
#[derive(Debug, Default)]
pub struct ModelAssembler {
    fragments: Vec<Fragment>,
    engine: ValidationEngine,
}

impl ModelAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate with `engine` instead of the default one.
    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn add_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.fragments.push(fragment);
        self
    }

    pub fn add_str(&mut self, origin: &str, text: &str) -> Result<&mut Self, AssembleError> {
        Ok(self.add_fragment(Fragment::parse_str(origin, text)?))
    }

    pub fn add_value(&mut self, origin: &str, value: Value) -> Result<&mut Self, AssembleError> {
        Ok(self.add_fragment(Fragment::from_value(origin, value)?))
    }

    /// Add a single file, or every `*.json` file under a directory.
    pub fn add_path(&mut self, path: &Path) -> Result<&mut Self, AssembleError> {
        if path.is_dir() {
            for file in discover(path)? {
                self.add_fragment(Fragment::load(&file)?);
            }
            Ok(self)
        } else {
            Ok(self.add_fragment(Fragment::load(path)?))
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Run every stage and return the model with its full event list.
    ///
    /// Only failures to fingerprint the model are returned as errors; every
    /// problem with the model itself becomes an event on the result.
    #[instrument(skip_all, fields(fragments = self.fragments.len()))]
    pub fn assemble(&self) -> Result<ValidatedResult, AssembleError> {
        // 1. Merge fragments over the prelude
        let mut graph = ShapeGraph::with_prelude();
        let mut events = Vec::new();
        let mut v1 = BTreeSet::new();
        for fragment in &self.fragments {
            for (key, value) in &fragment.metadata {
                record(&mut events, graph.put_metadata(key.clone(), value.clone()));
            }
            for shape in &fragment.shapes {
                if fragment.version == IdlVersion::V1 {
                    v1.insert(shape.id().clone());
                }
                record(&mut events, graph.add_shape(shape.clone()));
            }
        }

        // 2. Apply statements, once every shape is known
        for fragment in &self.fragments {
            for apply in &fragment.applies {
                for (trait_id, value) in &apply.traits {
                    record(
                        &mut events,
                        graph.apply_trait(
                            &apply.target,
                            trait_id.clone(),
                            value.clone(),
                            apply.override_existing,
                        ),
                    );
                }
            }
        }

        // 3. References
        events.extend(graph.unresolved_references().iter().map(ModelError::to_event));
        if has_errors(&events) {
            debug!(events = events.len(), "merge failed");
            return Ok(ValidatedResult::failed(events));
        }

        // 4. Upgrade 1.0 shapes
        let upgrade_events = upgrade(&mut graph, &v1);

        // 5. Flatten mixins
        let (graph, errors) = flatten_all(&graph);
        if !errors.is_empty() {
            events.extend(upgrade_events);
            events.extend(errors.iter().map(ModelError::to_event));
            debug!(events = events.len(), "mixin flattening failed");
            return Ok(ValidatedResult::failed(events));
        }

        // 6. Freeze and index
        let model = Arc::new(graph.freeze());
        let nullability = Arc::new(NullabilityIndex::build(&model)?);

        // 7. Validate
        let report = self.engine.validate(&model);
        let (reported, suppressed) = Suppressions::from_model(&model).apply(&model, upgrade_events);
        let report = ValidationReport::new(
            events
                .into_iter()
                .chain(reported)
                .chain(report.events().iter().cloned())
                .collect(),
            suppressed
                .into_iter()
                .chain(report.suppressed().iter().cloned())
                .collect(),
        );

        debug!(
            shapes = model.len(),
            members = nullability.len(),
            events = report.events().len(),
            "assembled model"
        );
        if report.has_errors() {
            return Ok(ValidatedResult {
                model: None,
                nullability: None,
                report,
            });
        }
        Ok(ValidatedResult {
            model: Some(model),
            nullability: Some(nullability),
            report,
        })
    }
}

fn record(events: &mut Vec<ValidationEvent>, result: Result<(), ModelError>) {
    if let Err(err) = result {
        events.push(err.to_event());
    }
}

fn has_errors(events: &[ValidationEvent]) -> bool {
    events.iter().any(|e| e.severity == Severity::Error)
}

/// Outcome of an assembly run.
///
/// `model` and `nullability` are present only when no ERROR event was
/// reported. The report is always complete.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedResult {
    #[serde(skip)]
    model: Option<Arc<Model>>,
    #[serde(skip)]
    nullability: Option<Arc<NullabilityIndex>>,
    #[serde(flatten)]
    report: ValidationReport,
}

/// A model that assembled without errors.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub model: Arc<Model>,
    pub nullability: Arc<NullabilityIndex>,
    pub report: ValidationReport,
}

impl ValidatedResult {
    fn failed(events: Vec<ValidationEvent>) -> Self {
        Self {
            model: None,
            nullability: None,
            report: ValidationReport::new(events, Vec::new()),
        }
    }

    pub fn model(&self) -> Option<&Arc<Model>> {
        self.model.as_ref()
    }

    pub fn nullability(&self) -> Option<&Arc<NullabilityIndex>> {
        self.nullability.as_ref()
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Unsuppressed events in reporting order.
    pub fn events(&self) -> &[ValidationEvent] {
        self.report.events()
    }

    pub fn suppressed(&self) -> &[ValidationEvent] {
        self.report.suppressed()
    }

    pub fn is_valid(&self) -> bool {
        self.model.is_some()
    }

    /// The assembled model, or an error naming the first ERROR event.
    pub fn into_result(self) -> Result<Assembled, AssembleError> {
        match (self.model, self.nullability) {
            (Some(model), Some(nullability)) => Ok(Assembled {
                model,
                nullability,
                report: self.report,
            }),
            _ => {
                let errors: Vec<_> = self
                    .report
                    .events()
                    .iter()
                    .filter(|e| e.severity == Severity::Error)
                    .collect();
                Err(AssembleError::Invalid {
                    errors: errors.len(),
                    first: errors.first().map(|e| e.to_string()).unwrap_or_default(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::traits::ids;
    use tessel_core::ShapeId;

    use super::*;

    fn assemble(fragments: Vec<Value>) -> ValidatedResult {
        let mut assembler = ModelAssembler::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            assembler.add_value(&format!("fragment{i}"), fragment).unwrap();
        }
        assembler.assemble().unwrap()
    }

    #[test]
    fn merges_fragments_and_applies() {
        let result = assemble(vec![
            json!({
                "smithy": "2.0",
                "shapes": {
                    "ex#S": {
                        "type": "structure",
                        "members": { "name": { "target": "smithy.api#String" } }
                    }
                }
            }),
            json!({
                "smithy": "2.0",
                "shapes": {
                    "ex#S$name": { "type": "apply", "traits": { "smithy.api#required": {} } }
                }
            }),
        ]);
        assert!(result.is_valid(), "{:?}", result.events());
        let model = result.model().unwrap();
        let name = model.get_shape(&ShapeId::new("ex", "S").with_member("name")).unwrap();
        assert!(name.has_trait(&ids::required()));
    }

    #[test]
    fn conflicting_definitions_abort() {
        let result = assemble(vec![
            json!({ "smithy": "2.0", "shapes": { "ex#S": { "type": "structure" } } }),
            json!({ "smithy": "2.0", "shapes": { "ex#S": { "type": "union" } } }),
        ]);
        assert!(!result.is_valid());
        assert_eq!(result.events()[0].id, "ShapeConflict");
        let err = result.into_result().unwrap_err();
        assert!(matches!(err, AssembleError::Invalid { errors: 1, .. }));
    }

    #[test]
    fn every_unresolved_reference_is_reported() {
        let result = assemble(vec![json!({
            "smithy": "2.0",
            "shapes": {
                "ex#S": {
                    "type": "structure",
                    "members": {
                        "a": { "target": "ex#Missing" },
                        "b": { "target": "ex#AlsoMissing" }
                    }
                }
            }
        })]);
        assert!(result.model().is_none());
        assert_eq!(result.report().count(Severity::Error), 2);
    }

    #[test]
    fn upgrade_warnings_are_suppressible() {
        let result = assemble(vec![json!({
            "smithy": "1.0",
            "metadata": {
                "suppressions": [{ "id": "ModelDeprecation", "namespace": "ex", "reason": "legacy" }]
            },
            "shapes": {
                "ex#Count": { "type": "integer" },
                "ex#S": {
                    "type": "structure",
                    "members": { "n": { "target": "ex#Count" } }
                }
            }
        })]);
        assert!(result.is_valid(), "{:?}", result.events());
        assert!(result.events().iter().all(|e| e.id != "ModelDeprecation"));
        assert_eq!(result.suppressed().len(), 1);
        assert_eq!(result.suppressed()[0].suppression_reason.as_deref(), Some("legacy"));

        let index = result.nullability().unwrap();
        let n = ShapeId::new("ex", "S").with_member("n");
        assert_eq!(index.get(&n).unwrap().default_value, Some(json!(0)));
    }
}
