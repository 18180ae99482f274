//! Compare two model snapshots for changes that break existing consumers.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tessel_core::event::sort_events;
use tessel_core::traits::ids;
use tessel_core::{Model, ModelError, Severity, Shape, ShapeKind, ValidationEvent};
use tracing::{debug, instrument};

use crate::state::MemberState;

/// One backward-compatibility finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub event: ValidationEvent,
    /// Description of the old side of the change.
    pub from: String,
    /// Description of the new side of the change.
    pub to: String,
}

impl Finding {
    fn new(event: ValidationEvent, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self {
            event,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Every finding from comparing an old model with a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffReport {
    findings: Vec<Finding>,
}

impl DiffReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings as validation events, in reporting order.
    pub fn events(&self) -> Vec<ValidationEvent> {
        let mut events: Vec<_> = self.findings.iter().map(|f| f.event.clone()).collect();
        sort_events(&mut events);
        events
    }

    pub fn has_errors(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.event.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Fail with the first ERROR finding, or return every event.
    pub fn into_result(self) -> Result<Vec<ValidationEvent>, ModelError> {
        let violation = self
            .findings
            .iter()
            .filter(|f| f.event.severity == Severity::Error)
            .find_map(|f| Some((f.event.shape_id.clone()?, f)));
        if let Some((id, finding)) = violation {
            return Err(ModelError::BackwardCompatibilityViolation {
                id,
                from: finding.from.clone(),
                to: finding.to.clone(),
            });
        }
        Ok(self.events())
    }
}

/// Compare `old` with `new`.
///
/// Only shapes present in both snapshots are compared. Removed shapes are
/// outside the scope of these checks.
#[instrument(skip_all, fields(old = old.len(), new = new.len()))]
pub fn diff(old: &Model, new: &Model) -> DiffReport {
    let mut findings = Vec::new();
    for old_shape in old.shapes_of_kind(ShapeKind::Structure) {
        let Some(new_shape) = new
            .get_shape(old_shape.id())
            .filter(|s| s.kind() == ShapeKind::Structure)
        else {
            continue;
        };
        check_input_trait(old_shape, new_shape, &mut findings);
        for new_member in new_shape.members() {
            let name = new_member.member_name().unwrap_or_default();
            match old_shape.get_member(name) {
                Some(old_member) => {
                    check_member(old, new, old_shape, new_shape, old_member, new_member, &mut findings)
                }
                None => check_added_member(new, new_shape, new_member, &mut findings),
            }
        }
    }
    debug!(findings = findings.len(), "compared models");
    DiffReport { findings }
}

fn check_input_trait(old_shape: &Shape, new_shape: &Shape, findings: &mut Vec<Finding>) {
    let id = Some(new_shape.id().clone());
    match (
        old_shape.has_trait(&ids::input()),
        new_shape.has_trait(&ids::input()),
    ) {
        (false, true) => findings.push(Finding::new(
            ValidationEvent::danger(
                "ChangedNullability.AddedInputTrait",
                id,
                "the @input trait was added to an existing structure; clients may treat its members differently",
            ),
            "no @input",
            "@input",
        )),
        (true, false) => findings.push(Finding::new(
            ValidationEvent::error(
                "ChangedNullability.RemovedInputTrait",
                id,
                "the @input trait was removed, which makes optional members required for clients",
            ),
            "@input",
            "no @input",
        )),
        _ => {}
    }
}

fn check_added_member(new: &Model, new_shape: &Shape, member: &Shape, findings: &mut Vec<Finding>) {
    if new_shape.has_trait(&ids::input()) {
        return;
    }
    if MemberState::of(new, member) == MemberState::Required {
        findings.push(Finding::new(
            ValidationEvent::error(
                "AddedRequiredMember",
                Some(member.id().clone()),
                "a required member without a default was added to an existing structure",
            ),
            "absent",
            MemberState::Required,
        ));
    }
}

fn check_member(
    old: &Model,
    new: &Model,
    old_shape: &Shape,
    new_shape: &Shape,
    old_member: &Shape,
    new_member: &Shape,
    findings: &mut Vec<Finding>,
) {
    let from = MemberState::of(old, old_member);
    let to = MemberState::of(new, new_member);
    let id = Some(new_member.id().clone());

    if from == MemberState::Defaulted && to == MemberState::Defaulted {
        let old_default = effective_default(old, old_member);
        let new_default = effective_default(new, new_member);
        if old_default != new_default {
            let render = |v: Option<&Value>| v.map(Value::to_string).unwrap_or_default();
            findings.push(Finding::new(
                ValidationEvent::danger(
                    "ChangedDefault",
                    id,
                    format!(
                        "default value changed from {} to {}",
                        render(old_default),
                        render(new_default)
                    ),
                ),
                render(old_default),
                render(new_default),
            ));
        }
        return;
    }
    if from.can_transition_to(to) {
        return;
    }

    let event = match (from, to) {
        (MemberState::Required, MemberState::Optional) => {
            let input = old_shape.has_trait(&ids::input()) && new_shape.has_trait(&ids::input());
            if input || new_member.has_trait(&ids::client_optional()) {
                return;
            }
            let message = format!("member changed from {from} to {to}");
            if new
                .member_target(new_member)
                .is_some_and(|t| matches!(t.kind(), ShapeKind::Structure | ShapeKind::Union))
            {
                ValidationEvent::warning("ChangedNullability", id, message)
            } else {
                ValidationEvent::error("ChangedNullability", id, message)
            }
        }
        (MemberState::Optional, MemberState::Defaulted) => {
            if new_member.has_trait(&ids::added_default()) {
                return;
            }
            ValidationEvent::error(
                "ChangedDefault",
                id,
                "a default was added to an existing member without @addedDefault",
            )
        }
        (MemberState::Defaulted, MemberState::Required | MemberState::ClientOptionalRequired) => {
            ValidationEvent::danger(
                "ChangedDefault",
                id,
                format!("default removed from a {to} member; callers must now send a value"),
            )
        }
        _ => ValidationEvent::error(
            "ChangedNullability",
            id,
            format!("member changed from {from} to {to}"),
        ),
    };
    findings.push(Finding::new(event, from, to));
}

fn effective_default<'m>(model: &'m Model, member: &'m Shape) -> Option<&'m Value> {
    member
        .get_trait(&ids::default())
        .or_else(|| model.member_target(member)?.get_trait(&ids::default()))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::{ShapeGraph, ShapeId};

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    fn string() -> ShapeId {
        ShapeId::prelude("String")
    }

    fn model(shapes: Vec<Shape>) -> Model {
        let mut graph = ShapeGraph::with_prelude();
        for shape in shapes {
            graph.add_shape(shape).unwrap();
        }
        graph.freeze()
    }

    fn single(member: Vec<(ShapeId, Value)>) -> Model {
        model(vec![ShapeBuilder::structure(id("S"))
            .member_with("m", string(), member)
            .build()])
    }

    fn required() -> (ShapeId, Value) {
        (ids::required(), json!({}))
    }

    #[test]
    fn required_to_default_is_accepted() {
        let old = single(vec![required()]);
        let new = single(vec![required(), (ids::default(), json!("x"))]);
        let report = diff(&old, &new);
        assert!(report.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn required_to_optional_is_rejected() {
        let old = single(vec![required()]);
        let new = single(vec![]);
        let report = diff(&old, &new);
        assert!(report.has_errors());
        let err = report.into_result().unwrap_err();
        assert_eq!(
            err,
            ModelError::BackwardCompatibilityViolation {
                id: id("S").with_member("m"),
                from: "required".into(),
                to: "optional".into(),
            }
        );
        assert_eq!(err.event_id(), "BackwardCompatibility");
    }

    #[test]
    fn required_to_optional_in_input_structure() {
        let build = |traits: Vec<(ShapeId, Value)>| {
            model(vec![ShapeBuilder::structure(id("S"))
                .with_trait(ids::input(), json!({}))
                .member_with("m", string(), traits)
                .build()])
        };
        assert!(diff(&build(vec![required()]), &build(vec![])).is_empty());
    }

    #[test]
    fn required_to_optional_with_client_optional() {
        let old = single(vec![required()]);
        let new = single(vec![(ids::client_optional(), json!({}))]);
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn dropping_required_on_a_structure_target_warns() {
        let build = |traits: Vec<(ShapeId, Value)>| {
            model(vec![
                ShapeBuilder::structure(id("Inner")).build(),
                ShapeBuilder::structure(id("S"))
                    .member_with("m", id("Inner"), traits)
                    .build(),
            ])
        };
        let report = diff(&build(vec![required()]), &build(vec![]));
        let events = report.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Warning);
        assert!(!report.has_errors());
    }

    #[test]
    fn optional_to_required_needs_client_optional() {
        let old = single(vec![]);
        assert!(diff(&old, &single(vec![required()])).has_errors());
        assert!(diff(
            &old,
            &single(vec![required(), (ids::client_optional(), json!({}))])
        )
        .is_empty());
    }

    #[test]
    fn removing_a_default_is_rejected() {
        let old = single(vec![(ids::default(), json!("x"))]);
        let report = diff(&old, &single(vec![]));
        assert!(report.has_errors());
        assert_eq!(report.findings()[0].from, "defaulted");
        assert_eq!(report.findings()[0].to, "optional");
    }

    #[test]
    fn changing_a_default_is_dangerous() {
        let old = single(vec![(ids::default(), json!("x"))]);
        let new = single(vec![(ids::default(), json!("y"))]);
        let events = diff(&old, &new).events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ChangedDefault");
        assert_eq!(events[0].severity, Severity::Danger);
    }

    #[test]
    fn adding_a_default_needs_added_default() {
        let old = single(vec![]);
        assert!(diff(&old, &single(vec![(ids::default(), json!("x"))])).has_errors());
        assert!(diff(
            &old,
            &single(vec![(ids::default(), json!("x")), (ids::added_default(), json!({}))])
        )
        .is_empty());
    }

    #[test]
    fn added_members_and_input_trait() {
        let old = model(vec![ShapeBuilder::structure(id("S")).build()]);
        let new = model(vec![ShapeBuilder::structure(id("S"))
            .with_trait(ids::input(), json!({}))
            .member_with("m", string(), [required()])
            .build()]);
        let events = diff(&old, &new).events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ChangedNullability.AddedInputTrait");

        let new = model(vec![ShapeBuilder::structure(id("S"))
            .member_with("m", string(), [required()])
            .member("optional", string())
            .build()]);
        let events = diff(&old, &new).events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "AddedRequiredMember");

        let old = model(vec![ShapeBuilder::structure(id("S"))
            .with_trait(ids::input(), json!({}))
            .build()]);
        let new = model(vec![ShapeBuilder::structure(id("S")).build()]);
        assert!(diff(&old, &new).has_errors());
    }
}
