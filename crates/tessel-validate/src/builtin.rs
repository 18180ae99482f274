//! Built-in structural validators. Every event they emit is ERROR severity.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tessel_core::traits::{ids, TraitMap};
use tessel_core::{Model, ModelError, Shape, ShapeId, ShapeKind, ValidationEvent};
use tessel_resolve::defaults::check_value;
use tessel_resolve::{check_defaults, flatten_all};
use tessel_selector::Selector;
use tracing::warn;

use crate::validator::Validator;

/// Traits applied where their definition's selector does not match.
#[derive(Debug, Default)]
pub struct TraitTargetValidator;

impl Validator for TraitTargetValidator {
    fn name(&self) -> &str {
        "TraitTarget"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut applied: BTreeMap<&ShapeId, Vec<&Shape>> = BTreeMap::new();
        for shape in model.shapes_with_members() {
            for trait_id in shape.traits().keys() {
                applied.entry(trait_id).or_default().push(shape);
            }
        }

        let mut events = Vec::new();
        for (trait_id, shapes) in applied {
            let Some(selector_text) = model
                .trait_definition(trait_id)
                .and_then(|def| def.selector)
            else {
                continue;
            };
            let selector = match Selector::parse(&selector_text) {
                Ok(selector) => selector,
                Err(err) => {
                    warn!(trait_id = %trait_id, error = %err, "trait definition has an invalid selector");
                    events.push(ValidationEvent::error(
                        "TraitTarget",
                        Some(trait_id.clone()),
                        format!("trait definition has an invalid selector: {err}"),
                    ));
                    continue;
                }
            };
            let allowed = selector.select_ids(model);
            for shape in shapes.into_iter().filter(|s| !allowed.contains(s.id())) {
                events.push(
                    ModelError::TraitSelectorMismatch {
                        id: shape.id().clone(),
                        trait_id: trait_id.clone(),
                        selector: selector_text.clone(),
                    }
                    .to_event(),
                );
            }
        }
        events
    }
}

/// Traits applied together with a trait they declare a conflict with.
#[derive(Debug, Default)]
pub struct TraitConflictValidator;

impl Validator for TraitConflictValidator {
    fn name(&self) -> &str {
        "TraitConflict"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut conflicts: BTreeMap<&ShapeId, Vec<ShapeId>> = BTreeMap::new();
        let mut events = Vec::new();

        for shape in model.shapes_with_members() {
            let mut reported: BTreeSet<(ShapeId, ShapeId)> = BTreeSet::new();
            for trait_id in shape.traits().keys() {
                let declared = conflicts.entry(trait_id).or_insert_with(|| {
                    model
                        .trait_definition(trait_id)
                        .map(|def| def.conflicts)
                        .unwrap_or_default()
                });
                for other in declared.iter().filter(|other| shape.has_trait(other)) {
                    let pair = if trait_id <= other {
                        (trait_id.clone(), other.clone())
                    } else {
                        (other.clone(), trait_id.clone())
                    };
                    if reported.insert(pair) {
                        events.push(
                            ModelError::TraitConflict {
                                id: shape.id().clone(),
                                trait_id: trait_id.clone(),
                                conflicts_with: other.clone(),
                            }
                            .to_event(),
                        );
                    }
                }
            }
        }
        events
    }
}

/// Enums and intEnums must have members, and their values must be unique.
#[derive(Debug, Default)]
pub struct EnumShapeValidator;

impl Validator for EnumShapeValidator {
    fn name(&self) -> &str {
        "EnumShape"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut events = Vec::new();
        for shape in model
            .shapes()
            .filter(|s| matches!(s.kind(), ShapeKind::Enum | ShapeKind::IntEnum))
        {
            if shape.members().is_empty() {
                events.push(ValidationEvent::error(
                    "EnumShape",
                    Some(shape.id().clone()),
                    format!("{} shapes must have at least one member", shape.kind()),
                ));
                continue;
            }

            let mut seen: BTreeMap<String, &str> = BTreeMap::new();
            for member in shape.members() {
                let name = member.member_name().unwrap_or_default();
                let value = match member.get_trait(&ids::enum_value()) {
                    Some(value) => value.to_string(),
                    None if shape.kind() == ShapeKind::Enum => format!("\"{name}\""),
                    None => {
                        events.push(ValidationEvent::error(
                            "EnumShape",
                            Some(member.id().clone()),
                            "intEnum members must have an @enumValue",
                        ));
                        continue;
                    }
                };
                if let Some(first) = seen.get(&value) {
                    events.push(ValidationEvent::error(
                        "EnumShape",
                        Some(member.id().clone()),
                        format!("value {value} is already used by member `{first}`"),
                    ));
                } else {
                    seen.insert(value, name);
                }
            }
        }
        events
    }
}

/// Trait values that do not fit the shape of their trait definition.
///
/// Lists, maps, structures and unions are walked into; scalars get the same
/// kind and constraint checks as default values. Structure keys the trait
/// shape does not declare are not reported.
#[derive(Debug, Default)]
pub struct TraitValueValidator;

impl Validator for TraitValueValidator {
    fn name(&self) -> &str {
        "TraitValue"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut events = Vec::new();
        for shape in model.shapes_with_members() {
            for (trait_id, value) in shape.traits() {
                let Some(definition) = model.get_shape(trait_id) else {
                    continue;
                };
                let mut problems = Vec::new();
                check_node(model, definition, &[definition.traits()], value, "", &mut problems);
                for (path, reason) in problems {
                    let location = if path.is_empty() {
                        String::new()
                    } else {
                        format!(" at `{path}`")
                    };
                    events.push(ValidationEvent::error(
                        "TraitValue",
                        Some(shape.id().clone()),
                        format!("invalid value for trait `{trait_id}`{location}: {reason}"),
                    ));
                }
            }
        }
        events
    }
}

fn check_node(
    model: &Model,
    shape: &Shape,
    constraints: &[&TraitMap],
    value: &Value,
    path: &str,
    problems: &mut Vec<(String, String)>,
) {
    let nested = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };
    let kind = shape.kind();
    match kind {
        ShapeKind::List => {
            let Some(items) = value.as_array() else {
                problems.push((path.to_string(), format!("expected a list, found {value}")));
                return;
            };
            if let Some((member, target)) = member_and_target(model, shape, "member") {
                for (i, item) in items.iter().enumerate() {
                    let traits = [member.traits(), target.traits()];
                    check_node(model, target, &traits, item, &format!("{path}[{i}]"), problems);
                }
            }
        }
        ShapeKind::Map => {
            let Some(entries) = value.as_object() else {
                problems.push((path.to_string(), format!("expected a map, found {value}")));
                return;
            };
            let key = member_and_target(model, shape, "key");
            let entry = member_and_target(model, shape, "value");
            for (name, item) in entries {
                if let Some((member, target)) = key {
                    let traits = [member.traits(), target.traits()];
                    let name_value = Value::String(name.clone());
                    check_node(model, target, &traits, &name_value, &nested(name), problems);
                }
                if let Some((member, target)) = entry {
                    let traits = [member.traits(), target.traits()];
                    check_node(model, target, &traits, item, &nested(name), problems);
                }
            }
        }
        ShapeKind::Structure => {
            let Some(entries) = value.as_object() else {
                problems.push((path.to_string(), format!("expected an object, found {value}")));
                return;
            };
            for member in shape.members() {
                let name = member.member_name().unwrap_or_default();
                match entries.get(name) {
                    Some(item) => {
                        if let Some(target) = model.member_target(member) {
                            let traits = [member.traits(), target.traits()];
                            check_node(model, target, &traits, item, &nested(name), problems);
                        }
                    }
                    None if member.has_trait(&ids::required()) => problems.push((
                        path.to_string(),
                        format!("missing required member `{name}`"),
                    )),
                    None => {}
                }
            }
        }
        ShapeKind::Union => {
            let Some(entries) = value.as_object() else {
                problems.push((path.to_string(), format!("expected an object, found {value}")));
                return;
            };
            let mut iter = entries.iter();
            let (Some((name, item)), None) = (iter.next(), iter.next()) else {
                problems.push((path.to_string(), "a union value must set exactly one member".into()));
                return;
            };
            match member_and_target(model, shape, name) {
                Some((member, target)) => {
                    let traits = [member.traits(), target.traits()];
                    check_node(model, target, &traits, item, &nested(name), problems);
                }
                None => problems.push((path.to_string(), format!("`{name}` is not a member of the union"))),
            }
        }
        ShapeKind::Service | ShapeKind::Operation | ShapeKind::Resource | ShapeKind::Member => {
            problems.push((path.to_string(), format!("{kind} shapes do not describe values")));
        }
        _ => {
            if let Err(reason) = check_value(shape, value, constraints) {
                problems.push((path.to_string(), reason));
            }
        }
    }
}

fn member_and_target<'m>(model: &'m Model, shape: &'m Shape, name: &str) -> Option<(&'m Shape, &'m Shape)> {
    let member = shape.get_member(name)?;
    Some((member, model.member_target(member)?))
}

/// Default values that do not fit their target.
#[derive(Debug, Default)]
pub struct DefaultValueValidator;

impl Validator for DefaultValueValidator {
    fn name(&self) -> &str {
        "DefaultValue"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        check_defaults(model).iter().map(ModelError::to_event).collect()
    }
}

/// References that do not resolve, and misuse of mixins.
///
/// The assembly pipeline rejects these before a model is frozen; this
/// validator catches models built by hand.
#[derive(Debug, Default)]
pub struct ReferenceValidator;

impl Validator for ReferenceValidator {
    fn name(&self) -> &str {
        "Reference"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let graph = model.to_graph();
        let mut errors = graph.unresolved_references();
        errors.extend(flatten_all(&graph).1);
        errors.iter().map(ModelError::to_event).collect()
    }
}

/// The structural validators every model runs.
pub fn structural() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(ReferenceValidator),
        Box::new(TraitTargetValidator),
        Box::new(TraitConflictValidator),
        Box::new(TraitValueValidator),
        Box::new(EnumShapeValidator),
        Box::new(DefaultValueValidator),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::{Severity, ShapeGraph};

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    fn model_with(shapes: Vec<Shape>) -> Model {
        let mut graph = ShapeGraph::with_prelude();
        for shape in shapes {
            graph.add_shape(shape).unwrap();
        }
        graph.freeze()
    }

    #[test]
    fn prelude_is_clean() {
        let model = model_with(vec![]);
        for validator in structural() {
            assert!(
                validator.validate(&model).is_empty(),
                "{} reported events on the prelude",
                validator.name()
            );
        }
    }

    #[test]
    fn trait_applied_outside_its_selector() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("Thing"))
                .with_trait(ids::required(), json!({}))
                .member_with("ok", ShapeId::prelude("String"), [(ids::required(), json!({}))])
                .build(),
        ]);
        let events = TraitTargetValidator.validate(&model);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "TraitTarget");
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].shape_id, Some(id("Thing")));
    }

    #[test]
    fn conflicting_traits_are_reported_once() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("Both"))
                .with_trait(ids::input(), json!({}))
                .with_trait(ids::output(), json!({}))
                .build(),
        ]);
        let events = TraitConflictValidator.validate(&model);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "TraitConflict");
    }

    #[test]
    fn enums_need_unique_members() {
        let model = model_with(vec![
            ShapeBuilder::new(id("Empty"), ShapeKind::Enum).build(),
            ShapeBuilder::new(id("Dupes"), ShapeKind::Enum)
                .enum_member("A", json!("a"))
                .enum_member("B", json!("a"))
                .build(),
            ShapeBuilder::new(id("Fine"), ShapeKind::IntEnum)
                .enum_member("ONE", json!(1))
                .enum_member("TWO", json!(2))
                .build(),
        ]);
        let events = EnumShapeValidator.validate(&model);
        let on: Vec<_> = events.iter().filter_map(|e| e.shape_id.clone()).collect();
        assert_eq!(on, vec![id("Empty"), id("Dupes").with_member("B")]);
    }

    #[test]
    fn trait_values_must_fit_their_definitions() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("Thing"))
                .with_trait(ids::tags(), json!("not-a-list"))
                .with_trait(ids::documentation(), json!(42))
                .member_with("count", ShapeId::prelude("Integer"), [(ids::range(), json!("nonsense"))])
                .build(),
            ShapeBuilder::structure(id("Fine"))
                .with_trait(ids::tags(), json!(["a", "b"]))
                .with_trait(ids::documentation(), json!("Fine"))
                .member_with("count", ShapeId::prelude("Integer"), [(ids::range(), json!({"min": 1}))])
                .build(),
        ]);
        let events = TraitValueValidator.validate(&model);
        assert_eq!(events.len(), 3, "{events:?}");
        assert!(events.iter().all(|e| e.id == "TraitValue" && e.severity == Severity::Error));

        let on: BTreeSet<_> = events.iter().filter_map(|e| e.shape_id.clone()).collect();
        assert_eq!(on, BTreeSet::from([id("Thing"), id("Thing").with_member("count")]));
        assert!(events.iter().any(|e| e.message.contains("expected a list")));
        assert!(events.iter().any(|e| e.message.contains("expected a string")));
        assert!(events.iter().any(|e| e.message.contains("expected an object")));
    }

    #[test]
    fn structured_trait_values_are_checked_member_by_member() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("retryPolicy"))
                .with_trait(ids::trait_def(), json!({}))
                .member_with("name", ShapeId::prelude("String"), [(ids::required(), json!({}))])
                .member("attempts", ShapeId::prelude("Integer"))
                .build(),
            ShapeBuilder::structure(id("Job"))
                .with_trait(id("retryPolicy"), json!({"attempts": "three"}))
                .build(),
            ShapeBuilder::structure(id("OtherJob"))
                .with_trait(id("retryPolicy"), json!({"name": "fast", "attempts": 3}))
                .build(),
        ]);
        let events = TraitValueValidator.validate(&model);
        assert_eq!(events.len(), 2, "{events:?}");
        assert!(events.iter().all(|e| e.shape_id == Some(id("Job"))));
        assert!(events
            .iter()
            .any(|e| e.message.contains("missing required member `name`")));
        assert!(events
            .iter()
            .any(|e| e.message.contains("at `attempts`") && e.message.contains("expected an integer")));
    }

    #[test]
    fn union_trait_values_set_one_member() {
        let model = model_with(vec![
            ShapeBuilder::union(id("auth"))
                .with_trait(ids::trait_def(), json!({}))
                .member("token", ShapeId::prelude("String"))
                .member("key", ShapeId::prelude("String"))
                .build(),
            ShapeBuilder::structure(id("Both"))
                .with_trait(id("auth"), json!({"token": "a", "key": "b"}))
                .build(),
            ShapeBuilder::structure(id("Unknown"))
                .with_trait(id("auth"), json!({"password": "x"}))
                .build(),
            ShapeBuilder::structure(id("One"))
                .with_trait(id("auth"), json!({"token": "a"}))
                .build(),
        ]);
        let events = TraitValueValidator.validate(&model);
        let on: Vec<_> = events.iter().filter_map(|e| e.shape_id.clone()).collect();
        assert_eq!(on, vec![id("Both"), id("Unknown")]);
    }

    #[test]
    fn invalid_defaults_become_events() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("Holder"))
                .member_with("n", ShapeId::prelude("String"), [(ids::default(), json!(5))])
                .build(),
        ]);
        let events = DefaultValueValidator.validate(&model);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "InvalidDefaultValue");
    }

    #[test]
    fn hand_built_models_with_dangling_targets_are_caught() {
        let model = model_with(vec![
            ShapeBuilder::structure(id("Holder"))
                .member("missing", id("Nowhere"))
                .build(),
        ]);
        let events = ReferenceValidator.validate(&model);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "UnresolvedShape");
    }
}
