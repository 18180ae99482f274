//! Advisory validators. They report WARNING events that can be suppressed.

use std::collections::{BTreeMap, BTreeSet};

use tessel_core::traits::ids;
use tessel_core::{Model, Shape, ShapeId, ShapeKind, ValidationEvent};
use tessel_resolve::{MemberContext, MetaTraitTable, NullabilityRecord};

use crate::validator::Validator;

/// Structure members whose optionality depends on who reads them.
///
/// A member targeting an unboxed boolean or number with neither `@required`
/// nor a resolved default reads as "zero" to some consumers and "absent" to
/// others.
#[derive(Debug, Default)]
pub struct AmbiguousNullabilityValidator;

impl Validator for AmbiguousNullabilityValidator {
    fn name(&self) -> &str {
        "AmbiguousNullability"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut events = Vec::new();
        for member in model.shapes().flat_map(Shape::members) {
            let Some(target) = model.member_target(member) else {
                continue;
            };
            let primitive_like = target.kind() == ShapeKind::Boolean
                || (target.kind().is_number() && target.kind() != ShapeKind::IntEnum);
            if !primitive_like
                || target.has_trait(&ids::box_trait())
                || member.has_trait(&ids::box_trait())
            {
                continue;
            }
            let Some(record) = NullabilityRecord::resolve(model, member) else {
                continue;
            };
            if record.context == MemberContext::Structure && !record.is_required && !record.has_default {
                events.push(ValidationEvent::warning(
                    "AmbiguousNullability",
                    Some(member.id().clone()),
                    format!(
                        "member targets {} `{}` but is neither @required nor defaulted; \
                         add @default or @required to make its optionality explicit",
                        target.kind(),
                        target.id()
                    ),
                ));
            }
        }
        events
    }
}

/// A structure used as the input of one operation and the output of another.
#[derive(Debug, Default)]
pub struct InputOutputReuseValidator;

impl Validator for InputOutputReuseValidator {
    fn name(&self) -> &str {
        "InputOutputStructureReuse"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let mut inputs: BTreeMap<&ShapeId, Vec<&ShapeId>> = BTreeMap::new();
        let mut outputs: BTreeMap<&ShapeId, Vec<&ShapeId>> = BTreeMap::new();
        for operation in model.shapes_of_kind(ShapeKind::Operation) {
            let Some(bindings) = operation.bindings().as_operation() else {
                continue;
            };
            if let Some(input) = &bindings.input {
                inputs.entry(input).or_default().push(operation.id());
            }
            if let Some(output) = &bindings.output {
                outputs.entry(output).or_default().push(operation.id());
            }
        }

        inputs
            .iter()
            .filter(|(id, _)| **id != &ShapeId::prelude("Unit"))
            .filter_map(|(id, as_input)| {
                let as_output = outputs.get(id)?;
                Some(ValidationEvent::warning(
                    "InputOutputStructureReuse",
                    Some((*id).clone()),
                    format!(
                        "structure is the input of {} and the output of {}",
                        render(as_input),
                        render(as_output)
                    ),
                ))
            })
            .collect()
    }
}

fn render(ids: &[&ShapeId]) -> String {
    ids.iter()
        .map(|id| format!("`{id}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resource lifecycle operations whose structures drift from the resource's
/// declared properties.
///
/// A property no lifecycle input or output mentions, and a lifecycle member
/// that names neither an identifier nor a property, are both reported. Members
/// whose traits carry `@notProperty` are exempt.
#[derive(Debug, Default)]
pub struct ResourcePropertyDriftValidator;

impl Validator for ResourcePropertyDriftValidator {
    fn name(&self) -> &str {
        "ResourcePropertyDrift"
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let meta = MetaTraitTable::build(model);
        let mut events = Vec::new();

        for resource in model.shapes_of_kind(ShapeKind::Resource) {
            let Some(bindings) = resource.bindings().as_resource() else {
                continue;
            };
            if bindings.properties.is_empty() {
                continue;
            }

            let mut used: BTreeSet<&str> = BTreeSet::new();
            for (_, operation_id) in bindings.lifecycle() {
                let Some(operation) = model
                    .get_shape(operation_id)
                    .and_then(|op| op.bindings().as_operation())
                else {
                    continue;
                };
                let structures = [&operation.input, &operation.output]
                    .into_iter()
                    .flatten()
                    .filter_map(|id| model.get_shape(id));
                for structure in structures {
                    for member in structure.members() {
                        let name = member.member_name().unwrap_or_default();
                        if meta.is_not_property(member) || bindings.identifiers.contains_key(name) {
                            continue;
                        }
                        match bindings.properties.get(name) {
                            Some(expected) if Some(expected) != member.target() => {
                                events.push(ValidationEvent::warning(
                                    "ResourcePropertyDrift",
                                    Some(member.id().clone()),
                                    format!(
                                        "member targets `{}`, but resource `{}` declares property `{name}` as `{expected}`",
                                        render_target(member),
                                        resource.id()
                                    ),
                                ));
                                used.insert(name);
                            }
                            Some(_) => {
                                used.insert(name);
                            }
                            None => events.push(ValidationEvent::warning(
                                "ResourcePropertyDrift",
                                Some(member.id().clone()),
                                format!(
                                    "member `{name}` of a `{}` lifecycle operation is neither an identifier nor a property",
                                    resource.id()
                                ),
                            )),
                        }
                    }
                }
            }

            for name in bindings.properties.keys().filter(|name| !used.contains(name.as_str())) {
                events.push(ValidationEvent::warning(
                    "ResourcePropertyDrift",
                    Some(resource.id().clone()),
                    format!("property `{name}` is not used by any lifecycle operation input or output"),
                ));
            }
        }
        events
    }
}

fn render_target(member: &Shape) -> String {
    member
        .target()
        .map(ToString::to_string)
        .unwrap_or_else(|| "nothing".to_string())
}

/// The advisory validators run by default.
pub fn advisory() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(AmbiguousNullabilityValidator),
        Box::new(InputOutputReuseValidator),
        Box::new(ResourcePropertyDriftValidator),
    ]
}
