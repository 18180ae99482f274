//! Trait values, well-known trait ids, and trait-definition metadata.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::shape::Shape;
use crate::shape_id::ShapeId;

/// Traits applied to a shape, keyed by trait shape id.
pub type TraitMap = BTreeMap<ShapeId, Value>;

/// Ids of the prelude traits the core pipeline understands.
pub mod ids {
    use crate::shape_id::ShapeId;

    macro_rules! prelude_traits {
        ($($fn_name:ident => $name:literal),* $(,)?) => {
            $(
                pub fn $fn_name() -> ShapeId {
                    ShapeId::prelude($name)
                }
            )*
        };
    }

    prelude_traits! {
        trait_def => "trait",
        mixin => "mixin",
        required => "required",
        default => "default",
        client_optional => "clientOptional",
        added_default => "addedDefault",
        box_trait => "box",
        input => "input",
        output => "output",
        error => "error",
        documentation => "documentation",
        enum_value => "enumValue",
        length => "length",
        range => "range",
        pattern => "pattern",
        sensitive => "sensitive",
        sparse => "sparse",
        tags => "tags",
        suppress => "suppress",
        idempotency_token => "idempotencyToken",
        not_property => "notProperty",
    }
}

/// The parsed value of a `@trait` definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitDefinition {
    /// Selector limiting where the trait may be applied; `None` means anywhere.
    pub selector: Option<String>,
    /// Traits that may not be applied alongside this one.
    pub conflicts: Vec<ShapeId>,
}

impl TraitDefinition {
    /// Read the definition from a shape carrying `@trait`, if it is one.
    pub fn from_shape(shape: &Shape) -> Option<Self> {
        let value = shape.traits().get(&ids::trait_def())?;
        let selector = value
            .get("selector")
            .and_then(Value::as_str)
            .map(str::to_string);
        let conflicts = value
            .get("conflicts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| ShapeId::parse_relative(s, shape.id().namespace()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            selector,
            conflicts,
        })
    }
}

/// Traits that a mixin keeps to itself, as listed in `@mixin(localTraits: [...])`.
///
/// The `mixin` trait itself is always local.
pub fn local_traits(mixin: &Shape) -> Vec<ShapeId> {
    let mut local = vec![ids::mixin()];
    if let Some(listed) = mixin
        .traits()
        .get(&ids::mixin())
        .and_then(|v| v.get("localTraits"))
        .and_then(Value::as_array)
    {
        local.extend(
            listed
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| ShapeId::parse_relative(s, mixin.id().namespace()).ok()),
        );
    }
    local
}

/// Outcome of combining two values for the same trait.
#[derive(Debug, Clone, PartialEq)]
pub enum TraitMerge {
    /// The values agree, or could be combined.
    Merged(Value),
    /// The values disagree and neither was marked as an override.
    Conflict,
}

/// Combine a trait value already present with a newly applied one.
///
/// Equal values are a no-op. Two arrays combine as a sorted set union so the
/// result does not depend on which source was merged first. Anything else
/// conflicts unless `override_existing` is set.
pub fn merge_values(existing: &Value, incoming: &Value, override_existing: bool) -> TraitMerge {
    if existing == incoming {
        return TraitMerge::Merged(existing.clone());
    }
    if override_existing {
        return TraitMerge::Merged(incoming.clone());
    }
    match (existing, incoming) {
        (Value::Array(a), Value::Array(b)) => {
            let mut items: Vec<Value> = a.clone();
            for item in b {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            items.sort_by_key(|v| v.to_string());
            TraitMerge::Merged(Value::Array(items))
        }
        _ => TraitMerge::Conflict,
    }
}

/// Values of a trait holding a list of strings, such as `@tags` or `@suppress`.
pub fn string_list(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
