//! The prelude: shapes and traits every model can reference implicitly.
//!
//! The prelude graph is built once per process and never mutated; each load
//! starts from a clone of it.

use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::builder::ShapeBuilder;
use crate::graph::ShapeGraph;
use crate::shape::{Shape, ShapeKind};
use crate::shape_id::ShapeId;
use crate::traits::ids;

static PRELUDE: OnceLock<ShapeGraph> = OnceLock::new();

/// The shared prelude graph.
pub fn prelude() -> &'static ShapeGraph {
    PRELUDE.get_or_init(build)
}

/// Whether `id` names a prelude shape (or one of its members).
pub fn is_prelude_shape(id: &ShapeId) -> bool {
    id.is_prelude() && prelude().contains(id)
}

const BOXED: [(&str, ShapeKind); 7] = [
    ("Boolean", ShapeKind::Boolean),
    ("Byte", ShapeKind::Byte),
    ("Short", ShapeKind::Short),
    ("Integer", ShapeKind::Integer),
    ("Long", ShapeKind::Long),
    ("Float", ShapeKind::Float),
    ("Double", ShapeKind::Double),
];

fn build() -> ShapeGraph {
    let mut graph = ShapeGraph::new();

    for (name, kind) in [
        ("String", ShapeKind::String),
        ("Blob", ShapeKind::Blob),
        ("BigInteger", ShapeKind::BigInteger),
        ("BigDecimal", ShapeKind::BigDecimal),
        ("Timestamp", ShapeKind::Timestamp),
        ("Document", ShapeKind::Document),
    ] {
        graph.insert(Shape::new(ShapeId::prelude(name), kind));
    }
    graph.insert(Shape::new(ShapeId::prelude("Unit"), ShapeKind::Structure));

    for (name, kind) in BOXED {
        graph.insert(
            ShapeBuilder::new(ShapeId::prelude(name), kind)
                .with_trait(ids::box_trait(), json!({}))
                .build(),
        );
        let zero = if kind == ShapeKind::Boolean {
            json!(false)
        } else {
            json!(0)
        };
        graph.insert(
            ShapeBuilder::new(ShapeId::prelude(format!("Primitive{name}")), kind)
                .with_trait(ids::default(), zero)
                .build(),
        );
    }

    for (name, kind, definition) in trait_definitions() {
        let builder = match kind {
            ShapeKind::List => ShapeBuilder::list(ShapeId::prelude(name), ShapeId::prelude("String")),
            _ => ShapeBuilder::new(ShapeId::prelude(name), kind),
        };
        graph.insert(builder.with_trait(ids::trait_def(), definition).build());
    }

    // Meta-traits applied to trait definitions.
    if let Some(token) = graph.get_shape_mut(&ids::idempotency_token()) {
        token.traits_mut().insert(ids::not_property(), json!({}));
    }

    graph
}

fn trait_definitions() -> Vec<(&'static str, ShapeKind, Value)> {
    vec![
        ("trait", ShapeKind::Structure, json!({})),
        ("mixin", ShapeKind::Structure, json!({"selector": ":not(member)"})),
        ("required", ShapeKind::Structure, json!({"selector": "structure > member"})),
        ("clientOptional", ShapeKind::Structure, json!({"selector": "structure > member"})),
        ("addedDefault", ShapeKind::Structure, json!({"selector": "structure > member"})),
        (
            "default",
            ShapeKind::Document,
            json!({"selector": ":is(simpleType, list, map, structure > member)"}),
        ),
        ("box", ShapeKind::Structure, json!({"selector": ":is(member, number, boolean)"})),
        (
            "input",
            ShapeKind::Structure,
            json!({"selector": "structure", "conflicts": ["smithy.api#output", "smithy.api#error"]}),
        ),
        (
            "output",
            ShapeKind::Structure,
            json!({"selector": "structure", "conflicts": ["smithy.api#input", "smithy.api#error"]}),
        ),
        ("error", ShapeKind::String, json!({"selector": "structure"})),
        ("documentation", ShapeKind::String, json!({})),
        ("enumValue", ShapeKind::Document, json!({"selector": ":is(enum, intEnum) > member"})),
        (
            "length",
            ShapeKind::Structure,
            json!({"selector": ":is(list, map, string, blob, member)"}),
        ),
        ("range", ShapeKind::Structure, json!({"selector": ":is(number, member)"})),
        ("pattern", ShapeKind::String, json!({"selector": ":is(string, member)"})),
        (
            "sensitive",
            ShapeKind::Structure,
            json!({"selector": ":not(:is(service, operation, resource, member))"}),
        ),
        ("sparse", ShapeKind::Structure, json!({"selector": ":is(list, map)"})),
        ("tags", ShapeKind::List, json!({})),
        ("suppress", ShapeKind::List, json!({})),
        ("idempotencyToken", ShapeKind::Structure, json!({"selector": "structure > member"})),
        (
            "notProperty",
            ShapeKind::Structure,
            json!({"selector": ":is(structure > member, [trait|trait])"}),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_is_shared_and_resolved() {
        let a = prelude() as *const ShapeGraph;
        let b = prelude() as *const ShapeGraph;
        assert_eq!(a, b);
        assert!(prelude().unresolved_references().is_empty());
    }

    #[test]
    fn boxed_and_primitive_variants() {
        let integer = prelude().get_shape(&ShapeId::prelude("Integer")).unwrap();
        assert!(integer.has_trait(&ids::box_trait()));
        let primitive = prelude()
            .get_shape(&ShapeId::prelude("PrimitiveBoolean"))
            .unwrap();
        assert_eq!(primitive.get_trait(&ids::default()), Some(&json!(false)));
    }

    #[test]
    fn idempotency_token_carries_not_property() {
        let token = prelude().get_shape(&ids::idempotency_token()).unwrap();
        assert!(token.is_trait_definition());
        assert!(token.has_trait(&ids::not_property()));
        assert!(is_prelude_shape(&ids::required()));
        assert!(!is_prelude_shape(&ShapeId::new("ex", "required")));
    }
}
