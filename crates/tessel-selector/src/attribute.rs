//! Attribute values and comparisons.
//!
//! Selector attributes resolve to one of three things: a scalar, the empty
//! value, or a projection (an unordered multiset of values). The empty value
//! never satisfies a comparison; only `?=` can observe it.

use std::collections::BTreeSet;

use serde_json::Value;
use tessel_core::shape_id::PRELUDE_NAMESPACE;
use tessel_core::{Shape, ShapeId, ShapeKind};
use tracing::warn;

use crate::ast::Comparator;

const KEYS: &str = "(keys)";
const VALUES: &str = "(values)";
const LENGTH: &str = "(length)";

/// A value produced by walking an attribute path.
#[derive(Debug, Clone)]
pub enum AttributeValue<'m> {
    Empty,
    Literal(String),
    Node(&'m Value),
    Shape(&'m Shape),
    Id(&'m ShapeId),
    Traits(&'m Shape),
    Service(&'m Shape),
    Projection(Vec<AttributeValue<'m>>),
}

impl<'m> AttributeValue<'m> {
    pub fn literal(value: impl ToString) -> Self {
        AttributeValue::Literal(value.to_string())
    }

    /// Whether the value exists; null nodes and empty projections do not.
    pub fn is_present(&self) -> bool {
        match self {
            AttributeValue::Empty => false,
            AttributeValue::Node(node) => !node.is_null(),
            AttributeValue::Projection(values) => !values.is_empty(),
            _ => true,
        }
    }

    pub fn is_projection(&self) -> bool {
        matches!(self, AttributeValue::Projection(_))
    }

    /// String form used by comparisons. Aggregates render as "".
    pub fn render(&self) -> String {
        match self {
            AttributeValue::Literal(s) => s.clone(),
            AttributeValue::Node(Value::String(s)) => s.clone(),
            AttributeValue::Node(Value::Number(n)) => n.to_string(),
            AttributeValue::Node(Value::Bool(b)) => b.to_string(),
            AttributeValue::Shape(shape) => shape.id().to_string(),
            AttributeValue::Id(id) => id.to_string(),
            _ => String::new(),
        }
    }

    /// Resolve one path segment.
    pub fn property(&self, key: &str) -> AttributeValue<'m> {
        match self {
            AttributeValue::Empty => AttributeValue::Empty,
            AttributeValue::Literal(s) => match key {
                LENGTH => AttributeValue::literal(s.chars().count()),
                _ => AttributeValue::Empty,
            },
            AttributeValue::Node(node) => node_property(node, key),
            AttributeValue::Shape(shape) => match key {
                "id" => AttributeValue::Id(shape.id()),
                "trait" => AttributeValue::Traits(shape),
                "service" if shape.kind() == ShapeKind::Service => AttributeValue::Service(shape),
                "service" => AttributeValue::Empty,
                other => {
                    warn!(attribute = other, "unsupported shape selector attribute");
                    AttributeValue::Empty
                }
            },
            AttributeValue::Id(id) => id_property(id, key),
            AttributeValue::Traits(shape) => traits_property(shape, key),
            AttributeValue::Service(shape) => {
                let version = shape
                    .bindings()
                    .as_service()
                    .and_then(|svc| svc.version.clone())
                    .unwrap_or_default();
                match key {
                    "version" => AttributeValue::Literal(version),
                    KEYS => AttributeValue::Projection(vec![AttributeValue::literal("version")]),
                    VALUES => AttributeValue::Projection(vec![AttributeValue::Literal(version)]),
                    LENGTH => AttributeValue::literal(1),
                    _ => AttributeValue::Empty,
                }
            }
            AttributeValue::Projection(values) => AttributeValue::Projection(
                values
                    .iter()
                    .map(|v| v.property(key))
                    .filter(AttributeValue::is_present)
                    .collect(),
            ),
        }
    }

    /// Resolve a whole path.
    pub fn path(&self, path: &[String]) -> AttributeValue<'m> {
        path.iter()
            .fold(self.clone(), |value, key| value.property(key))
    }

    /// Scalar values of a projection, with nested projections flattened.
    pub fn flatten(&self) -> Vec<AttributeValue<'m>> {
        match self {
            AttributeValue::Projection(values) => values.iter().flat_map(|v| v.flatten()).collect(),
            other => vec![other.clone()],
        }
    }
}

fn node_property<'m>(node: &'m Value, key: &str) -> AttributeValue<'m> {
    match node {
        Value::Object(map) => match key {
            KEYS => AttributeValue::Projection(map.keys().map(AttributeValue::literal).collect()),
            VALUES => AttributeValue::Projection(map.values().map(AttributeValue::Node).collect()),
            LENGTH => AttributeValue::literal(map.len()),
            _ => map.get(key).map(AttributeValue::Node).unwrap_or(AttributeValue::Empty),
        },
        Value::Array(items) => match key {
            VALUES => AttributeValue::Projection(items.iter().map(AttributeValue::Node).collect()),
            LENGTH => AttributeValue::literal(items.len()),
            _ => AttributeValue::Empty,
        },
        Value::String(s) if key == LENGTH => AttributeValue::literal(s.chars().count()),
        _ => AttributeValue::Empty,
    }
}

fn id_property<'m>(id: &'m ShapeId, key: &str) -> AttributeValue<'m> {
    match key {
        "name" => AttributeValue::literal(id.name()),
        "namespace" => AttributeValue::literal(id.namespace()),
        "member" => id
            .member()
            .map(AttributeValue::literal)
            .unwrap_or(AttributeValue::Empty),
        KEYS => {
            let mut keys = vec![AttributeValue::literal("namespace"), AttributeValue::literal("name")];
            if id.is_member() {
                keys.push(AttributeValue::literal("member"));
            }
            AttributeValue::Projection(keys)
        }
        VALUES => {
            let mut values = vec![
                AttributeValue::literal(id.namespace()),
                AttributeValue::literal(id.name()),
            ];
            if let Some(member) = id.member() {
                values.push(AttributeValue::literal(member));
            }
            AttributeValue::Projection(values)
        }
        LENGTH => AttributeValue::literal(id.to_string().len()),
        _ => AttributeValue::Empty,
    }
}

fn traits_property<'m>(shape: &'m Shape, key: &str) -> AttributeValue<'m> {
    match key {
        KEYS => AttributeValue::Projection(shape.traits().keys().map(AttributeValue::Id).collect()),
        VALUES => AttributeValue::Projection(shape.traits().values().map(AttributeValue::Node).collect()),
        LENGTH => AttributeValue::literal(shape.traits().len()),
        // Relative trait names resolve against the prelude.
        name => match ShapeId::parse_relative(name, PRELUDE_NAMESPACE) {
            Ok(trait_id) => shape
                .get_trait(&trait_id)
                .map(AttributeValue::Node)
                .unwrap_or(AttributeValue::Empty),
            Err(_) => AttributeValue::Empty,
        },
    }
}

/// Compare `lhs` against each candidate on the right; any match satisfies.
pub fn compare(
    lhs: &AttributeValue<'_>,
    comparator: Comparator,
    rhs: &[AttributeValue<'_>],
    case_insensitive: bool,
) -> bool {
    if comparator.is_projection() {
        return rhs
            .iter()
            .any(|r| compare_projections(lhs, comparator, r, case_insensitive));
    }

    if comparator == Comparator::Exists {
        let present = lhs.is_present();
        return rhs.iter().any(|r| match r.render().as_str() {
            "true" => present,
            "false" => !present,
            _ => false,
        });
    }

    if !lhs.is_present() {
        return false;
    }

    let rhs_values: Vec<AttributeValue<'_>> = rhs.iter().flat_map(AttributeValue::flatten).collect();
    lhs.flatten().iter().filter(|l| l.is_present()).any(|l| {
        let left = normalize(&l.render(), case_insensitive);
        rhs_values.iter().filter(|r| r.is_present()).any(|r| {
            let right = normalize(&r.render(), case_insensitive);
            compare_scalars(&left, comparator, &right)
        })
    })
}

fn compare_scalars(left: &str, comparator: Comparator, right: &str) -> bool {
    match comparator {
        Comparator::Equals => left == right,
        Comparator::NotEquals => left != right,
        Comparator::StartsWith => left.starts_with(right),
        Comparator::EndsWith => left.ends_with(right),
        Comparator::Contains => left.contains(right),
        Comparator::GreaterThan => numeric(left, right, |a, b| a > b),
        Comparator::GreaterThanOrEqual => numeric(left, right, |a, b| a >= b),
        Comparator::LessThan => numeric(left, right, |a, b| a < b),
        Comparator::LessThanOrEqual => numeric(left, right, |a, b| a <= b),
        _ => false,
    }
}

fn numeric(left: &str, right: &str, op: impl Fn(f64, f64) -> bool) -> bool {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(a), Ok(b)) => op(a, b),
        _ => false,
    }
}

fn normalize(value: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}

/// Projection comparators compare sets of rendered values.
///
/// If either side is not a projection, `{!=}` holds and every other
/// projection comparator fails.
fn compare_projections(
    lhs: &AttributeValue<'_>,
    comparator: Comparator,
    rhs: &AttributeValue<'_>,
    case_insensitive: bool,
) -> bool {
    if !lhs.is_projection() || !rhs.is_projection() {
        return comparator == Comparator::ProjectionNotEquals;
    }

    let set = |value: &AttributeValue<'_>| -> BTreeSet<String> {
        value
            .flatten()
            .iter()
            .filter(|v| v.is_present())
            .map(|v| normalize(&v.render(), case_insensitive))
            .collect()
    };
    let left = set(lhs);
    let right = set(rhs);

    match comparator {
        Comparator::ProjectionEquals => left == right,
        Comparator::ProjectionNotEquals => left != right,
        Comparator::Subset => left.is_subset(&right),
        Comparator::ProperSubset => left.is_subset(&right) && left != right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::traits::ids;

    use super::*;

    fn literal(s: &str) -> AttributeValue<'static> {
        AttributeValue::literal(s)
    }

    #[test]
    fn empty_matches_nothing_except_exists_false() {
        let empty = AttributeValue::Empty;
        for comparator in [
            Comparator::Equals,
            Comparator::NotEquals,
            Comparator::StartsWith,
            Comparator::GreaterThan,
        ] {
            assert!(!compare(&empty, comparator, &[literal("x")], false));
        }
        assert!(compare(&empty, Comparator::Exists, &[literal("false")], false));
        assert!(!compare(&empty, Comparator::Exists, &[literal("true")], false));
    }

    #[test]
    fn string_and_numeric_comparisons() {
        let v = literal("FooBar");
        assert!(compare(&v, Comparator::StartsWith, &[literal("Foo")], false));
        assert!(compare(&v, Comparator::EndsWith, &[literal("bar")], true));
        assert!(!compare(&v, Comparator::EndsWith, &[literal("bar")], false));
        assert!(compare(&v, Comparator::Equals, &[literal("x"), literal("FooBar")], false));
        assert!(compare(&literal("10"), Comparator::GreaterThan, &[literal("9")], false));
        assert!(!compare(&literal("abc"), Comparator::GreaterThan, &[literal("1")], false));
    }

    #[test]
    fn projection_not_equals_holds_against_scalars() {
        let projection = AttributeValue::Projection(vec![literal("a"), literal("b")]);
        let scalar = literal("a");
        assert!(compare(&projection, Comparator::ProjectionNotEquals, &[scalar.clone()], false));
        assert!(compare(&scalar, Comparator::ProjectionNotEquals, &[projection.clone()], false));
        assert!(!compare(&projection, Comparator::ProjectionEquals, &[scalar.clone()], false));
        assert!(!compare(&projection, Comparator::Subset, &[scalar], false));
    }

    #[test]
    fn projection_set_comparisons() {
        let ab = AttributeValue::Projection(vec![literal("a"), literal("b")]);
        let ba = AttributeValue::Projection(vec![literal("b"), literal("a"), literal("a")]);
        let abc = AttributeValue::Projection(vec![literal("a"), literal("b"), literal("c")]);
        assert!(compare(&ab, Comparator::ProjectionEquals, &[ba.clone()], false));
        assert!(!compare(&ab, Comparator::ProjectionNotEquals, &[ba.clone()], false));
        assert!(compare(&ab, Comparator::Subset, &[ba.clone()], false));
        assert!(!compare(&ab, Comparator::ProperSubset, &[ba], false));
        assert!(compare(&ab, Comparator::ProperSubset, &[abc], false));
    }

    #[test]
    fn resolves_shape_paths() {
        let shape = ShapeBuilder::structure(ShapeId::new("ex", "Thing"))
            .with_trait(ids::tags(), json!(["a", "b"]))
            .with_trait(ids::documentation(), json!("Docs"))
            .build();
        let value = AttributeValue::Shape(&shape);

        let path = |p: &[&str]| value.path(&p.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(path(&["id", "name"]).render(), "Thing");
        assert_eq!(path(&["trait", "documentation"]).render(), "Docs");
        assert_eq!(path(&["trait", "smithy.api#documentation", "(length)"]).render(), "4");
        assert_eq!(path(&["trait", "tags", "(length)"]).render(), "2");
        assert_eq!(path(&["trait", "(length)"]).render(), "2");
        assert!(!path(&["trait", "required"]).is_present());
        assert!(!path(&["service", "version"]).is_present());

        let values = path(&["trait", "tags", "(values)"]);
        assert!(compare(&values, Comparator::Equals, &[literal("b")], false));
        let keys = path(&["trait", "(keys)", "name"]);
        assert!(compare(&keys, Comparator::Equals, &[literal("tags")], false));
    }
}
