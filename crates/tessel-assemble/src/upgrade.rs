//! Upgrade of 1.0 shapes to 2.0 nullability semantics.
//!
//! In 1.0 a member targeting an unboxed boolean or number could not be null.
//! 2.0 expresses that with an explicit `@default`, and expresses a boxed
//! target with `@box` on the member. The transform runs on the merged graph
//! before mixins are flattened, so mixin members carry their upgraded traits
//! into every shape that uses them.

use std::collections::BTreeSet;

use serde_json::{json, Value};
use tessel_core::traits::ids;
use tessel_core::{Shape, ShapeGraph, ShapeId, ShapeKind, ValidationEvent};
use tracing::debug;

const EVENT_ID: &str = "ModelDeprecation";

/// What the transform decided for one member.
enum Change {
    AddBox,
    AddDefault(Value),
    Warn(String),
}

/// Upgrade the members of every structure in `v1`, and reject `@box` on
/// structure members declared by 2.0 fragments.
pub fn upgrade(graph: &mut ShapeGraph, v1: &BTreeSet<ShapeId>) -> Vec<ValidationEvent> {
    let mut events = Vec::new();
    let mut changes = Vec::new();

    for shape in graph
        .all_shapes()
        .filter(|s| s.kind() == ShapeKind::Structure)
    {
        for member in shape.members() {
            if v1.contains(shape.id()) {
                if let Some(change) = plan(graph, member) {
                    changes.push((member.id().clone(), change));
                }
            } else if member.has_trait(&ids::box_trait()) {
                events.push(ValidationEvent::error(
                    EVENT_ID,
                    Some(member.id().clone()),
                    "@box is not supported on 2.0 members; use @default or remove it",
                ));
            }
        }
    }

    let mut upgraded = 0;
    for (member, change) in changes {
        let applied = match change {
            Change::AddBox => graph.apply_trait(&member, ids::box_trait(), json!({}), false),
            Change::AddDefault(value) => {
                let message = format!(
                    "member was non-nullable in 1.0; add an explicit @default({value})"
                );
                events.push(ValidationEvent::warning(EVENT_ID, Some(member.clone()), message));
                graph.apply_trait(&member, ids::default(), value, false)
            }
            Change::Warn(message) => {
                events.push(ValidationEvent::warning(EVENT_ID, Some(member.clone()), message));
                Ok(())
            }
        };
        match applied {
            Ok(()) => upgraded += 1,
            Err(err) => events.push(err.to_event()),
        }
    }
    debug!(upgraded, events = events.len(), "upgraded 1.0 shapes");
    events
}

fn plan(graph: &ShapeGraph, member: &Shape) -> Option<Change> {
    let target = graph.get_shape(member.target()?)?;
    let primitive = target.kind() == ShapeKind::Boolean
        || (target.kind().is_number() && target.kind() != ShapeKind::IntEnum);
    if !primitive || member.has_trait(&ids::box_trait()) {
        return None;
    }
    if target.has_trait(&ids::box_trait()) {
        return Some(Change::AddBox);
    }
    if member.has_trait(&ids::required())
        || member.has_trait(&ids::default())
        || target.has_trait(&ids::default())
    {
        return None;
    }

    if target.kind() == ShapeKind::Boolean {
        return Some(Change::AddDefault(json!(false)));
    }
    if admits_zero(member) && admits_zero(target) {
        Some(Change::AddDefault(json!(0)))
    } else {
        Some(Change::Warn(
            "member was non-nullable in 1.0 but its range excludes 0; add @required or an explicit @default"
                .to_string(),
        ))
    }
}

fn admits_zero(shape: &Shape) -> bool {
    let Some(range) = shape.get_trait(&ids::range()) else {
        return true;
    };
    let bound = |key: &str| range.get(key).and_then(Value::as_f64);
    bound("min").map_or(true, |min| min <= 0.0) && bound("max").map_or(true, |max| max >= 0.0)
}

#[cfg(test)]
mod tests {
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::Severity;

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    fn graph(shapes: Vec<Shape>) -> ShapeGraph {
        let mut graph = ShapeGraph::with_prelude();
        for shape in shapes {
            graph.add_shape(shape).unwrap();
        }
        graph
    }

    fn member<'g>(graph: &'g ShapeGraph, name: &str) -> &'g Shape {
        graph.get_shape(&id("S").with_member(name)).unwrap()
    }

    #[test]
    fn unboxed_members_get_zero_defaults() {
        let mut g = graph(vec![
            ShapeBuilder::new(id("Count"), ShapeKind::Integer).build(),
            ShapeBuilder::new(id("Flag"), ShapeKind::Boolean).build(),
            ShapeBuilder::structure(id("S"))
                .member("count", id("Count"))
                .member("flag", id("Flag"))
                .member("boxed", ShapeId::prelude("Integer"))
                .member("name", ShapeId::prelude("String"))
                .build(),
        ]);
        let events = upgrade(&mut g, &BTreeSet::from([id("S")]));

        assert_eq!(member(&g, "count").get_trait(&ids::default()), Some(&json!(0)));
        assert_eq!(member(&g, "flag").get_trait(&ids::default()), Some(&json!(false)));
        assert!(member(&g, "boxed").has_trait(&ids::box_trait()));
        assert!(!member(&g, "boxed").has_trait(&ids::default()));
        assert!(member(&g, "name").traits().is_empty());

        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| e.id == EVENT_ID && e.severity == Severity::Warning));
    }

    #[test]
    fn range_excluding_zero_only_warns() {
        let mut g = graph(vec![
            ShapeBuilder::new(id("Positive"), ShapeKind::Integer)
                .with_trait(ids::range(), json!({ "min": 1 }))
                .build(),
            ShapeBuilder::structure(id("S")).member("n", id("Positive")).build(),
        ]);
        let events = upgrade(&mut g, &BTreeSet::from([id("S")]));
        assert!(!member(&g, "n").has_trait(&ids::default()));
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("range excludes 0"));
    }

    #[test]
    fn required_members_are_left_alone() {
        let mut g = graph(vec![
            ShapeBuilder::new(id("Count"), ShapeKind::Integer).build(),
            ShapeBuilder::structure(id("S"))
                .member_with("n", id("Count"), [(ids::required(), json!({}))])
                .build(),
        ]);
        assert!(upgrade(&mut g, &BTreeSet::from([id("S")])).is_empty());
        assert!(!member(&g, "n").has_trait(&ids::default()));
    }

    #[test]
    fn box_on_a_2_0_member_is_an_error() {
        let mut g = graph(vec![ShapeBuilder::structure(id("S"))
            .member_with("n", ShapeId::prelude("Integer"), [(ids::box_trait(), json!({}))])
            .build()]);
        let events = upgrade(&mut g, &BTreeSet::new());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].shape_id, Some(id("S").with_member("n")));
    }
}
