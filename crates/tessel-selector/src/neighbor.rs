//! Relationships between shapes and the neighbor index used for traversal.

use std::collections::{HashMap, HashSet};

use tessel_core::{Bindings, Model, Shape, ShapeId};

/// Whether a relationship points from a shape to something it references, or
/// back from a shape to something that references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Directed,
    Inverted,
}

/// Every relationship kind, with its selector label and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    Resource,
    Operation,
    CollectionOperation,
    InstanceOperation,
    Bound,
    Put,
    Create,
    Read,
    Update,
    Delete,
    List,
    Identifier,
    Property,
    MemberContainer,
    MemberTarget,
    Input,
    Output,
    Error,
    Member,
    Trait,
    Mixin,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 21] = [
        RelationshipKind::Resource,
        RelationshipKind::Operation,
        RelationshipKind::CollectionOperation,
        RelationshipKind::InstanceOperation,
        RelationshipKind::Bound,
        RelationshipKind::Put,
        RelationshipKind::Create,
        RelationshipKind::Read,
        RelationshipKind::Update,
        RelationshipKind::Delete,
        RelationshipKind::List,
        RelationshipKind::Identifier,
        RelationshipKind::Property,
        RelationshipKind::MemberContainer,
        RelationshipKind::MemberTarget,
        RelationshipKind::Input,
        RelationshipKind::Output,
        RelationshipKind::Error,
        RelationshipKind::Member,
        RelationshipKind::Trait,
        RelationshipKind::Mixin,
    ];

    /// Label used in `-[label]->`; member containment and targeting have none.
    pub fn label(self) -> Option<&'static str> {
        match self {
            RelationshipKind::Resource => Some("resource"),
            RelationshipKind::Operation => Some("operation"),
            RelationshipKind::CollectionOperation => Some("collectionOperation"),
            RelationshipKind::InstanceOperation => Some("instanceOperation"),
            RelationshipKind::Bound => Some("bound"),
            RelationshipKind::Put => Some("put"),
            RelationshipKind::Create => Some("create"),
            RelationshipKind::Read => Some("read"),
            RelationshipKind::Update => Some("update"),
            RelationshipKind::Delete => Some("delete"),
            RelationshipKind::List => Some("list"),
            RelationshipKind::Identifier => Some("identifier"),
            RelationshipKind::Property => Some("property"),
            RelationshipKind::MemberContainer | RelationshipKind::MemberTarget => None,
            RelationshipKind::Input => Some("input"),
            RelationshipKind::Output => Some("output"),
            RelationshipKind::Error => Some("error"),
            RelationshipKind::Member => Some("member"),
            RelationshipKind::Trait => Some("trait"),
            RelationshipKind::Mixin => Some("mixin"),
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            RelationshipKind::Bound | RelationshipKind::MemberContainer => Direction::Inverted,
            _ => Direction::Directed,
        }
    }

    /// Whether `name` is a label some relationship answers to.
    pub fn is_known_label(name: &str) -> bool {
        Self::ALL.iter().any(|kind| kind.label() == Some(name))
    }

    fn from_binding_label(label: &str) -> Option<RelationshipKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == Some(label))
    }
}

/// An edge from `source` to `neighbor`.
#[derive(Debug, Clone, Copy)]
pub struct Relationship<'m> {
    pub source: &'m Shape,
    pub neighbor: &'m Shape,
    pub kind: RelationshipKind,
}

/// Forward and reverse adjacency for every shape in a model.
#[derive(Debug, Default)]
pub struct NeighborIndex<'m> {
    forward: HashMap<&'m ShapeId, Vec<Relationship<'m>>>,
    reverse: HashMap<&'m ShapeId, Vec<Relationship<'m>>>,
}

impl<'m> NeighborIndex<'m> {
    pub fn new(model: &'m Model) -> Self {
        let mut index = NeighborIndex::default();
        let mut bound = HashSet::new();
        for shape in model.shapes_with_members() {
            for (kind, id) in outgoing(shape) {
                let Some(neighbor) = model.get_shape(&id) else {
                    continue;
                };
                index.add(Relationship {
                    source: shape,
                    neighbor,
                    kind,
                });
                // Operations and resources are bound to whatever lists them.
                if binds_child(kind) && bound.insert((neighbor.id(), shape.id())) {
                    index.add(Relationship {
                        source: neighbor,
                        neighbor: shape,
                        kind: RelationshipKind::Bound,
                    });
                }
            }
        }
        index
    }

    fn add(&mut self, rel: Relationship<'m>) {
        self.forward.entry(rel.source.id()).or_default().push(rel);
        self.reverse.entry(rel.neighbor.id()).or_default().push(rel);
    }

    /// Relationships that start at `id`.
    pub fn neighbors(&self, id: &ShapeId) -> &[Relationship<'m>] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Relationships that end at `id`.
    pub fn reverse_neighbors(&self, id: &ShapeId) -> &[Relationship<'m>] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

fn binds_child(kind: RelationshipKind) -> bool {
    matches!(
        kind,
        RelationshipKind::Resource
            | RelationshipKind::Operation
            | RelationshipKind::CollectionOperation
            | RelationshipKind::InstanceOperation
            | RelationshipKind::Put
            | RelationshipKind::Create
            | RelationshipKind::Read
            | RelationshipKind::Update
            | RelationshipKind::Delete
            | RelationshipKind::List
    )
}

fn outgoing(shape: &Shape) -> Vec<(RelationshipKind, ShapeId)> {
    let mut out = Vec::new();

    if shape.is_member() {
        out.push((RelationshipKind::MemberContainer, shape.id().without_member()));
        if let Some(target) = shape.target() {
            out.push((RelationshipKind::MemberTarget, target.clone()));
        }
    }
    for member in shape.members() {
        out.push((RelationshipKind::Member, member.id().clone()));
    }

    match shape.bindings() {
        Bindings::None => {}
        Bindings::Operation(_) | Bindings::Service(_) => {
            for (label, id) in shape.bindings().references() {
                if let Some(kind) = RelationshipKind::from_binding_label(label) {
                    out.push((kind, id.clone()));
                }
            }
        }
        Bindings::Resource(res) => {
            for (label, id) in shape.bindings().references() {
                if let Some(kind) = RelationshipKind::from_binding_label(label) {
                    out.push((kind, id.clone()));
                }
            }
            // Lifecycle and instance operations are also plain operations.
            let lifecycle: Vec<(&str, &ShapeId)> = res.lifecycle().collect();
            for (label, id) in &lifecycle {
                out.push((RelationshipKind::Operation, (*id).clone()));
                if matches!(*label, "create" | "list") {
                    out.push((RelationshipKind::CollectionOperation, (*id).clone()));
                } else {
                    out.push((RelationshipKind::InstanceOperation, (*id).clone()));
                }
            }
            for id in &res.operations {
                out.push((RelationshipKind::InstanceOperation, id.clone()));
            }
            for id in &res.collection_operations {
                out.push((RelationshipKind::Operation, id.clone()));
            }
        }
    }

    for mixin in shape.mixins() {
        out.push((RelationshipKind::Mixin, mixin.clone()));
    }
    for trait_id in shape.traits().keys() {
        out.push((RelationshipKind::Trait, trait_id.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::shape::ServiceBindings;
    use tessel_core::traits::ids;
    use tessel_core::{ShapeGraph, ShapeKind};

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    fn model() -> Model {
        let mut graph = ShapeGraph::with_prelude();
        graph
            .add_shape(
                ShapeBuilder::new(id("Weather"), ShapeKind::Service)
                    .bindings(Bindings::Service(ServiceBindings {
                        version: Some("2024-01-01".into()),
                        operations: vec![id("GetForecast")],
                        ..Default::default()
                    }))
                    .build(),
            )
            .unwrap();
        graph
            .add_shape(
                ShapeBuilder::operation(id("GetForecast"))
                    .input(id("GetForecastInput"))
                    .build(),
            )
            .unwrap();
        graph
            .add_shape(
                ShapeBuilder::structure(id("GetForecastInput"))
                    .member("city", ShapeId::prelude("String"))
                    .with_trait(ids::input(), json!({}))
                    .build(),
            )
            .unwrap();
        graph.freeze()
    }

    #[test]
    fn labels_and_directions() {
        assert_eq!(RelationshipKind::Bound.direction(), Direction::Inverted);
        assert_eq!(RelationshipKind::MemberContainer.label(), None);
        assert_eq!(RelationshipKind::MemberTarget.direction(), Direction::Directed);
        assert!(RelationshipKind::is_known_label("collectionOperation"));
        assert!(!RelationshipKind::is_known_label("target"));
    }

    #[test]
    fn indexes_bindings_members_and_traits() {
        let model = model();
        let index = NeighborIndex::new(&model);

        let op = index.neighbors(&id("GetForecast"));
        assert!(op
            .iter()
            .any(|r| r.kind == RelationshipKind::Input && r.neighbor.id() == &id("GetForecastInput")));
        assert!(op
            .iter()
            .any(|r| r.kind == RelationshipKind::Bound && r.neighbor.id() == &id("Weather")));

        let input = index.neighbors(&id("GetForecastInput"));
        assert!(input.iter().any(|r| r.kind == RelationshipKind::Member));
        assert!(input.iter().any(|r| r.kind == RelationshipKind::Trait));

        let member = index.neighbors(&id("GetForecastInput").with_member("city"));
        let kinds: Vec<_> = member.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RelationshipKind::MemberContainer, RelationshipKind::MemberTarget]
        );

        let string_refs = index.reverse_neighbors(&ShapeId::prelude("String"));
        assert!(string_refs
            .iter()
            .any(|r| r.source.id() == &id("GetForecastInput").with_member("city")));
    }
}
