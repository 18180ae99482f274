//! The frozen, read-only model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ShapeGraph;
use crate::hash::{content_hash, hash_hex};
use crate::shape::{Shape, ShapeKind};
use crate::shape_id::ShapeId;
use crate::traits::TraitDefinition;

/// An immutable, fully resolved model.
///
/// A `Model` is never mutated after it is built, so it can be shared across
/// threads behind an `Arc` without synchronization. Transforms go through
/// [`Model::to_graph`] and freeze a new model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    shapes: BTreeMap<ShapeId, Shape>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,
}

impl Model {
    pub(crate) fn from_parts(
        shapes: BTreeMap<ShapeId, Shape>,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self { shapes, metadata }
    }

    /// Look up a shape or member by id.
    pub fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        match id.member() {
            None => self.shapes.get(id),
            Some(name) => self.shapes.get(&id.without_member())?.get_member(name),
        }
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.get_shape(id).is_some()
    }

    /// Top-level shapes in id order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Every shape in id order, with each container followed by its members.
    pub fn shapes_with_members(&self) -> impl Iterator<Item = &Shape> {
        self.shapes
            .values()
            .flat_map(|shape| std::iter::once(shape).chain(shape.members()))
    }

    pub fn shapes_of_kind(&self, kind: ShapeKind) -> impl Iterator<Item = &Shape> {
        self.shapes_with_members().filter(move |s| s.kind() == kind)
    }

    pub fn shapes_with_trait<'a>(&'a self, trait_id: &'a ShapeId) -> impl Iterator<Item = &'a Shape> {
        self.shapes_with_members().filter(move |s| s.has_trait(trait_id))
    }

    /// Number of top-level shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// The container that owns a member.
    pub fn container_of(&self, member: &Shape) -> Option<&Shape> {
        if !member.is_member() {
            return None;
        }
        self.shapes.get(&member.id().without_member())
    }

    /// The shape a member targets.
    pub fn member_target(&self, member: &Shape) -> Option<&Shape> {
        member.target().and_then(|t| self.get_shape(t))
    }

    /// The parsed `@trait` definition for a trait id.
    pub fn trait_definition(&self, trait_id: &ShapeId) -> Option<TraitDefinition> {
        self.get_shape(trait_id).and_then(TraitDefinition::from_shape)
    }

    /// SHA-256 fingerprint of the model's canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        Ok(hash_hex(&content_hash(self)?))
    }

    /// Thaw the model back into a mutable graph for a transform pass.
    pub fn to_graph(&self) -> ShapeGraph {
        let mut graph = ShapeGraph::new();
        for shape in self.shapes.values() {
            graph.insert(shape.clone());
        }
        for (key, value) in &self.metadata {
            // Keys are unique, so this cannot conflict.
            let _ = graph.put_metadata(key.clone(), value.clone());
        }
        graph
    }
}
