//! The shape graph store.
//!
//! Fragments are merged into a [`ShapeGraph`] while loading. Once every
//! fragment has been merged and every later stage has run, the graph is
//! frozen into an immutable [`Model`].

mod model;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

pub use self::model::Model;

use crate::error::ModelError;
use crate::shape::Shape;
use crate::shape_id::ShapeId;
use crate::traits::{ids, merge_values, TraitMap, TraitMerge};

/// Mutable shape storage used while a model is being assembled.
#[derive(Debug, Clone, Default)]
pub struct ShapeGraph {
    shapes: BTreeMap<ShapeId, Shape>,
    metadata: BTreeMap<String, Value>,
}

impl ShapeGraph {
    /// Create an empty graph with no prelude.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph seeded with the prelude shapes.
    pub fn with_prelude() -> Self {
        crate::prelude::prelude().clone()
    }

    /// Number of top-level shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Add a shape, merging it with any existing definition of the same id.
    ///
    /// Re-adding an identical shape is a no-op. A different kind, target,
    /// member list, mixin list or binding is a conflict, as is a trait value
    /// that cannot be merged. On conflict the stored shape is unchanged.
    pub fn add_shape(&mut self, shape: Shape) -> Result<(), ModelError> {
        if shape.id().is_member() {
            let container = shape.id().without_member();
            return self.add_member(&container, shape);
        }

        let id = shape.id().clone();
        match self.shapes.get_mut(&id) {
            None => {
                self.shapes.insert(id, shape);
                Ok(())
            }
            Some(existing) => merge_shape(existing, shape),
        }
    }

    /// Add a member to an existing container.
    pub fn add_member(&mut self, container: &ShapeId, member: Shape) -> Result<(), ModelError> {
        let Some(name) = member.member_name().map(str::to_string) else {
            return Err(ModelError::ShapeConflict {
                id: member.id().clone(),
                reason: "only member shapes can be added as members".into(),
            });
        };
        let Some(parent) = self.shapes.get_mut(container) else {
            return Err(ModelError::UnresolvedShape {
                id: container.clone(),
                referenced_by: member.id().clone(),
                relationship: "is a member of".into(),
            });
        };

        let member = if member.id().without_member() == *container {
            member
        } else {
            member.rehomed(&container.with_member(name.clone()))
        };

        match parent.get_member_mut(&name) {
            None => {
                parent.members_mut().push(member);
                Ok(())
            }
            Some(existing) => merge_shape(existing, member),
        }
    }

    /// Apply a trait to a shape or member that is already in the graph.
    ///
    /// `override_existing` marks an explicit override; without it a
    /// conflicting value raises an error.
    pub fn apply_trait(
        &mut self,
        target: &ShapeId,
        trait_id: ShapeId,
        value: Value,
        override_existing: bool,
    ) -> Result<(), ModelError> {
        let Some(shape) = self.get_shape_mut(target) else {
            return Err(ModelError::UnresolvedShape {
                id: target.clone(),
                referenced_by: target.clone(),
                relationship: format!("applies `{trait_id}` to"),
            });
        };
        let mut incoming = TraitMap::new();
        incoming.insert(trait_id, value);
        merge_traits(shape.id().clone(), shape.traits_mut(), incoming, override_existing)
    }

    /// Set a metadata entry, merging it with any existing value.
    ///
    /// Equal values are a no-op and two lists are concatenated.
    pub fn put_metadata(&mut self, key: impl Into<String>, value: Value) -> Result<(), ModelError> {
        let key = key.into();
        let merged = match self.metadata.get(&key) {
            None => value,
            Some(existing) if *existing == value => return Ok(()),
            Some(Value::Array(a)) => match value {
                Value::Array(b) => Value::Array(a.iter().cloned().chain(b).collect()),
                _ => return Err(ModelError::MetadataConflict { key }),
            },
            Some(_) => return Err(ModelError::MetadataConflict { key }),
        };
        self.metadata.insert(key, merged);
        Ok(())
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Merge another graph into this one, collecting every conflict.
    pub fn merge(&mut self, other: ShapeGraph) -> Vec<ModelError> {
        let mut errors = Vec::new();
        for (key, value) in other.metadata {
            if let Err(err) = self.put_metadata(key, value) {
                errors.push(err);
            }
        }
        for (_, shape) in other.shapes {
            if let Err(err) = self.add_shape(shape) {
                errors.push(err);
            }
        }
        errors
    }

    /// Look up a shape or member by id.
    pub fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        match id.member() {
            None => self.shapes.get(id),
            Some(name) => self.shapes.get(&id.without_member())?.get_member(name),
        }
    }

    pub fn get_shape_mut(&mut self, id: &ShapeId) -> Option<&mut Shape> {
        match id.member() {
            None => self.shapes.get_mut(id),
            Some(name) => self
                .shapes
                .get_mut(&id.without_member())?
                .get_member_mut(name),
        }
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.get_shape(id).is_some()
    }

    /// Every top-level shape, in id order.
    pub fn all_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Replace a top-level shape wholesale.
    pub fn replace_shape(&mut self, shape: Shape) {
        self.shapes.insert(shape.id().clone(), shape);
    }

    pub fn remove_shape(&mut self, id: &ShapeId) -> Option<Shape> {
        self.shapes.remove(id)
    }

    /// Check that every reference in the graph points at an existing shape.
    ///
    /// Member targets, mixins, bindings, and applied trait ids are checked.
    /// Applied traits must also resolve to trait definitions.
    pub fn unresolved_references(&self) -> Vec<ModelError> {
        let mut errors = Vec::new();
        for shape in self.shapes.values() {
            self.check_references(shape, &mut errors);
            for member in shape.members() {
                self.check_references(member, &mut errors);
            }
        }
        errors
    }

    fn check_references(&self, shape: &Shape, errors: &mut Vec<ModelError>) {
        let mut missing = |id: &ShapeId, relationship: &str| {
            errors.push(ModelError::UnresolvedShape {
                id: id.clone(),
                referenced_by: shape.id().clone(),
                relationship: relationship.to_string(),
            });
        };

        if let Some(target) = shape.target() {
            if !self.contains(target) {
                missing(target, "targets");
            }
        }
        for mixin in shape.mixins() {
            if !self.contains(mixin) {
                missing(mixin, "mixes in");
            }
        }
        for (label, id) in shape.bindings().references() {
            if !self.contains(id) {
                missing(id, &format!("binds {label}"));
            }
        }
        for trait_id in shape.traits().keys() {
            match self.get_shape(trait_id) {
                Some(def) if def.is_trait_definition() => {}
                _ => missing(trait_id, "applies trait"),
            }
        }
    }

    /// Freeze the graph into an immutable model.
    pub fn freeze(self) -> Model {
        debug!(shapes = self.shapes.len(), "freezing shape graph");
        Model::from_parts(self.shapes, self.metadata)
    }

    pub(crate) fn insert(&mut self, shape: Shape) {
        self.shapes.insert(shape.id().clone(), shape);
    }
}

/// Merge `incoming` into `existing`, leaving `existing` untouched on conflict.
fn merge_shape(existing: &mut Shape, incoming: Shape) -> Result<(), ModelError> {
    let mut merged = existing.clone();
    merge_into(&mut merged, incoming)?;
    *existing = merged;
    Ok(())
}

fn merge_into(existing: &mut Shape, incoming: Shape) -> Result<(), ModelError> {
    let id = existing.id().clone();
    let conflict = |reason: String| ModelError::ShapeConflict {
        id: id.clone(),
        reason,
    };

    if existing.kind() != incoming.kind() {
        return Err(conflict(format!(
            "shape type `{}` conflicts with `{}`",
            existing.kind(),
            incoming.kind()
        )));
    }
    if existing.target() != incoming.target() {
        return Err(conflict("member targets differ".into()));
    }
    // Member lists must agree name for name, so merge order cannot leak
    // into member order.
    let names = |shape: &Shape| -> Vec<String> {
        shape
            .members()
            .iter()
            .filter_map(|m| m.member_name().map(str::to_string))
            .collect()
    };
    let (ours, theirs) = (names(existing), names(&incoming));
    if ours != theirs {
        return Err(conflict(format!(
            "members [{}] differ from [{}]",
            ours.join(", "),
            theirs.join(", ")
        )));
    }
    if existing.mixins() != incoming.mixins() {
        if existing.mixins().is_empty() {
            *existing.mixins_mut() = incoming.mixins().to_vec();
        } else if !incoming.mixins().is_empty() {
            return Err(conflict("mixin lists differ".into()));
        }
    }
    if existing.bindings() != incoming.bindings() {
        let empty = Shape::new(id.clone(), existing.kind());
        if existing.bindings() == empty.bindings() {
            *existing.bindings_mut() = incoming.bindings().clone();
        } else if incoming.bindings() != empty.bindings() {
            return Err(conflict("service, operation, or resource bindings differ".into()));
        }
    }

    let incoming_traits = incoming.traits().clone();
    merge_traits(id.clone(), existing.traits_mut(), incoming_traits, false)?;

    for member in incoming.members() {
        if let Some(current) = member.member_name().and_then(|n| existing.get_member_mut(n)) {
            merge_into(current, member.clone())?;
        }
    }
    Ok(())
}

fn merge_traits(
    id: ShapeId,
    existing: &mut TraitMap,
    incoming: TraitMap,
    override_existing: bool,
) -> Result<(), ModelError> {
    for (trait_id, value) in incoming {
        let merged = match existing.get(&trait_id) {
            None => value,
            Some(current) => match merge_values(current, &value, override_existing) {
                TraitMerge::Merged(merged) => merged,
                TraitMerge::Conflict if trait_id == ids::default() => {
                    return Err(ModelError::DefaultValueMismatch {
                        id,
                        expected: current.to_string(),
                        found: value.to_string(),
                    });
                }
                TraitMerge::Conflict => {
                    return Err(ModelError::ShapeConflict {
                        id,
                        reason: format!(
                            "trait `{trait_id}` applied with conflicting values {current} and {value}"
                        ),
                    });
                }
            },
        };
        existing.insert(trait_id, merged);
    }
    Ok(())
}
