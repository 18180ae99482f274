//! Shapes and their members.
//!
//! Members are shapes of kind [`ShapeKind::Member`] owned by their container.
//! A member's id is always `container$name` and it carries the id of the shape
//! it targets.

pub mod bindings;
pub mod kind;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::bindings::{Bindings, OperationBindings, ResourceBindings, ServiceBindings};
pub use self::kind::ShapeKind;

use crate::shape_id::ShapeId;
use crate::traits::{ids, TraitMap};

/// A node in the model graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    id: ShapeId,
    #[serde(rename = "type")]
    kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    members: Vec<Shape>,
    #[serde(default, skip_serializing_if = "TraitMap::is_empty")]
    traits: TraitMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mixins: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Bindings::is_none")]
    bindings: Bindings,
}

impl Shape {
    /// Create an empty shape of the given kind.
    pub fn new(id: ShapeId, kind: ShapeKind) -> Self {
        let bindings = match kind {
            ShapeKind::Operation => Bindings::Operation(OperationBindings::default()),
            ShapeKind::Service => Bindings::Service(ServiceBindings::default()),
            ShapeKind::Resource => Bindings::Resource(ResourceBindings::default()),
            _ => Bindings::None,
        };
        Self {
            id,
            kind,
            target: None,
            members: Vec::new(),
            traits: TraitMap::new(),
            mixins: Vec::new(),
            bindings,
        }
    }

    /// Create a member of `container` named `name` targeting `target`.
    pub fn member(container: &ShapeId, name: &str, target: ShapeId) -> Self {
        let mut shape = Self::new(container.with_member(name), ShapeKind::Member);
        shape.target = Some(target);
        shape
    }

    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Member name, for member shapes.
    pub fn member_name(&self) -> Option<&str> {
        self.id.member()
    }

    /// Target of a member shape.
    pub fn target(&self) -> Option<&ShapeId> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: ShapeId) {
        self.target = Some(target);
    }

    pub fn members(&self) -> &[Shape] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut Vec<Shape> {
        &mut self.members
    }

    pub fn get_member(&self, name: &str) -> Option<&Shape> {
        self.members.iter().find(|m| m.member_name() == Some(name))
    }

    pub fn get_member_mut(&mut self, name: &str) -> Option<&mut Shape> {
        self.members.iter_mut().find(|m| m.member_name() == Some(name))
    }

    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    pub fn traits_mut(&mut self) -> &mut TraitMap {
        &mut self.traits
    }

    pub fn has_trait(&self, trait_id: &ShapeId) -> bool {
        self.traits.contains_key(trait_id)
    }

    pub fn get_trait(&self, trait_id: &ShapeId) -> Option<&Value> {
        self.traits.get(trait_id)
    }

    /// Mixins in declaration order.
    pub fn mixins(&self) -> &[ShapeId] {
        &self.mixins
    }

    pub fn mixins_mut(&mut self) -> &mut Vec<ShapeId> {
        &mut self.mixins
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    pub fn is_member(&self) -> bool {
        self.kind == ShapeKind::Member
    }

    /// Whether this shape is marked `@mixin`.
    pub fn is_mixin(&self) -> bool {
        self.has_trait(&ids::mixin())
    }

    /// Whether this shape defines a trait.
    pub fn is_trait_definition(&self) -> bool {
        self.has_trait(&ids::trait_def())
    }

    /// Copy this shape (and its members) under a new id.
    ///
    /// Member ids are re-homed so they stay `id$name`.
    pub fn rehomed(&self, id: &ShapeId) -> Shape {
        let mut copy = self.clone();
        copy.id = self.id.rehome(id);
        let container = copy.id.clone();
        for member in &mut copy.members {
            member.id = member.id.rehome(&container);
        }
        copy
    }
}
