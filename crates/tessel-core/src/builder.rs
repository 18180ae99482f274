//! Programmatic shape construction.
//!
//! ```rust
//! use serde_json::json;
//! use tessel_core::builder::ShapeBuilder;
//! use tessel_core::traits::ids;
//! use tessel_core::{ShapeGraph, ShapeId};
//!
//! let forecast = ShapeBuilder::structure(ShapeId::new("example.weather", "Forecast"))
//!     .member("chanceOfRain", ShapeId::prelude("Float"))
//!     .with_trait(ids::documentation(), json!("Rain forecast"))
//!     .build();
//!
//! let mut graph = ShapeGraph::with_prelude();
//! graph.add_shape(forecast).unwrap();
//! assert!(graph.unresolved_references().is_empty());
//! ```

use serde_json::Value;

use crate::shape::{Bindings, Shape, ShapeKind};
use crate::shape_id::ShapeId;
use crate::traits::ids;

/// Builder for a single shape and its members.
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    shape: Shape,
}

impl ShapeBuilder {
    pub fn new(id: ShapeId, kind: ShapeKind) -> Self {
        Self {
            shape: Shape::new(id, kind),
        }
    }

    pub fn structure(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Structure)
    }

    pub fn union(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Union)
    }

    pub fn operation(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Operation)
    }

    /// A list with its `member` member.
    pub fn list(id: ShapeId, member_target: ShapeId) -> Self {
        Self::new(id, ShapeKind::List).member("member", member_target)
    }

    /// A map with its `key` and `value` members.
    pub fn map(id: ShapeId, key: ShapeId, value: ShapeId) -> Self {
        Self::new(id, ShapeKind::Map)
            .member("key", key)
            .member("value", value)
    }

    /// Append a member.
    pub fn member(mut self, name: &str, target: ShapeId) -> Self {
        let member = Shape::member(self.shape.id(), name, target);
        self.shape.members_mut().push(member);
        self
    }

    /// Append a member carrying traits.
    pub fn member_with(
        mut self,
        name: &str,
        target: ShapeId,
        traits: impl IntoIterator<Item = (ShapeId, Value)>,
    ) -> Self {
        let mut member = Shape::member(self.shape.id(), name, target);
        member.traits_mut().extend(traits);
        self.shape.members_mut().push(member);
        self
    }

    /// Append an enum member with an explicit `@enumValue`.
    pub fn enum_member(mut self, name: &str, value: Value) -> Self {
        let mut member = Shape::member(self.shape.id(), name, ShapeId::prelude("Unit"));
        member.traits_mut().insert(ids::enum_value(), value);
        self.shape.members_mut().push(member);
        self
    }

    pub fn with_trait(mut self, trait_id: ShapeId, value: Value) -> Self {
        self.shape.traits_mut().insert(trait_id, value);
        self
    }

    /// Mark the shape as a mixin.
    pub fn as_mixin(self) -> Self {
        self.with_trait(ids::mixin(), Value::Object(Default::default()))
    }

    pub fn mixin(mut self, mixin: ShapeId) -> Self {
        self.shape.mixins_mut().push(mixin);
        self
    }

    pub fn input(mut self, input: ShapeId) -> Self {
        if let Bindings::Operation(op) = self.shape.bindings_mut() {
            op.input = Some(input);
        }
        self
    }

    pub fn output(mut self, output: ShapeId) -> Self {
        if let Bindings::Operation(op) = self.shape.bindings_mut() {
            op.output = Some(output);
        }
        self
    }

    pub fn error(mut self, error: ShapeId) -> Self {
        if let Bindings::Operation(op) = self.shape.bindings_mut() {
            op.errors.push(error);
        }
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        *self.shape.bindings_mut() = bindings;
        self
    }

    pub fn build(self) -> Shape {
        self.shape
    }
}
