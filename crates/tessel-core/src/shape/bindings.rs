//! Kind-specific references held by services, operations, and resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shape_id::ShapeId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ShapeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ShapeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBindings {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub identifiers: BTreeMap<String, ShapeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_operations: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ShapeId>,
}

impl ResourceBindings {
    /// Lifecycle operations in a fixed order, labelled by relationship name.
    pub fn lifecycle(&self) -> impl Iterator<Item = (&'static str, &ShapeId)> {
        [
            ("put", &self.put),
            ("create", &self.create),
            ("read", &self.read),
            ("update", &self.update),
            ("delete", &self.delete),
            ("list", &self.list),
        ]
        .into_iter()
        .filter_map(|(label, id)| id.as_ref().map(|id| (label, id)))
    }
}

/// References that only some shape kinds carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bindings", rename_all = "camelCase")]
pub enum Bindings {
    #[default]
    None,
    Operation(OperationBindings),
    Service(ServiceBindings),
    Resource(ResourceBindings),
}

impl Bindings {
    pub fn is_none(&self) -> bool {
        matches!(self, Bindings::None)
    }

    pub fn as_operation(&self) -> Option<&OperationBindings> {
        match self {
            Bindings::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceBindings> {
        match self {
            Bindings::Service(svc) => Some(svc),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceBindings> {
        match self {
            Bindings::Resource(res) => Some(res),
            _ => None,
        }
    }

    /// Every shape id referenced by these bindings, with its relationship name.
    pub fn references(&self) -> Vec<(&'static str, &ShapeId)> {
        let mut refs = Vec::new();
        match self {
            Bindings::None => {}
            Bindings::Operation(op) => {
                refs.extend(op.input.iter().map(|id| ("input", id)));
                refs.extend(op.output.iter().map(|id| ("output", id)));
                refs.extend(op.errors.iter().map(|id| ("error", id)));
            }
            Bindings::Service(svc) => {
                refs.extend(svc.operations.iter().map(|id| ("operation", id)));
                refs.extend(svc.resources.iter().map(|id| ("resource", id)));
                refs.extend(svc.errors.iter().map(|id| ("error", id)));
            }
            Bindings::Resource(res) => {
                refs.extend(res.identifiers.values().map(|id| ("identifier", id)));
                refs.extend(res.properties.values().map(|id| ("property", id)));
                refs.extend(res.lifecycle());
                refs.extend(res.operations.iter().map(|id| ("operation", id)));
                refs.extend(
                    res.collection_operations
                        .iter()
                        .map(|id| ("collectionOperation", id)),
                );
                refs.extend(res.resources.iter().map(|id| ("resource", id)));
            }
        }
        refs
    }

    /// Fill in anything this shape leaves unset from a mixin's bindings.
    ///
    /// Local values win; lists are unioned with mixin entries first.
    pub fn inherit_from(&mut self, mixin: &Bindings) {
        match (self, mixin) {
            (this @ Bindings::None, other) => *this = other.clone(),
            (Bindings::Operation(this), Bindings::Operation(other)) => {
                if this.input.is_none() {
                    this.input = other.input.clone();
                }
                if this.output.is_none() {
                    this.output = other.output.clone();
                }
                this.errors = union(&other.errors, &this.errors);
            }
            (Bindings::Service(this), Bindings::Service(other)) => {
                if this.version.is_none() {
                    this.version = other.version.clone();
                }
                this.operations = union(&other.operations, &this.operations);
                this.resources = union(&other.resources, &this.resources);
                this.errors = union(&other.errors, &this.errors);
            }
            (Bindings::Resource(this), Bindings::Resource(other)) => {
                for (name, id) in &other.identifiers {
                    this.identifiers.entry(name.clone()).or_insert_with(|| id.clone());
                }
                for (name, id) in &other.properties {
                    this.properties.entry(name.clone()).or_insert_with(|| id.clone());
                }
                for (slot, inherited) in [
                    (&mut this.create, &other.create),
                    (&mut this.put, &other.put),
                    (&mut this.read, &other.read),
                    (&mut this.update, &other.update),
                    (&mut this.delete, &other.delete),
                    (&mut this.list, &other.list),
                ] {
                    if slot.is_none() {
                        *slot = inherited.clone();
                    }
                }
                this.operations = union(&other.operations, &this.operations);
                this.collection_operations =
                    union(&other.collection_operations, &this.collection_operations);
                this.resources = union(&other.resources, &this.resources);
            }
            _ => {}
        }
    }
}

fn union(first: &[ShapeId], second: &[ShapeId]) -> Vec<ShapeId> {
    let mut out = first.to_vec();
    for id in second {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
