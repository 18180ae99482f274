//! Mixin flattening.
//!
//! A shape that mixes in other shapes is rewritten so that it carries every
//! inherited member and trait directly. Mixins are processed depth-first in
//! declaration order: a mixin's own mixins are flattened before its members
//! are appended, and the shape's own members come last. Later mixins override
//! the traits of earlier ones, and traits declared on the shape override
//! everything it inherits.

use std::collections::HashMap;

use tessel_core::traits::{local_traits, TraitMap};
use tessel_core::{ModelError, Shape, ShapeGraph, ShapeId};
use tracing::debug;

/// Flattens shapes of one graph, memoizing results.
pub struct MixinResolver<'g> {
    graph: &'g ShapeGraph,
    flattened: HashMap<ShapeId, Shape>,
}

impl<'g> MixinResolver<'g> {
    pub fn new(graph: &'g ShapeGraph) -> Self {
        Self {
            graph,
            flattened: HashMap::new(),
        }
    }

    /// Flatten the shape `id`. A shape without mixins comes back unchanged.
    pub fn flatten(&mut self, id: &ShapeId) -> Result<Shape, ModelError> {
        let mut visiting = Vec::new();
        self.flatten_inner(id, None, &mut visiting)
    }

    fn flatten_inner(
        &mut self,
        id: &ShapeId,
        referenced_by: Option<&ShapeId>,
        visiting: &mut Vec<ShapeId>,
    ) -> Result<Shape, ModelError> {
        if let Some(start) = visiting.iter().position(|v| v == id) {
            let mut path = visiting[start..].to_vec();
            path.push(id.clone());
            return Err(ModelError::MixinCycle {
                id: visiting[start].clone(),
                path,
            });
        }
        if let Some(done) = self.flattened.get(id) {
            return Ok(done.clone());
        }

        let shape = self
            .graph
            .get_shape(id)
            .ok_or_else(|| ModelError::UnresolvedShape {
                id: id.clone(),
                referenced_by: referenced_by.cloned().unwrap_or_else(|| id.clone()),
                relationship: "mixes in".to_string(),
            })?;
        if shape.mixins().is_empty() {
            return Ok(shape.clone());
        }
        if !shape.kind().supports_mixins() {
            return Err(ModelError::InvalidMixinUsage {
                id: id.clone(),
                reason: format!("{} shapes cannot use mixins", shape.kind()),
            });
        }

        visiting.push(id.clone());
        let result = self.compose(shape, visiting);
        visiting.pop();

        let flat = result?;
        debug!(shape = %id, members = flat.members().len(), "flattened mixins");
        self.flattened.insert(id.clone(), flat.clone());
        Ok(flat)
    }

    fn compose(&mut self, shape: &Shape, visiting: &mut Vec<ShapeId>) -> Result<Shape, ModelError> {
        let id = shape.id();
        let mut members: Vec<Shape> = Vec::new();
        let mut traits = TraitMap::new();
        let mut bindings = shape.bindings().clone();

        for mixin_id in shape.mixins() {
            let declared = self
                .graph
                .get_shape(mixin_id)
                .ok_or_else(|| ModelError::UnresolvedShape {
                    id: mixin_id.clone(),
                    referenced_by: id.clone(),
                    relationship: "mixes in".to_string(),
                })?;
            if !declared.is_mixin() {
                return Err(ModelError::InvalidMixinUsage {
                    id: id.clone(),
                    reason: format!("`{mixin_id}` is not marked with @mixin"),
                });
            }
            if declared.kind() != shape.kind() {
                return Err(ModelError::InvalidMixinUsage {
                    id: id.clone(),
                    reason: format!(
                        "a {} cannot mix in `{mixin_id}`, which is a {}",
                        shape.kind(),
                        declared.kind()
                    ),
                });
            }

            let mixin = self.flatten_inner(mixin_id, Some(id), visiting)?;
            for member in mixin.members() {
                add_member(id, &mut members, member.rehomed(id))?;
            }

            let local = local_traits(declared);
            for (trait_id, value) in mixin.traits() {
                if !local.contains(trait_id) {
                    traits.insert(trait_id.clone(), value.clone());
                }
            }
            bindings.inherit_from(mixin.bindings());
        }

        for member in shape.members() {
            add_member(id, &mut members, member.clone())?;
        }
        for (trait_id, value) in shape.traits() {
            traits.insert(trait_id.clone(), value.clone());
        }

        let mut flat = shape.clone();
        *flat.members_mut() = members;
        *flat.traits_mut() = traits;
        *flat.bindings_mut() = bindings;
        Ok(flat)
    }
}

/// Append `member`, or merge it into an earlier member with the same name.
///
/// Redefinitions must target the same shape; the later definition's traits
/// win.
fn add_member(container: &ShapeId, members: &mut Vec<Shape>, member: Shape) -> Result<(), ModelError> {
    let name = member.member_name().unwrap_or_default().to_string();
    let Some(existing) = members
        .iter_mut()
        .find(|m| m.member_name() == Some(name.as_str()))
    else {
        members.push(member);
        return Ok(());
    };

    if existing.target() != member.target() {
        return Err(ModelError::InvalidMixinUsage {
            id: container.clone(),
            reason: format!(
                "member `{name}` is defined with conflicting targets `{}` and `{}`",
                render_target(existing.target()),
                render_target(member.target())
            ),
        });
    }
    for (trait_id, value) in member.traits() {
        existing.traits_mut().insert(trait_id.clone(), value.clone());
    }
    Ok(())
}

fn render_target(target: Option<&ShapeId>) -> String {
    target.map(ToString::to_string).unwrap_or_default()
}

/// Mixins may only be used through mixin composition.
///
/// Reports members that target a mixin and bindings (operation input or
/// output, service or resource children) that reference one.
pub fn check_mixin_usage(graph: &ShapeGraph) -> Vec<ModelError> {
    let is_mixin = |id: &ShapeId| graph.get_shape(id).is_some_and(Shape::is_mixin);
    let mut errors = Vec::new();

    for shape in graph.all_shapes() {
        for member in shape.members() {
            if let Some(target) = member.target().filter(|t| is_mixin(t)) {
                errors.push(ModelError::InvalidMixinUsage {
                    id: member.id().clone(),
                    reason: format!("members cannot target the mixin `{target}`"),
                });
            }
        }
        for (label, target) in shape.bindings().references() {
            if is_mixin(target) {
                errors.push(ModelError::InvalidMixinUsage {
                    id: shape.id().clone(),
                    reason: format!("the mixin `{target}` cannot be bound as {label}"),
                });
            }
        }
    }
    errors
}

/// Flatten every shape in `graph`.
///
/// Returns the flattened graph together with every error found; shapes that
/// fail to flatten are left as declared.
pub fn flatten_all(graph: &ShapeGraph) -> (ShapeGraph, Vec<ModelError>) {
    let mut errors = check_mixin_usage(graph);
    let mut resolver = MixinResolver::new(graph);
    let mut flattened = graph.clone();

    for shape in graph.all_shapes().filter(|s| !s.mixins().is_empty()) {
        match resolver.flatten(shape.id()) {
            Ok(flat) => flattened.replace_shape(flat),
            Err(err) => {
                if !errors.contains(&err) {
                    errors.push(err);
                }
            }
        }
    }
    (flattened, errors)
}
