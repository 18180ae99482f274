//! Traits applied to trait definitions.
//!
//! Some traits change the meaning of other traits rather than of shapes:
//! `@idempotencyToken` carries `@notProperty`, so any member marked with it
//! is not a resource property. [`MetaTraitTable`] records, for each trait
//! definition, the traits applied to it, and answers whether a meta-trait
//! reaches a shape either directly or through one of its traits.

use std::collections::{BTreeMap, BTreeSet};

use tessel_core::traits::ids;
use tessel_core::{Model, Shape, ShapeId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaTraitTable {
    by_trait: BTreeMap<ShapeId, BTreeSet<ShapeId>>,
}

impl MetaTraitTable {
    pub fn build(model: &Model) -> Self {
        let by_trait = model
            .shapes()
            .filter(|shape| shape.is_trait_definition())
            .map(|def| {
                let metas: BTreeSet<ShapeId> = def
                    .traits()
                    .keys()
                    .filter(|id| **id != ids::trait_def())
                    .cloned()
                    .collect();
                (def.id().clone(), metas)
            })
            .filter(|(_, metas)| !metas.is_empty())
            .collect();
        Self { by_trait }
    }

    /// Traits applied to the definition of `trait_id`.
    pub fn meta_traits(&self, trait_id: &ShapeId) -> impl Iterator<Item = &ShapeId> {
        self.by_trait.get(trait_id).into_iter().flatten()
    }

    pub fn has_meta_trait(&self, trait_id: &ShapeId, meta: &ShapeId) -> bool {
        self.by_trait
            .get(trait_id)
            .is_some_and(|metas| metas.contains(meta))
    }

    /// Whether `meta` applies to `shape`, directly or through any trait on it.
    pub fn applies(&self, shape: &Shape, meta: &ShapeId) -> bool {
        shape.has_trait(meta)
            || shape
                .traits()
                .keys()
                .any(|trait_id| self.has_meta_trait(trait_id, meta))
    }

    /// Whether a member is excluded from resource property binding.
    pub fn is_not_property(&self, member: &Shape) -> bool {
        self.applies(member, &ids::not_property())
    }
}
