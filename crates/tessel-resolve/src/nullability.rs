//! Member nullability and effective defaults.
//!
//! Every member gets a [`NullabilityRecord`] computed from its own traits and
//! then its target's traits. Member traits shadow target traits. The records
//! are collected into a [`NullabilityIndex`] keyed by member id and tagged
//! with the fingerprint of the model they were computed from, so a stale
//! index can be detected and rebuilt after a transform changes traits.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tessel_core::traits::ids;
use tessel_core::{Model, Shape, ShapeId, ShapeKind};
use tracing::debug;

/// Who is asking whether a member can be null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckMode {
    /// A non-authoritative consumer such as a generated client. Honours
    /// `@clientOptional` and treats members of `@input` structures as optional.
    Client,
    /// An authoritative consumer such as a server. Only `@required` and
    /// `@default` matter.
    Server,
}

/// Where a member lives, which changes how its traits are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberContext {
    Structure,
    Union,
    ListMember,
    MapKey,
    MapValue,
}

/// Derived optionality of one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NullabilityRecord {
    pub is_required: bool,
    pub has_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    pub is_client_optional: bool,
    pub context: MemberContext,
    /// The container is an `@input` structure.
    pub in_input: bool,
    /// The container is a `@sparse` list or map.
    pub sparse: bool,
}

impl NullabilityRecord {
    /// Resolve the record for `member`, or `None` if it is not a member of a
    /// structure, union, list or map.
    pub fn resolve(model: &Model, member: &Shape) -> Option<Self> {
        let container = model.container_of(member)?;
        let name = member.member_name().unwrap_or_default();
        let context = match container.kind() {
            ShapeKind::Structure => MemberContext::Structure,
            ShapeKind::Union => MemberContext::Union,
            ShapeKind::List => MemberContext::ListMember,
            ShapeKind::Map if name == "key" => MemberContext::MapKey,
            ShapeKind::Map => MemberContext::MapValue,
            _ => return None,
        };

        let (has_default, default_value) = effective_default(model, member);
        Some(Self {
            is_required: member.has_trait(&ids::required()),
            has_default,
            default_value,
            is_client_optional: member.has_trait(&ids::client_optional()),
            context,
            in_input: container.has_trait(&ids::input()),
            sparse: container.has_trait(&ids::sparse()),
        })
    }

    /// Whether the member may be absent for a consumer in `mode`.
    pub fn is_nullable(&self, mode: CheckMode) -> bool {
        match self.context {
            MemberContext::Union => true,
            MemberContext::ListMember | MemberContext::MapValue => self.sparse,
            MemberContext::MapKey => false,
            MemberContext::Structure => {
                if mode == CheckMode::Client && (self.is_client_optional || self.in_input) {
                    return true;
                }
                !(self.is_required || self.has_default)
            }
        }
    }
}

/// The default a member ends up with.
///
/// A member `@default` wins; `@default(null)` cancels the target's default.
/// Without a member default the target's root-level default applies.
fn effective_default(model: &Model, member: &Shape) -> (bool, Option<Value>) {
    let declared = member.get_trait(&ids::default()).or_else(|| {
        model
            .member_target(member)
            .and_then(|target| target.get_trait(&ids::default()))
    });
    match declared {
        None | Some(Value::Null) => (false, None),
        Some(value) => (true, Some(value.clone())),
    }
}

/// Nullability records for every member of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NullabilityIndex {
    fingerprint: String,
    records: BTreeMap<ShapeId, NullabilityRecord>,
}

impl NullabilityIndex {
    pub fn build(model: &Model) -> Result<Self, serde_json::Error> {
        let records: BTreeMap<ShapeId, NullabilityRecord> = model
            .shapes()
            .flat_map(Shape::members)
            .filter_map(|member| {
                NullabilityRecord::resolve(model, member).map(|r| (member.id().clone(), r))
            })
            .collect();
        debug!(members = records.len(), "built nullability index");
        Ok(Self {
            fingerprint: model.fingerprint()?,
            records,
        })
    }

    /// Whether the index was computed from exactly this model.
    pub fn is_current(&self, model: &Model) -> Result<bool, serde_json::Error> {
        Ok(self.fingerprint == model.fingerprint()?)
    }

    /// Rebuild if `model` differs from the one the index was built from.
    /// Returns whether a rebuild happened.
    pub fn refresh(&mut self, model: &Model) -> Result<bool, serde_json::Error> {
        if self.is_current(model)? {
            return Ok(false);
        }
        *self = Self::build(model)?;
        Ok(true)
    }

    pub fn get(&self, member: &ShapeId) -> Option<&NullabilityRecord> {
        self.records.get(member)
    }

    /// `None` when `member` is not an indexed member.
    pub fn is_member_nullable(&self, member: &ShapeId, mode: CheckMode) -> Option<bool> {
        self.get(member).map(|record| record.is_nullable(mode))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ShapeId, &NullabilityRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::builder::ShapeBuilder;
    use tessel_core::ShapeGraph;

    use super::*;

    fn id(name: &str) -> ShapeId {
        ShapeId::new("ex", name)
    }

    fn model() -> Model {
        let string = ShapeId::prelude("String");
        let mut graph = ShapeGraph::with_prelude();
        let shapes = vec![
            ShapeBuilder::structure(id("Thing"))
                .member_with("req", string.clone(), [(ids::required(), json!({}))])
                .member_with("def", string.clone(), [(ids::default(), json!("x"))])
                .member_with(
                    "both",
                    string.clone(),
                    [(ids::required(), json!({})), (ids::client_optional(), json!({}))],
                )
                .member("plain", string.clone())
                .member("zero", ShapeId::prelude("PrimitiveInteger"))
                .member_with(
                    "cancelled",
                    ShapeId::prelude("PrimitiveBoolean"),
                    [(ids::default(), Value::Null)],
                )
                .build(),
            ShapeBuilder::structure(id("In"))
                .member_with("req", string.clone(), [(ids::required(), json!({}))])
                .with_trait(ids::input(), json!({}))
                .build(),
            ShapeBuilder::union(id("Choice"))
                .member_with("a", string.clone(), [(ids::required(), json!({}))])
                .build(),
            ShapeBuilder::list(id("Names"), string.clone()).build(),
            ShapeBuilder::list(id("SparseNames"), string.clone())
                .with_trait(ids::sparse(), json!({}))
                .build(),
            ShapeBuilder::map(id("Lookup"), string.clone(), string).build(),
        ];
        for shape in shapes {
            graph.add_shape(shape).unwrap();
        }
        graph.freeze()
    }

    fn record<'a>(index: &'a NullabilityIndex, container: &str, member: &str) -> &'a NullabilityRecord {
        index.get(&id(container).with_member(member)).unwrap()
    }

    #[test]
    fn resolution_table() {
        let model = model();
        let index = NullabilityIndex::build(&model).unwrap();

        let req = record(&index, "Thing", "req");
        assert!(req.is_required && !req.has_default);
        assert!(!req.is_nullable(CheckMode::Client));

        let def = record(&index, "Thing", "def");
        assert_eq!(def.default_value, Some(json!("x")));
        assert!(!def.is_nullable(CheckMode::Server));

        let both = record(&index, "Thing", "both");
        assert!(both.is_nullable(CheckMode::Client));
        assert!(!both.is_nullable(CheckMode::Server));

        let plain = record(&index, "Thing", "plain");
        assert!(!plain.is_required && !plain.has_default);
        assert!(plain.is_nullable(CheckMode::Server));
    }

    #[test]
    fn target_defaults_apply_unless_cancelled() {
        let model = model();
        let index = NullabilityIndex::build(&model).unwrap();

        let zero = record(&index, "Thing", "zero");
        assert_eq!(zero.default_value, Some(json!(0)));
        assert!(!zero.is_nullable(CheckMode::Client));

        let cancelled = record(&index, "Thing", "cancelled");
        assert!(!cancelled.has_default);
        assert!(cancelled.is_nullable(CheckMode::Server));
    }

    #[test]
    fn context_rules() {
        let model = model();
        let index = NullabilityIndex::build(&model).unwrap();

        let input = id("In").with_member("req");
        assert_eq!(index.is_member_nullable(&input, CheckMode::Client), Some(true));
        assert_eq!(index.is_member_nullable(&input, CheckMode::Server), Some(false));

        let union_member = id("Choice").with_member("a");
        assert_eq!(index.is_member_nullable(&union_member, CheckMode::Server), Some(true));

        let dense = id("Names").with_member("member");
        let sparse = id("SparseNames").with_member("member");
        assert_eq!(index.is_member_nullable(&dense, CheckMode::Client), Some(false));
        assert_eq!(index.is_member_nullable(&sparse, CheckMode::Client), Some(true));

        let key = id("Lookup").with_member("key");
        assert_eq!(record(&index, "Lookup", "key").context, MemberContext::MapKey);
        assert_eq!(index.is_member_nullable(&key, CheckMode::Client), Some(false));

        assert_eq!(index.is_member_nullable(&id("Nope").with_member("x"), CheckMode::Client), None);
    }

    #[test]
    fn refresh_rebuilds_only_when_the_model_changes() {
        let model = model();
        let mut index = NullabilityIndex::build(&model).unwrap();
        assert!(!index.refresh(&model).unwrap());

        let mut graph = model.to_graph();
        graph
            .apply_trait(&id("Thing").with_member("plain"), ids::required(), json!({}), false)
            .unwrap();
        let changed = graph.freeze();
        assert!(!index.is_current(&changed).unwrap());
        assert!(index.refresh(&changed).unwrap());
        assert!(!index.is_member_nullable(&id("Thing").with_member("plain"), CheckMode::Server).unwrap());
    }
}
