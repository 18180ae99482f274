//! JSON AST fragments.
//!
//! A fragment is one JSON document:
//!
//! ```json
//! {
//!   "smithy": "2.0",
//!   "metadata": { "suppressions": [] },
//!   "shapes": {
//!     "ex.weather#City": {
//!       "type": "structure",
//!       "members": { "name": { "target": "smithy.api#String" } }
//!     },
//!     "ex.weather#City$name": {
//!       "type": "apply",
//!       "traits": { "smithy.api#documentation": "The city name" }
//!     }
//!   }
//! }
//! ```
//!
//! Member order follows the document when a fragment is parsed from text.
//! A fragment built from a [`serde_json::Value`] sees its members in key
//! order, since `Value` objects are sorted.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use tessel_core::shape::{OperationBindings, ResourceBindings, ServiceBindings};
use tessel_core::{Bindings, Shape, ShapeId, ShapeKind, TraitMap};

use crate::error::AssembleError;

/// Namespace that relative trait names resolve against.
const PRELUDE_NAMESPACE: &str = "smithy.api";

/// IDL version a fragment declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdlVersion {
    V1,
    V2,
}

impl IdlVersion {
    fn parse(origin: &str, text: &str) -> Result<Self, AssembleError> {
        match text {
            "1" | "1.0" => Ok(IdlVersion::V1),
            "2" | "2.0" => Ok(IdlVersion::V2),
            other => Err(AssembleError::UnsupportedVersion {
                origin: origin.to_string(),
                version: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for IdlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdlVersion::V1 => write!(f, "1.0"),
            IdlVersion::V2 => write!(f, "2.0"),
        }
    }
}

/// Traits applied to a shape defined elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Apply {
    pub target: ShapeId,
    pub traits: TraitMap,
    /// Replace conflicting values instead of reporting a conflict.
    pub override_existing: bool,
}

/// One decoded model document.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub origin: String,
    pub version: IdlVersion,
    pub metadata: BTreeMap<String, Value>,
    pub shapes: Vec<Shape>,
    pub applies: Vec<Apply>,
}

impl Fragment {
    /// Decode a fragment from JSON text.
    pub fn parse_str(origin: &str, text: &str) -> Result<Self, AssembleError> {
        let raw: RawFragment = serde_json::from_str(text).map_err(|source| AssembleError::Json {
            origin: origin.to_string(),
            source,
        })?;
        raw.convert(origin)
    }

    /// Decode a fragment from an already-parsed JSON value.
    pub fn from_value(origin: &str, value: Value) -> Result<Self, AssembleError> {
        let raw: RawFragment = serde_json::from_value(value).map_err(|source| AssembleError::Json {
            origin: origin.to_string(),
            source,
        })?;
        raw.convert(origin)
    }

    /// Read and decode a fragment file.
    pub fn load(path: &Path) -> Result<Self, AssembleError> {
        let text = fs::read_to_string(path).map_err(|source| AssembleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&path.display().to_string(), &text)
    }
}

/// Every `*.json` file under `dir`, recursively, in sorted order.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, AssembleError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|source| AssembleError::Io {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| AssembleError::Io {
                    path: current.clone(),
                    source,
                })?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[derive(Debug, Deserialize)]
struct RawFragment {
    smithy: String,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    #[serde(default)]
    shapes: OrderedMap<RawShape>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawShape {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    traits: BTreeMap<String, Value>,
    #[serde(default)]
    mixins: Vec<RawTarget>,
    #[serde(default, rename = "override")]
    override_existing: bool,

    // Aggregates
    #[serde(default)]
    members: Option<OrderedMap<RawMember>>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    key: Option<RawMember>,
    #[serde(default)]
    value: Option<RawMember>,

    // Operations
    #[serde(default)]
    input: Option<RawTarget>,
    #[serde(default)]
    output: Option<RawTarget>,
    #[serde(default)]
    errors: Vec<RawTarget>,

    // Services and resources
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    operations: Vec<RawTarget>,
    #[serde(default)]
    resources: Vec<RawTarget>,
    #[serde(default)]
    identifiers: BTreeMap<String, RawTarget>,
    #[serde(default)]
    properties: BTreeMap<String, RawTarget>,
    #[serde(default)]
    create: Option<RawTarget>,
    #[serde(default)]
    put: Option<RawTarget>,
    #[serde(default)]
    read: Option<RawTarget>,
    #[serde(default)]
    update: Option<RawTarget>,
    #[serde(default)]
    delete: Option<RawTarget>,
    #[serde(default)]
    list: Option<RawTarget>,
    #[serde(default)]
    collection_operations: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    traits: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    target: String,
}

/// A JSON object decoded into entries in document order.
#[derive(Debug)]
struct OrderedMap<T>(Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        OrderedMap(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(std::marker::PhantomData))
    }
}

impl RawFragment {
    fn convert(self, origin: &str) -> Result<Fragment, AssembleError> {
        let version = IdlVersion::parse(origin, &self.smithy)?;
        let mut shapes = Vec::new();
        let mut applies = Vec::new();
        for (key, raw) in self.shapes.0 {
            let id = shape_id(origin, &key)?;
            if raw.kind == "apply" {
                applies.push(Apply {
                    target: id,
                    traits: trait_map(origin, raw.traits)?,
                    override_existing: raw.override_existing,
                });
                continue;
            }
            if id.is_member() {
                return Err(AssembleError::ast(
                    origin,
                    format!("`{id}` is a member id; only `apply` may target members"),
                ));
            }
            shapes.push(raw.into_shape(origin, id)?);
        }
        Ok(Fragment {
            origin: origin.to_string(),
            version,
            metadata: self.metadata,
            shapes,
            applies,
        })
    }
}

impl RawShape {
    fn into_shape(self, origin: &str, id: ShapeId) -> Result<Shape, AssembleError> {
        let kind: ShapeKind = self
            .kind
            .parse()
            .map_err(|message: String| AssembleError::ast(origin, format!("`{id}`: {message}")))?;
        if kind == ShapeKind::Member {
            return Err(AssembleError::ast(origin, format!("`{id}` cannot be a top-level member")));
        }

        let mut shape = Shape::new(id.clone(), kind);
        *shape.traits_mut() = trait_map(origin, self.traits)?;
        for mixin in self.mixins {
            shape.mixins_mut().push(shape_id(origin, &mixin.target)?);
        }

        let members: Vec<(String, RawMember)> = match kind {
            ShapeKind::Structure | ShapeKind::Union | ShapeKind::Enum | ShapeKind::IntEnum => {
                self.members.unwrap_or_default().0
            }
            ShapeKind::List => vec![(
                "member".to_string(),
                self.member
                    .ok_or_else(|| AssembleError::ast(origin, format!("list `{id}` has no member")))?,
            )],
            ShapeKind::Map => {
                let (Some(key), Some(value)) = (self.key, self.value) else {
                    return Err(AssembleError::ast(origin, format!("map `{id}` needs a key and a value")));
                };
                vec![("key".to_string(), key), ("value".to_string(), value)]
            }
            _ => Vec::new(),
        };
        for (name, raw) in members {
            let target = match (raw.target, kind) {
                (Some(target), _) => shape_id(origin, &target)?,
                (None, ShapeKind::Enum | ShapeKind::IntEnum) => ShapeId::prelude("Unit"),
                (None, _) => {
                    return Err(AssembleError::ast(origin, format!("member `{id}${name}` has no target")))
                }
            };
            let mut member = Shape::member(&id, &name, target);
            *member.traits_mut() = trait_map(origin, raw.traits)?;
            shape.members_mut().push(member);
        }

        let targets = |list: Vec<RawTarget>| -> Result<Vec<ShapeId>, AssembleError> {
            list.iter().map(|t| shape_id(origin, &t.target)).collect()
        };
        let target = |raw: Option<RawTarget>| -> Result<Option<ShapeId>, AssembleError> {
            raw.map(|t| shape_id(origin, &t.target)).transpose()
        };
        let named = |map: BTreeMap<String, RawTarget>| -> Result<BTreeMap<String, ShapeId>, AssembleError> {
            map.into_iter()
                .map(|(name, t)| Ok((name, shape_id(origin, &t.target)?)))
                .collect()
        };

        let bindings = match kind {
            ShapeKind::Operation => Bindings::Operation(OperationBindings {
                input: target(self.input)?,
                output: target(self.output)?,
                errors: targets(self.errors)?,
            }),
            ShapeKind::Service => Bindings::Service(ServiceBindings {
                version: self.version,
                operations: targets(self.operations)?,
                resources: targets(self.resources)?,
                errors: targets(self.errors)?,
            }),
            ShapeKind::Resource => Bindings::Resource(ResourceBindings {
                identifiers: named(self.identifiers)?,
                properties: named(self.properties)?,
                create: target(self.create)?,
                put: target(self.put)?,
                read: target(self.read)?,
                update: target(self.update)?,
                delete: target(self.delete)?,
                list: target(self.list)?,
                operations: targets(self.operations)?,
                collection_operations: targets(self.collection_operations)?,
                resources: targets(self.resources)?,
            }),
            _ => Bindings::None,
        };
        *shape.bindings_mut() = bindings;
        Ok(shape)
    }
}

fn shape_id(origin: &str, text: &str) -> Result<ShapeId, AssembleError> {
    ShapeId::parse(text).map_err(|err| AssembleError::ast(origin, err.to_string()))
}

/// Trait keys are absolute ids; a bare name resolves to the prelude.
fn trait_map(origin: &str, raw: BTreeMap<String, Value>) -> Result<TraitMap, AssembleError> {
    raw.into_iter()
        .map(|(key, value)| {
            let id = ShapeId::parse_relative(&key, PRELUDE_NAMESPACE)
                .map_err(|err| AssembleError::ast(origin, err.to_string()))?;
            Ok((id, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessel_core::traits::ids;

    use super::*;

    #[test]
    fn members_keep_document_order() {
        let fragment = Fragment::parse_str(
            "order.json",
            r#"{
                "smithy": "2.0",
                "shapes": {
                    "ex#S": {
                        "type": "structure",
                        "members": {
                            "zebra": { "target": "smithy.api#String" },
                            "apple": {
                                "target": "smithy.api#Integer",
                                "traits": { "smithy.api#required": {} }
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(fragment.version, IdlVersion::V2);
        let names: Vec<_> = fragment.shapes[0]
            .members()
            .iter()
            .filter_map(Shape::member_name)
            .collect();
        assert_eq!(names, vec!["zebra", "apple"]);
        assert!(fragment.shapes[0].members()[1].has_trait(&ids::required()));
    }

    #[test]
    fn bindings_and_applies() {
        let fragment = Fragment::from_value(
            "value",
            json!({
                "smithy": "1.0",
                "metadata": { "owner": "weather" },
                "shapes": {
                    "ex#GetCity": {
                        "type": "operation",
                        "input": { "target": "ex#GetCityInput" },
                        "errors": [{ "target": "ex#NotFound" }]
                    },
                    "ex#City": {
                        "type": "resource",
                        "identifiers": { "cityId": { "target": "smithy.api#String" } },
                        "read": { "target": "ex#GetCity" }
                    },
                    "ex#Names": { "type": "list", "member": { "target": "smithy.api#String" } },
                    "ex#Color": { "type": "enum", "members": { "RED": {} } },
                    "ex#GetCityInput$cityId": {
                        "type": "apply",
                        "override": true,
                        "traits": { "documentation": "id" }
                    }
                }
            }),
        )
        .unwrap();

        assert_eq!(fragment.version, IdlVersion::V1);
        assert_eq!(fragment.metadata["owner"], json!("weather"));
        assert_eq!(fragment.shapes.len(), 4);
        assert_eq!(fragment.applies.len(), 1);
        assert!(fragment.applies[0].override_existing);
        assert!(fragment.applies[0].traits.contains_key(&ids::documentation()));

        let get = |name: &str| {
            fragment
                .shapes
                .iter()
                .find(|s| s.id().name() == name)
                .unwrap()
        };
        let op = get("GetCity").bindings().as_operation().unwrap();
        assert_eq!(op.input, Some(ShapeId::new("ex", "GetCityInput")));
        assert_eq!(op.errors, vec![ShapeId::new("ex", "NotFound")]);
        let city = get("City").bindings().as_resource().unwrap();
        assert_eq!(city.read, Some(ShapeId::new("ex", "GetCity")));
        assert_eq!(get("Names").members()[0].member_name(), Some("member"));
        assert_eq!(get("Color").members()[0].target(), Some(&ShapeId::prelude("Unit")));
    }

    #[test]
    fn malformed_fragments() {
        let err = Fragment::parse_str("bad.json", "{").unwrap_err();
        assert!(matches!(err, AssembleError::Json { .. }));

        let err = Fragment::from_value("v", json!({ "smithy": "3.0" })).unwrap_err();
        assert!(matches!(err, AssembleError::UnsupportedVersion { .. }));

        let err = Fragment::from_value(
            "v",
            json!({ "smithy": "2.0", "shapes": { "ex#L": { "type": "list" } } }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no member"));

        let err = Fragment::from_value(
            "v",
            json!({ "smithy": "2.0", "shapes": { "ex#X": { "type": "widget" } } }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown shape type `widget`"));

        let err = Fragment::from_value(
            "v",
            json!({ "smithy": "2.0", "shapes": { "ex#S$m": { "type": "structure" } } }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("only `apply` may target members"));
    }

    #[test]
    fn discovers_json_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("nested").join("c.json"), "{}").unwrap();

        let found = discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.json"),
                PathBuf::from("b.json"),
                PathBuf::from("nested").join("c.json"),
            ]
        );
    }
}
