//! Shape identifiers: `namespace#Name` with an optional `$member` suffix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Namespace of the implicitly available prelude shapes.
pub const PRELUDE_NAMESPACE: &str = "smithy.api";

/// An absolute shape identifier.
///
/// Ordering is lexicographic over (namespace, name, member), with a container
/// sorting before its members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShapeId {
    namespace: String,
    name: String,
    member: Option<String>,
}

impl ShapeId {
    /// Build an id from parts that are already known to be well formed.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            member: None,
        }
    }

    /// Shorthand for an id in the prelude namespace.
    pub fn prelude(name: impl Into<String>) -> Self {
        Self::new(PRELUDE_NAMESPACE, name)
    }

    /// Parse an absolute id such as `example.weather#Forecast$city`.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidShapeId(text.to_string());
        let (namespace, rest) = text.split_once('#').ok_or_else(invalid)?;
        let (name, member) = match rest.split_once('$') {
            Some((name, member)) => (name, Some(member)),
            None => (rest, None),
        };

        if !namespace.split('.').all(is_identifier) || !is_identifier(name) {
            return Err(invalid());
        }
        if let Some(member) = member {
            if !is_identifier(member) {
                return Err(invalid());
            }
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            member: member.map(str::to_string),
        })
    }

    /// Parse an id that may omit its namespace, filling in `default_namespace`.
    pub fn parse_relative(text: &str, default_namespace: &str) -> Result<Self, ModelError> {
        if text.contains('#') {
            Self::parse(text)
        } else {
            Self::parse(&format!("{default_namespace}#{text}"))
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn is_member(&self) -> bool {
        self.member.is_some()
    }

    pub fn is_prelude(&self) -> bool {
        self.namespace == PRELUDE_NAMESPACE
    }

    /// The id of `member` inside this shape.
    pub fn with_member(&self, member: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: Some(member.into()),
        }
    }

    /// The id of the containing shape (identity for non-members).
    pub fn without_member(&self) -> Self {
        Self::new(self.namespace.clone(), self.name.clone())
    }

    /// Re-home a member id under a different container, keeping its name.
    pub fn rehome(&self, container: &ShapeId) -> Self {
        match &self.member {
            Some(member) => container.with_member(member.clone()),
            None => container.clone(),
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)?;
        if let Some(member) = &self.member {
            write!(f, "${member}")?;
        }
        Ok(())
    }
}

impl FromStr for ShapeId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShapeId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShapeId> for String {
    fn from(id: ShapeId) -> Self {
        id.to_string()
    }
}
