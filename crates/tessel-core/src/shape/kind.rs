//! The closed set of shape kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every kind of shape a model may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Blob,
    Boolean,
    String,
    Timestamp,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Document,
    Enum,
    IntEnum,
    List,
    Map,
    Structure,
    Union,
    Service,
    Operation,
    Resource,
    Member,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 23] = [
        ShapeKind::Blob,
        ShapeKind::Boolean,
        ShapeKind::String,
        ShapeKind::Timestamp,
        ShapeKind::Byte,
        ShapeKind::Short,
        ShapeKind::Integer,
        ShapeKind::Long,
        ShapeKind::Float,
        ShapeKind::Double,
        ShapeKind::BigInteger,
        ShapeKind::BigDecimal,
        ShapeKind::Document,
        ShapeKind::Enum,
        ShapeKind::IntEnum,
        ShapeKind::List,
        ShapeKind::Map,
        ShapeKind::Structure,
        ShapeKind::Union,
        ShapeKind::Service,
        ShapeKind::Operation,
        ShapeKind::Resource,
        ShapeKind::Member,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Blob => "blob",
            ShapeKind::Boolean => "boolean",
            ShapeKind::String => "string",
            ShapeKind::Timestamp => "timestamp",
            ShapeKind::Byte => "byte",
            ShapeKind::Short => "short",
            ShapeKind::Integer => "integer",
            ShapeKind::Long => "long",
            ShapeKind::Float => "float",
            ShapeKind::Double => "double",
            ShapeKind::BigInteger => "bigInteger",
            ShapeKind::BigDecimal => "bigDecimal",
            ShapeKind::Document => "document",
            ShapeKind::Enum => "enum",
            ShapeKind::IntEnum => "intEnum",
            ShapeKind::List => "list",
            ShapeKind::Map => "map",
            ShapeKind::Structure => "structure",
            ShapeKind::Union => "union",
            ShapeKind::Service => "service",
            ShapeKind::Operation => "operation",
            ShapeKind::Resource => "resource",
            ShapeKind::Member => "member",
        }
    }

    /// Scalar kinds, including enums.
    pub fn is_simple(self) -> bool {
        matches!(
            self,
            ShapeKind::Blob
                | ShapeKind::Boolean
                | ShapeKind::String
                | ShapeKind::Timestamp
                | ShapeKind::Document
                | ShapeKind::Enum
                | ShapeKind::IntEnum
        ) || self.is_number()
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            ShapeKind::Byte
                | ShapeKind::Short
                | ShapeKind::Integer
                | ShapeKind::Long
                | ShapeKind::Float
                | ShapeKind::Double
                | ShapeKind::BigInteger
                | ShapeKind::BigDecimal
                | ShapeKind::IntEnum
        )
    }

    /// Numbers restricted to whole values.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ShapeKind::Byte
                | ShapeKind::Short
                | ShapeKind::Integer
                | ShapeKind::Long
                | ShapeKind::BigInteger
                | ShapeKind::IntEnum
        )
    }

    pub fn is_collection(self) -> bool {
        self == ShapeKind::List
    }

    /// Kinds whose members are declared rather than implied.
    pub fn has_members(self) -> bool {
        matches!(
            self,
            ShapeKind::Enum
                | ShapeKind::IntEnum
                | ShapeKind::List
                | ShapeKind::Map
                | ShapeKind::Structure
                | ShapeKind::Union
        )
    }

    /// Kinds that may be composed from mixins.
    pub fn supports_mixins(self) -> bool {
        matches!(
            self,
            ShapeKind::Structure
                | ShapeKind::Union
                | ShapeKind::Service
                | ShapeKind::Operation
                | ShapeKind::Resource
        )
    }

    /// Inclusive integer bounds for fixed-width integral kinds.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        match self {
            ShapeKind::Byte => Some((i8::MIN.into(), i8::MAX.into())),
            ShapeKind::Short => Some((i16::MIN.into(), i16::MAX.into())),
            ShapeKind::Integer | ShapeKind::IntEnum => Some((i32::MIN.into(), i32::MAX.into())),
            ShapeKind::Long => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown shape type `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_names() {
        for kind in ShapeKind::ALL {
            assert_eq!(kind.as_str().parse::<ShapeKind>().unwrap(), kind);
        }
        assert!("set".parse::<ShapeKind>().is_err());
    }

    #[test]
    fn categories() {
        assert!(ShapeKind::IntEnum.is_number());
        assert!(ShapeKind::IntEnum.is_simple());
        assert!(ShapeKind::Enum.is_simple());
        assert!(!ShapeKind::Enum.is_number());
        assert!(ShapeKind::List.is_collection());
        assert!(!ShapeKind::Map.is_collection());
        assert!(!ShapeKind::Structure.is_simple());
        assert_eq!(ShapeKind::Byte.integer_bounds(), Some((-128, 127)));
        assert_eq!(ShapeKind::BigInteger.integer_bounds(), None);
    }
}
