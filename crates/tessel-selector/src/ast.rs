//! Parsed selector expressions.

use tessel_core::ShapeKind;

/// A sequence of stages; each stage feeds the shapes it yields to the next.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence(pub Vec<Stage>);

/// Shape categories usable in place of a shape type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Number,
    SimpleType,
    Collection,
}

impl Category {
    pub fn matches(self, kind: ShapeKind) -> bool {
        match self {
            Category::Number => kind.is_number(),
            Category::SimpleType => kind.is_simple(),
            Category::Collection => kind.is_collection(),
        }
    }
}

/// Attribute comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    Contains,
    Exists,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    ProjectionEquals,
    ProjectionNotEquals,
    Subset,
    ProperSubset,
}

impl Comparator {
    pub fn is_projection(self) -> bool {
        matches!(
            self,
            Comparator::ProjectionEquals
                | Comparator::ProjectionNotEquals
                | Comparator::Subset
                | Comparator::ProperSubset
        )
    }
}

/// `[path]` or `[path op values i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTest {
    pub path: Vec<String>,
    /// `None` for a bare existence check.
    pub comparison: Option<(Comparator, Vec<String>, bool)>,
}

/// One side of a scoped comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopedOperand {
    /// `@{a|b}` relative to the scoped value.
    Path(Vec<String>),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopedAssertion {
    pub lhs: ScopedOperand,
    pub comparator: Comparator,
    pub rhs: Vec<ScopedOperand>,
    pub case_insensitive: bool,
}

/// `[@path: assertion && ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedTest {
    pub path: Vec<String>,
    pub assertions: Vec<ScopedAssertion>,
}

/// Neighbor traversal stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Neighbor {
    /// `>`
    Forward,
    /// `<`
    Reverse,
    /// `-[a, b]->`
    ForwardDirected(Vec<String>),
    /// `<-[a, b]-`
    ReverseDirected(Vec<String>),
    /// `~>`
    Recursive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Kind(ShapeKind),
    Category(Category),
    Attribute(AttributeTest),
    Scoped(ScopedTest),
    Neighbor(Neighbor),
    Not(Sequence),
    Test(Vec<Sequence>),
    Is(Vec<Sequence>),
    In(Sequence),
    /// Index into the selector's root expressions.
    Root(usize),
    TopDown(Sequence, Option<Sequence>),
    Recursive(Sequence),
    StoreVariable(String, Sequence),
    GetVariable(String),
    /// A function this engine does not know; it yields nothing.
    Unknown(String),
}
