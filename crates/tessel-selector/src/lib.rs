//! Selector query language for Tessel models.
//!
//! A selector is a small expression such as `structure > member [trait|required]`
//! that matches shapes in a [`Model`] by walking the relationship graph.
//! Expressions are parsed once into a [`Selector`] and can then be evaluated
//! against any number of models, from any number of threads.
//!
//! ```
//! use tessel_core::builder::ShapeBuilder;
//! use tessel_core::{ShapeGraph, ShapeId};
//! use tessel_selector::Selector;
//!
//! let mut graph = ShapeGraph::with_prelude();
//! graph
//!     .add_shape(
//!         ShapeBuilder::structure(ShapeId::new("ex", "Point"))
//!             .member("x", ShapeId::prelude("Integer"))
//!             .build(),
//!     )
//!     .unwrap();
//! let model = graph.freeze();
//!
//! let selector = Selector::parse("[id|namespace = ex] > member").unwrap();
//! let ids = selector.select_ids(&model);
//! assert!(ids.contains(&ShapeId::new("ex", "Point").with_member("x")));
//! ```

pub mod ast;
pub mod attribute;
pub mod error;
mod eval;
pub mod neighbor;
pub mod parser;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tessel_core::{Model, Shape, ShapeId};
use tracing::debug;

pub use error::{Result, SelectorError};
pub use neighbor::{NeighborIndex, RelationshipKind};

use eval::Context;
use parser::Parsed;

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    expression: String,
    parsed: Parsed,
}

/// One selected shape plus the variables captured while reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeMatch {
    pub shape: ShapeId,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, BTreeSet<ShapeId>>,
}

impl Selector {
    pub fn parse(expression: &str) -> Result<Self> {
        let parsed = parser::parse(expression)?;
        Ok(Selector {
            expression: expression.to_string(),
            parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Every shape (members included) the selector matches, ordered by id.
    pub fn select<'m>(&self, model: &'m Model) -> Vec<&'m Shape> {
        let mut selected: BTreeMap<&'m ShapeId, &'m Shape> = BTreeMap::new();
        let mut ctx = Context::new(model, &self.parsed);
        for start in model.shapes_with_members() {
            ctx.run_from(&self.parsed.sequence, start, &mut |shape, _| {
                selected.entry(shape.id()).or_insert(shape);
            });
        }
        debug!(selector = %self.expression, matched = selected.len(), "evaluated selector");
        selected.into_values().collect()
    }

    pub fn select_ids(&self, model: &Model) -> BTreeSet<ShapeId> {
        self.select(model)
            .into_iter()
            .map(|shape| shape.id().clone())
            .collect()
    }

    /// Whether `shape` is part of what the selector yields over `model`.
    pub fn matches(&self, model: &Model, shape: &Shape) -> bool {
        self.select(model).iter().any(|s| s.id() == shape.id())
    }

    /// Shapes yielded when evaluation starts at `start` only.
    pub fn select_from<'m>(&self, model: &'m Model, start: &'m Shape) -> Vec<&'m Shape> {
        let mut ctx = Context::new(model, &self.parsed);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        ctx.run_from(&self.parsed.sequence, start, &mut |shape, _| {
            if seen.insert(shape.id()) {
                out.push(shape);
            }
        });
        out
    }

    /// Matches with their variable bindings. The first binding produced for
    /// a shape wins.
    pub fn evaluate(&self, model: &Model) -> Vec<ShapeMatch> {
        let mut matches: BTreeMap<ShapeId, BTreeMap<String, BTreeSet<ShapeId>>> = BTreeMap::new();
        let mut ctx = Context::new(model, &self.parsed);
        for start in model.shapes_with_members() {
            ctx.run_from(&self.parsed.sequence, start, &mut |shape, vars| {
                if matches.contains_key(shape.id()) {
                    return;
                }
                let variables = vars
                    .iter()
                    .map(|(name, shapes)| {
                        (name.clone(), shapes.iter().map(|s| s.id().clone()).collect())
                    })
                    .collect();
                matches.insert(shape.id().clone(), variables);
            });
        }
        matches
            .into_iter()
            .map(|(shape, variables)| ShapeMatch { shape, variables })
            .collect()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}
