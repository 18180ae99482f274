//! Core data structures for the Tessel interface-definition model.
//!
//! A model is a graph of shapes addressed by [`ShapeId`]. Shapes are collected
//! into a mutable [`ShapeGraph`] while fragments are merged, then frozen into
//! an immutable [`Model`] that downstream stages share across threads.

pub mod builder;
pub mod error;
pub mod event;
pub mod graph;
pub mod hash;
pub mod prelude;
pub mod shape;
pub mod shape_id;
pub mod traits;

pub use error::ModelError;
pub use event::{Severity, ValidationEvent};
pub use graph::{Model, ShapeGraph};
pub use shape::{Bindings, Shape, ShapeKind};
pub use shape_id::ShapeId;
pub use traits::TraitMap;
