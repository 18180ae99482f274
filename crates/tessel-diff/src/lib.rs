//! Backward-compatibility checks between two model snapshots.
//!
//! Each structure member is classified into a [`MemberState`]. Moving a
//! member between states across snapshots is either always allowed, allowed
//! in context (an `@input` container, `@clientOptional`, `@addedDefault`),
//! or reported as a [`Finding`].
//!
//! ```
//! use tessel_core::builder::ShapeBuilder;
//! use tessel_core::{ShapeGraph, ShapeId};
//!
//! let snapshot = || {
//!     let mut graph = ShapeGraph::with_prelude();
//!     graph
//!         .add_shape(
//!             ShapeBuilder::structure(ShapeId::new("ex", "S"))
//!                 .member("m", ShapeId::prelude("String"))
//!                 .build(),
//!         )
//!         .unwrap();
//!     graph.freeze()
//! };
//! let report = tessel_diff::diff(&snapshot(), &snapshot());
//! assert!(report.is_empty());
//! ```

pub mod diff;
pub mod state;

pub use diff::{diff, DiffReport, Finding};
pub use state::MemberState;
