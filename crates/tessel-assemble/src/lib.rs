//! Model assembly.
//!
//! Loads JSON AST fragments, merges them over the prelude, upgrades 1.0
//! shapes, flattens mixins, and validates the frozen result.
//!
//! ```
//! use serde_json::json;
//! use tessel_assemble::ModelAssembler;
//!
//! let mut assembler = ModelAssembler::new();
//! assembler
//!     .add_value(
//!         "inline",
//!         json!({
//!             "smithy": "2.0",
//!             "shapes": { "ex#Empty": { "type": "structure" } }
//!         }),
//!     )
//!     .unwrap();
//! let result = assembler.assemble().unwrap();
//! assert!(result.is_valid());
//! ```

pub mod assembler;
pub mod ast;
pub mod error;
pub mod upgrade;

pub use assembler::{Assembled, ModelAssembler, ValidatedResult};
pub use ast::{Apply, Fragment, IdlVersion};
pub use error::AssembleError;
