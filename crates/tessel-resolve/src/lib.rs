//! Resolution stages that run between merging and validation.
//!
//! - [`mixin`]: flatten mixin composition into concrete shapes
//! - [`nullability`]: per-member required/default/optional records
//! - [`defaults`]: default value legality
//! - [`metatrait`]: traits applied to trait definitions

pub mod defaults;
pub mod metatrait;
pub mod mixin;
pub mod nullability;

pub use defaults::check_defaults;
pub use metatrait::MetaTraitTable;
pub use mixin::{check_mixin_usage, flatten_all, MixinResolver};
pub use nullability::{CheckMode, MemberContext, NullabilityIndex, NullabilityRecord};
