//! Model validation.
//!
//! A [`ValidationEngine`] runs every registered [`Validator`] over a frozen
//! model, adds the validators configured in the model's `validators`
//! metadata, applies suppressions, and returns a sorted
//! [`ValidationReport`].
//!
//! Structural validators ([`builtin`]) only report ERROR events, which can
//! be neither suppressed nor disabled. Advisory validators ([`advisory`])
//! report WARNING events.

pub mod advisory;
pub mod builtin;
pub mod config;
pub mod engine;
pub mod report;
pub mod suppression;
pub mod validator;

pub use config::{load_validators, ConfiguredValidator, ValidatorConfig};
pub use engine::ValidationEngine;
pub use report::{ReportSummary, ValidationReport};
pub use suppression::{MetadataSuppression, Suppressions};
pub use validator::{Validator, ValidatorRegistry};
