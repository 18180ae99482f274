//! Selector parse errors.

use thiserror::Error;

/// Errors raised while parsing a selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("syntax error at offset {position} in `{expression}`: {message}")]
    Syntax {
        expression: String,
        message: String,
        position: usize,
    },
}

pub type Result<T> = std::result::Result<T, SelectorError>;
