//! Assembly errors.
//!
//! These cover failures to read or decode model sources. Problems with the
//! model itself are reported as validation events on the assembly result.

use std::io;
use std::path::PathBuf;

use tessel_core::ModelError;
use thiserror::Error;

/// Errors that can occur before a model reaches the validation stages.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model AST in {origin}: {message}")]
    Ast { origin: String, message: String },

    #[error("unsupported model version `{version}` in {origin}")]
    UnsupportedVersion { origin: String, version: String },

    #[error("failed to fingerprint model: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error("model is invalid: {errors} error(s), first: {first}")]
    Invalid { errors: usize, first: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AssembleError {
    pub(crate) fn ast(origin: &str, message: impl Into<String>) -> Self {
        AssembleError::Ast {
            origin: origin.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_their_origin() {
        let err = AssembleError::ast("weather.json", "`shapes` must be an object");
        assert_eq!(
            err.to_string(),
            "invalid model AST in weather.json: `shapes` must be an object"
        );

        let err = AssembleError::UnsupportedVersion {
            origin: "a.json".into(),
            version: "3.0".into(),
        };
        assert!(err.to_string().contains("`3.0`"));
    }

    #[test]
    fn model_errors_convert() {
        let err: AssembleError = ModelError::InvalidShapeId("nope".into()).into();
        assert!(matches!(err, AssembleError::Model(_)));
        assert_eq!(err.to_string(), "invalid shape id: `nope`");
    }
}
