//! CLI command implementations.

pub mod diff;
pub mod nullability;
pub mod select;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tessel_assemble::{Assembled, ModelAssembler, ValidatedResult};
use tessel_validate::ValidationEngine;

use crate::manifest::TesselManifest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Paths given on the command line, or the manifest's sources.
pub fn model_paths(
    project_dir: &Path,
    manifest: Option<&TesselManifest>,
    paths: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    if !paths.is_empty() {
        return Ok(paths.to_vec());
    }
    let sources = manifest
        .map(|m| m.source_paths(project_dir))
        .unwrap_or_default();
    if sources.is_empty() {
        bail!("no model sources given (pass paths or set [model] sources in tessel.toml)");
    }
    Ok(sources)
}

/// Load and assemble every path with `engine`.
pub fn assemble(paths: &[PathBuf], engine: ValidationEngine) -> Result<ValidatedResult> {
    let mut assembler = ModelAssembler::new().with_engine(engine);
    for path in paths {
        assembler
            .add_path(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    Ok(assembler.assemble()?)
}

/// Assemble with the default engine and require a valid model.
pub fn assemble_valid(paths: &[PathBuf]) -> Result<Assembled> {
    let result = assemble(paths, ValidationEngine::new())?;
    Ok(result.into_result()?)
}
