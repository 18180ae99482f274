//! `tessel validate`: assemble a model and report validation events.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tessel_core::Severity;
use tessel_validate::ValidationEngine;

use super::{assemble, model_paths, OutputFormat};
use crate::manifest::{FailOn, TesselManifest};

pub fn run(
    project_dir: &Path,
    manifest: Option<&TesselManifest>,
    paths: &[PathBuf],
    format: OutputFormat,
    fail_on: Option<FailOn>,
    out: &mut impl Write,
) -> Result<()> {
    let paths = model_paths(project_dir, manifest, paths)?;

    let mut engine = ValidationEngine::new();
    for id in manifest.iter().flat_map(|m| &m.validation.disabled) {
        engine = engine.disable(id.clone());
    }
    let result = assemble(&paths, engine)?;
    let report = result.report();

    match format {
        OutputFormat::Text => {
            if let Some(project) = manifest.map(|m| &m.project) {
                writeln!(out, "Project: {} {}", project.name, project.version)?;
            }
            write!(out, "{report}")?;
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(report)?)?,
    }

    // Threshold: CLI flag > manifest > ERROR
    let threshold = fail_on
        .or_else(|| manifest.and_then(|m| m.validation.fail_on))
        .map_or(Severity::Error, FailOn::severity);
    if !result.is_valid() || report.fails(threshold) {
        let summary = report.summary();
        bail!(
            "validation failed: {} error(s), {} danger event(s)",
            summary.errors,
            summary.dangers
        );
    }
    Ok(())
}
