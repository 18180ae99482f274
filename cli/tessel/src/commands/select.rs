//! `tessel select`: print the shapes a selector matches.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tessel_selector::Selector;

use super::{assemble_valid, model_paths, OutputFormat};
use crate::manifest::TesselManifest;

pub fn run(
    project_dir: &Path,
    manifest: Option<&TesselManifest>,
    expression: &str,
    paths: &[PathBuf],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let selector =
        Selector::parse(expression).with_context(|| format!("parsing selector `{expression}`"))?;
    let assembled = assemble_valid(&model_paths(project_dir, manifest, paths)?)?;

    match format {
        OutputFormat::Text => {
            for id in selector.select_ids(&assembled.model) {
                writeln!(out, "{id}")?;
            }
        }
        OutputFormat::Json => {
            let matches = selector.evaluate(&assembled.model);
            writeln!(out, "{}", serde_json::to_string_pretty(&matches)?)?;
        }
    }
    Ok(())
}
