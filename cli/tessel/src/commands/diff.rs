//! `tessel diff`: check a new model snapshot against an old one.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tessel_diff::diff;

use super::{assemble_valid, OutputFormat};

pub fn run(old: &Path, new: &Path, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let old_model = assemble_valid(&[old.to_path_buf()])
        .with_context(|| format!("assembling old model {}", old.display()))?;
    let new_model = assemble_valid(&[new.to_path_buf()])
        .with_context(|| format!("assembling new model {}", new.display()))?;
    let report = diff(&old_model.model, &new_model.model);

    match format {
        OutputFormat::Text => {
            if report.is_empty() {
                writeln!(out, "No backward-compatibility issues.")?;
            }
            for event in report.events() {
                writeln!(out, "{event}")?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
    }

    if report.has_errors() {
        bail!("new model breaks backward compatibility");
    }
    Ok(())
}
