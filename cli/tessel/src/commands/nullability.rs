//! `tessel nullability`: explain how a member resolves.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tessel_core::ShapeId;
use tessel_resolve::CheckMode;

use super::{assemble_valid, model_paths, OutputFormat};
use crate::manifest::TesselManifest;

pub fn run(
    project_dir: &Path,
    manifest: Option<&TesselManifest>,
    member: &str,
    paths: &[PathBuf],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let member_id = ShapeId::parse(member).with_context(|| format!("parsing member id `{member}`"))?;
    let assembled = assemble_valid(&model_paths(project_dir, manifest, paths)?)?;
    let record = assembled
        .nullability
        .get(&member_id)
        .with_context(|| format!("`{member_id}` is not a member of the model"))?;
    let client = record.is_nullable(CheckMode::Client);
    let server = record.is_nullable(CheckMode::Server);

    match format {
        OutputFormat::Text => {
            let yes_no = |b: bool| if b { "yes" } else { "no" };
            let default = record
                .default_value
                .as_ref()
                .map_or_else(|| "none".to_string(), |v| v.to_string());
            writeln!(out, "{member_id}")?;
            writeln!(out, "  context:           {:?}", record.context)?;
            writeln!(out, "  required:          {}", yes_no(record.is_required))?;
            writeln!(out, "  default:           {default}")?;
            writeln!(out, "  client optional:   {}", yes_no(record.is_client_optional))?;
            writeln!(out, "  nullable (client): {}", yes_no(client))?;
            writeln!(out, "  nullable (server): {}", yes_no(server))?;
        }
        OutputFormat::Json => {
            let value = json!({
                "member": member_id,
                "record": record,
                "nullable": { "client": client, "server": server },
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }
    Ok(())
}
