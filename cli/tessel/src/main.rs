//! Tessel CLI: validate, query and compare Tessel models.

mod commands;
mod manifest;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::OutputFormat;
use manifest::{FailOn, TesselManifest};

#[derive(Parser)]
#[command(name = "tessel", version, about = "Tessel interface model tools")]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a model and report validation events
    Validate {
        /// Model files or directories (default: [model] sources)
        paths: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
        /// Lowest severity that fails validation
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,
    },
    /// Print the shapes a selector matches
    Select {
        /// Selector expression, e.g. `structure > member [trait|required]`
        selector: String,
        /// Model files or directories (default: [model] sources)
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Check a new model for backward-incompatible changes
    Diff {
        /// Old model file or directory
        old: PathBuf,
        /// New model file or directory
        new: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Show how a member's nullability resolves
    Nullability {
        /// Member id, e.g. `example.weather#City$name`
        member: String,
        /// Model files or directories (default: [model] sources)
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Validate {
            paths,
            format,
            fail_on,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::validate::run(
                &project_dir,
                manifest.as_ref(),
                &paths,
                format,
                fail_on,
                &mut out,
            )
        }

        Commands::Select {
            selector,
            paths,
            format,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::select::run(
                &project_dir,
                manifest.as_ref(),
                &selector,
                &paths,
                format,
                &mut out,
            )
        }

        Commands::Diff { old, new, format } => commands::diff::run(&old, &new, format, &mut out),

        Commands::Nullability {
            member,
            paths,
            format,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::nullability::run(
                &project_dir,
                manifest.as_ref(),
                &member,
                &paths,
                format,
                &mut out,
            )
        }
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<TesselManifest>, Option<PathBuf>)> {
    match TesselManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use std::fs;

    use super::*;

    const WEATHER: &str = r#"{
        "smithy": "2.0",
        "shapes": {
            "example.weather#City": {
                "type": "structure",
                "members": {
                    "name": {
                        "target": "smithy.api#String",
                        "traits": { "smithy.api#required": {} }
                    },
                    "population": {
                        "target": "smithy.api#Long",
                        "traits": { "smithy.api#default": 0 }
                    }
                }
            }
        }
    }"#;

    /// A project directory with a manifest and one model file.
    fn project(manifest: &str, model: &str) -> (tempfile::TempDir, TesselManifest, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tessel.toml"), manifest).unwrap();
        fs::create_dir(dir.path().join("model")).unwrap();
        fs::write(dir.path().join("model").join("weather.json"), model).unwrap();
        let (manifest, root) = TesselManifest::find_and_load(dir.path()).unwrap().unwrap();
        (dir, manifest, root)
    }

    const MANIFEST: &str = "[project]\nname = \"weather\"\n\n[model]\nsources = [\"model\"]\n";

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn validate_uses_manifest_sources() {
        let (_dir, manifest, root) = project(MANIFEST, WEATHER);
        let mut out = Vec::new();
        commands::validate::run(&root, Some(&manifest), &[], OutputFormat::Text, None, &mut out)
            .unwrap();
        let text = output(out);
        assert!(text.starts_with("Project: weather 0.1.0\n"));
        assert!(text.contains("=== Validation Report ==="));
        assert!(text.contains("No events."));
    }

    #[test]
    fn validate_json_and_failures() {
        let broken = r#"{
            "smithy": "2.0",
            "shapes": {
                "example.weather#City": {
                    "type": "structure",
                    "members": { "name": { "target": "example.weather#Missing" } }
                }
            }
        }"#;
        let (_dir, manifest, root) = project(MANIFEST, broken);
        let mut out = Vec::new();
        let err = commands::validate::run(
            &root,
            Some(&manifest),
            &[],
            OutputFormat::Json,
            None,
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("validation failed"));

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["events"][0]["id"], "UnresolvedShape");
    }

    #[test]
    fn fail_on_danger_from_manifest_and_flag() {
        let dangerous = r#"{
            "smithy": "2.0",
            "metadata": {
                "validators": [{
                    "name": "EmitEachSelector",
                    "id": "NoCities",
                    "configuration": { "selector": "[id|name = City]" }
                }]
            },
            "shapes": { "example.weather#City": { "type": "structure" } }
        }"#;
        let strict = format!("{MANIFEST}\n[validation]\nfail_on = \"danger\"\n");
        let (_dir, manifest, root) = project(&strict, dangerous);
        let mut out = Vec::new();
        assert!(commands::validate::run(
            &root,
            Some(&manifest),
            &[],
            OutputFormat::Text,
            None,
            &mut out
        )
        .is_err());
        assert!(output(out).contains("NoCities"));

        let mut out = Vec::new();
        commands::validate::run(
            &root,
            Some(&manifest),
            &[],
            OutputFormat::Text,
            Some(FailOn::Error),
            &mut out,
        )
        .unwrap();
    }

    #[test]
    fn disabled_events_are_dropped() {
        let ambiguous = r#"{
            "smithy": "2.0",
            "shapes": {
                "example.weather#Count": { "type": "integer" },
                "example.weather#City": {
                    "type": "structure",
                    "members": { "count": { "target": "example.weather#Count" } }
                }
            }
        }"#;
        let manifest_text = format!("{MANIFEST}\n[validation]\ndisabled = [\"AmbiguousNullability\"]\n");
        let (_dir, manifest, root) = project(&manifest_text, ambiguous);
        let mut out = Vec::new();
        commands::validate::run(&root, Some(&manifest), &[], OutputFormat::Text, None, &mut out)
            .unwrap();
        assert!(!output(out).contains("AmbiguousNullability"));
    }

    #[test]
    fn select_prints_matching_ids() {
        let (_dir, manifest, root) = project(MANIFEST, WEATHER);
        let mut out = Vec::new();
        commands::select::run(
            &root,
            Some(&manifest),
            "structure > member [trait|required]",
            &[],
            OutputFormat::Text,
            &mut out,
        )
        .unwrap();
        assert_eq!(output(out), "example.weather#City$name\n");

        let mut out = Vec::new();
        let err = commands::select::run(
            &root,
            Some(&manifest),
            "structure >[",
            &[],
            OutputFormat::Text,
            &mut out,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("parsing selector"));
    }

    #[test]
    fn nullability_reports_both_modes() {
        let (_dir, manifest, root) = project(MANIFEST, WEATHER);
        let mut out = Vec::new();
        commands::nullability::run(
            &root,
            Some(&manifest),
            "example.weather#City$population",
            &[],
            OutputFormat::Text,
            &mut out,
        )
        .unwrap();
        let text = output(out);
        assert!(text.contains("default:           0"));
        assert!(text.contains("nullable (server): no"));

        let mut out = Vec::new();
        commands::nullability::run(
            &root,
            Some(&manifest),
            "example.weather#City$name",
            &[],
            OutputFormat::Json,
            &mut out,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["record"]["isRequired"], true);
        assert_eq!(json["nullable"]["client"], false);

        let mut out = Vec::new();
        assert!(commands::nullability::run(
            &root,
            Some(&manifest),
            "example.weather#City$missing",
            &[],
            OutputFormat::Text,
            &mut out,
        )
        .is_err());
    }

    #[test]
    fn diff_rejects_dropping_required() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        fs::write(&old, WEATHER).unwrap();
        fs::write(&new, WEATHER.replace(r#""smithy.api#required": {}"#, "")).unwrap();

        let mut out = Vec::new();
        commands::diff::run(&old, &old, OutputFormat::Text, &mut out).unwrap();
        assert_eq!(output(out), "No backward-compatibility issues.\n");

        let mut out = Vec::new();
        let err = commands::diff::run(&old, &new, OutputFormat::Text, &mut out).unwrap_err();
        assert!(err.to_string().contains("backward compatibility"));
        assert!(output(out).contains("ChangedNullability"));
    }

    #[test]
    fn no_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = commands::validate::run(dir.path(), None, &[], OutputFormat::Text, None, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("no model sources"));
    }
}
