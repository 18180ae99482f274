//! `tessel.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tessel_core::Severity;

pub const MANIFEST_FILE: &str = "tessel.toml";

/// The top-level manifest structure for a Tessel project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesselManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Where the model sources live.
    #[serde(default)]
    pub model: ModelConfig,
    /// Validation policy.
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// JSON AST files or directories, relative to the manifest.
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Lowest severity that fails `tessel validate`.
    #[serde(default)]
    pub fail_on: Option<FailOn>,
    /// Event ids dropped from reports. ERROR events are never dropped.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Severity threshold at which validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    Danger,
    Error,
}

impl FailOn {
    pub fn severity(self) -> Severity {
        match self {
            FailOn::Danger => Severity::Danger,
            FailOn::Error => Severity::Error,
        }
    }
}

impl TesselManifest {
    /// Search upward from `start_dir` for a `tessel.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: TesselManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing tessel.toml")
    }

    /// Model sources resolved against the project directory.
    pub fn source_paths(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.model
            .sources
            .iter()
            .map(|source| project_dir.join(source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = TesselManifest::from_str(
            r#"
[project]
name = "weather"
version = "2.1.0"

[model]
sources = ["model", "extra/shared.json"]

[validation]
fail_on = "danger"
disabled = ["AmbiguousNullability"]
"#,
        )
        .unwrap();
        assert_eq!(manifest.project.name, "weather");
        assert_eq!(manifest.project.version, "2.1.0");
        assert_eq!(manifest.validation.fail_on, Some(FailOn::Danger));
        assert_eq!(manifest.validation.disabled, vec!["AmbiguousNullability"]);
        assert_eq!(
            manifest.source_paths(Path::new("/project")),
            vec![
                PathBuf::from("/project/model"),
                PathBuf::from("/project/extra/shared.json"),
            ]
        );
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = TesselManifest::from_str("[project]\nname = \"minimal\"\n").unwrap();
        assert_eq!(manifest.project.version, "0.1.0");
        assert!(manifest.model.sources.is_empty());
        assert!(manifest.validation.fail_on.is_none());
    }

    #[test]
    fn rejects_unknown_threshold() {
        let err = TesselManifest::from_str(
            "[project]\nname = \"x\"\n[validation]\nfail_on = \"warning\"\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn finds_manifest_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[project]\nname = \"up\"\n").unwrap();
        let nested = dir.path().join("model").join("nested");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found) = TesselManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "up");
        assert_eq!(found, dir.path());
    }
}
