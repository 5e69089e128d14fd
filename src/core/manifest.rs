//! Package manifest reader/writer.
//!
//! Reads and rewrites the version field of `package.json` or `Cargo.toml`
//! without disturbing the rest of the file: package.json keeps its key order,
//! Cargo.toml is edited line-wise so comments and layout survive.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Npm,
    Cargo,
}

impl ManifestKind {
    pub fn all() -> &'static [ManifestKind] {
        &[ManifestKind::Npm, ManifestKind::Cargo]
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ManifestKind::Npm => "package.json",
            ManifestKind::Cargo => "Cargo.toml",
        }
    }

    pub fn detect(path: &Path) -> Result<Self> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.file_name() == name)
            .ok_or_else(|| Error::manifest_unsupported(path.display().to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    kind: ManifestKind,
    content: String,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let kind = ManifestKind::detect(path)?;
        let content = io::read_file_optional(path, "read manifest")?
            .ok_or_else(|| Error::manifest_not_found(path.display().to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            content,
        })
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Result<String> {
        match self.kind {
            ManifestKind::Npm => self
                .json()?
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| self.invalid("missing \"version\" field")),
            ManifestKind::Cargo => {
                let table = self.toml()?;
                let version = table
                    .get("package")
                    .and_then(|p| p.get("version"))
                    .ok_or_else(|| self.invalid("missing [package] version"))?;
                version
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid("[package] version is inherited or not a string"))
            }
        }
    }

    /// Repository URL declared in the manifest, if any.
    pub fn repository_url(&self) -> Option<String> {
        match self.kind {
            ManifestKind::Npm => {
                let json = self.json().ok()?;
                match json.get("repository")? {
                    Value::String(url) => Some(url.clone()),
                    Value::Object(repo) => {
                        repo.get("url").and_then(Value::as_str).map(str::to_string)
                    }
                    _ => None,
                }
            }
            ManifestKind::Cargo => self
                .toml()
                .ok()?
                .get("package")?
                .get("repository")?
                .as_str()
                .map(str::to_string),
        }
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        match self.kind {
            ManifestKind::Npm => {
                let mut json = self.json()?;
                let object = json
                    .as_object_mut()
                    .ok_or_else(|| self.invalid("top level is not an object"))?;
                object.insert("version".to_string(), Value::String(version.to_string()));
                self.content = to_pretty_json(&json)?;
                Ok(())
            }
            ManifestKind::Cargo => {
                self.content = replace_package_version(&self.content, version)
                    .ok_or_else(|| self.invalid("no version line in [package]"))?;
                Ok(())
            }
        }
    }

    /// Replace the contributors list. Returns whether the content changed.
    pub fn set_contributors(&mut self, contributors: &[String]) -> Result<bool> {
        let mut json = self.require_npm("contributors")?;
        let object = json
            .as_object_mut()
            .ok_or_else(|| self.invalid("top level is not an object"))?;
        object.insert(
            "contributors".to_string(),
            Value::Array(contributors.iter().cloned().map(Value::String).collect()),
        );

        let updated = to_pretty_json(&json)?;
        let changed = updated != self.content;
        self.content = updated;
        Ok(changed)
    }

    pub fn save(&self) -> Result<()> {
        io::write_file_atomic(&self.path, &self.content, "write manifest")
    }

    fn require_npm(&self, field: &str) -> Result<Value> {
        if self.kind != ManifestKind::Npm {
            return Err(Error::manifest_invalid(
                self.path.display().to_string(),
                format!("\"{}\" is only supported for package.json", field),
            ));
        }
        self.json()
    }

    fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.content).map_err(|e| self.invalid(e.to_string()))
    }

    fn toml(&self) -> Result<toml::Table> {
        toml::from_str(&self.content).map_err(|e| self.invalid(e.to_string()))
    }

    fn invalid(&self, problem: impl Into<String>) -> Error {
        Error::manifest_invalid(self.path.display().to_string(), problem)
    }
}

fn to_pretty_json(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize manifest".to_string())))?;
    out.push('\n');
    Ok(out)
}

/// Rewrite the `version = "..."` line inside `[package]`, leaving everything
/// else byte-for-byte intact.
fn replace_package_version(content: &str, version: &str) -> Option<String> {
    let version_line = Regex::new(r#"^(\s*version\s*=\s*)"[^"]*"(.*)$"#).ok()?;
    let mut in_package = false;
    let mut replaced = false;
    let mut lines = Vec::new();

    for line in content.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_package = trimmed == "[package]";
        }

        if in_package && !replaced {
            if let Some(caps) = version_line.captures(line) {
                lines.push(format!("{}\"{}\"{}", &caps[1], version, &caps[2]));
                replaced = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }

    replaced.then(|| lines.join("\n"))
}
