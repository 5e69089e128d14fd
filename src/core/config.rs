use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::manifest::ManifestKind;
use crate::utils::io;

pub const CONFIG_FILE: &str = "relman.json";

/// Project release configuration, read from `relman.json` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Manifest holding the version. Detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    #[serde(default = "default_changelog")]
    pub changelog: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch to push. The current branch when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub github: GithubConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            changelog: default_changelog(),
            remote: default_remote(),
            branch: None,
            tag_prefix: default_tag_prefix(),
            commands: CommandsConfig::default(),
            github: GithubConfig::default(),
        }
    }
}

/// Shell commands for the external tool steps. Unset entries fall back to
/// the manifest kind's conventional command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `owner/name`. Parsed from the push remote when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repo: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
    Lint,
    Test,
    Build,
    Publish,
}

impl CommandsConfig {
    pub fn get(&self, tool: ToolCommand) -> Option<&str> {
        match tool {
            ToolCommand::Lint => self.lint.as_deref(),
            ToolCommand::Test => self.test.as_deref(),
            ToolCommand::Build => self.build.as_deref(),
            ToolCommand::Publish => self.publish.as_deref(),
        }
    }
}

fn default_changelog() -> String {
    "CHANGELOG.md".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Conventional command for a tool step given the manifest kind. npm
/// prereleases publish under the `next` dist-tag.
fn default_command(kind: ManifestKind, tool: ToolCommand, prerelease: bool) -> String {
    let base = match (kind, tool) {
        (ManifestKind::Npm, ToolCommand::Lint) => "npm run lint",
        (ManifestKind::Npm, ToolCommand::Test) => "npm test",
        (ManifestKind::Npm, ToolCommand::Build) => "npm run build",
        (ManifestKind::Npm, ToolCommand::Publish) => "npm publish",
        (ManifestKind::Cargo, ToolCommand::Lint) => "cargo clippy -- -D warnings",
        (ManifestKind::Cargo, ToolCommand::Test) => "cargo test",
        (ManifestKind::Cargo, ToolCommand::Build) => "cargo build --release",
        (ManifestKind::Cargo, ToolCommand::Publish) => "cargo publish",
    };

    if kind == ManifestKind::Npm && tool == ToolCommand::Publish && prerelease {
        format!("{} --tag next", base)
    } else {
        base.to_string()
    }
}

impl ReleaseConfig {
    /// Load `relman.json` from a project directory. A missing file yields defaults.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE);
        let Some(content) = io::read_file_optional(&path, "read release config")? else {
            return Ok(Self::default());
        };

        serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
    }

    /// Absolute manifest path: configured, else the first known manifest present.
    pub fn manifest_path(&self, project_dir: &Path) -> Result<PathBuf> {
        if let Some(file) = &self.manifest {
            return Ok(project_dir.join(file));
        }

        ManifestKind::all()
            .iter()
            .map(|kind| project_dir.join(kind.file_name()))
            .find(|path| path.exists())
            .ok_or_else(|| Error::manifest_not_found(project_dir.display().to_string()))
    }

    pub fn changelog_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.changelog)
    }

    pub fn tag_name(&self, version: &str) -> String {
        format!("{}{}", self.tag_prefix, version)
    }

    /// Command for a tool step: configured, else the manifest kind's default.
    ///
    /// `kind` is only called when nothing is configured, so a project that
    /// configures every command needs no manifest for these steps.
    pub fn command_for(
        &self,
        tool: ToolCommand,
        prerelease: bool,
        kind: impl FnOnce() -> Result<ManifestKind>,
    ) -> Result<String> {
        match self.commands.get(tool) {
            Some(command) => Ok(command.to_string()),
            None => Ok(default_command(kind()?, tool, prerelease)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ReleaseConfig::load(dir.path()).unwrap();
        assert_eq!(config.changelog, "CHANGELOG.md");
        assert_eq!(config.remote, "origin");
        assert_eq!(config.tag_prefix, "v");
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn partial_file_keeps_defaults_for_unset_keys() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"remote": "upstream", "commands": {"test": "make check"}}"#,
        )
        .unwrap();

        let config = ReleaseConfig::load(dir.path()).unwrap();

        assert_eq!(config.remote, "upstream");
        assert_eq!(config.changelog, "CHANGELOG.md");
        let no_manifest = || Err(Error::manifest_not_found("package.json"));
        assert_eq!(
            config.command_for(ToolCommand::Test, false, no_manifest).unwrap(),
            "make check"
        );
        assert_eq!(
            config
                .command_for(ToolCommand::Lint, false, || Ok(ManifestKind::Npm))
                .unwrap(),
            "npm run lint"
        );
    }

    #[test]
    fn default_publish_depends_on_kind_and_prerelease() {
        let config = ReleaseConfig::default();
        let publish = |kind: ManifestKind, prerelease: bool| {
            config
                .command_for(ToolCommand::Publish, prerelease, || Ok(kind))
                .unwrap()
        };

        assert_eq!(publish(ManifestKind::Npm, false), "npm publish");
        assert_eq!(publish(ManifestKind::Npm, true), "npm publish --tag next");
        assert_eq!(publish(ManifestKind::Cargo, true), "cargo publish");
    }

    #[test]
    fn unconfigured_command_needs_a_manifest() {
        let err = ReleaseConfig::default()
            .command_for(ToolCommand::Build, false, || {
                Err(Error::manifest_not_found("package.json"))
            })
            .unwrap_err();
        assert_eq!(err.code.as_str(), "manifest.not_found");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        let err = ReleaseConfig::load(dir.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }

    #[test]
    fn manifest_path_prefers_package_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nversion = \"0.1.0\"\n").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let path = ReleaseConfig::default().manifest_path(dir.path()).unwrap();
        assert!(path.ends_with("package.json"));
    }

    #[test]
    fn manifest_path_errors_when_nothing_found() {
        let dir = tempdir().unwrap();
        let err = ReleaseConfig::default().manifest_path(dir.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "manifest.not_found");
    }
}
