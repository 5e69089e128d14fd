use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::Context;
use crate::error::Result;

/// Caller-facing release toggles. Serialized field-by-field into the initial
/// [`Context`]; the release type lands under the `type` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseOptions {
    pub lint: bool,
    pub test: bool,
    pub build: bool,
    pub contributors: bool,
    pub bump: bool,
    pub changelog: bool,
    pub ghrelease: bool,
    pub publish: bool,
    #[serde(rename = "type")]
    pub release_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghtoken: Option<String>,
    pub project_dir: PathBuf,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            lint: true,
            test: true,
            build: true,
            contributors: true,
            bump: true,
            changelog: true,
            ghrelease: true,
            publish: true,
            release_type: "patch".to_string(),
            preid: None,
            ghtoken: None,
            project_dir: PathBuf::from("."),
        }
    }
}

impl Context {
    pub fn from_options(options: &ReleaseOptions) -> Result<Self> {
        Self::from_serialize(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_seed_one_key_per_field() {
        let options = ReleaseOptions {
            release_type: "minor".to_string(),
            ghtoken: Some("t0k".to_string()),
            project_dir: PathBuf::from("/work/app"),
            ..Default::default()
        };

        let ctx = Context::from_options(&options).unwrap();

        for flag in [
            "lint",
            "test",
            "build",
            "contributors",
            "bump",
            "changelog",
            "ghrelease",
            "publish",
        ] {
            assert!(ctx.flag(flag), "{} should be enabled", flag);
        }
        assert_eq!(ctx.str("type"), Some("minor"));
        assert_eq!(ctx.str("ghtoken"), Some("t0k"));
        assert_eq!(ctx.str("project_dir"), Some("/work/app"));
        assert!(ctx.get("preid").is_none());
        assert!(ctx.get("release_type").is_none());
    }
}
