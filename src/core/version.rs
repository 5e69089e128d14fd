use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Semver increment kind, named the way npm names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl ReleaseType {
    pub fn all() -> &'static [ReleaseType] {
        &[
            ReleaseType::Major,
            ReleaseType::Minor,
            ReleaseType::Patch,
            ReleaseType::Premajor,
            ReleaseType::Preminor,
            ReleaseType::Prepatch,
            ReleaseType::Prerelease,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Premajor => "premajor",
            ReleaseType::Preminor => "preminor",
            ReleaseType::Prepatch => "prepatch",
            ReleaseType::Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "type",
                    format!("Unknown release type '{}'", s),
                    Some(s.to_string()),
                    Some(Self::all().iter().map(|t| t.as_str().to_string()).collect()),
                )
            })
    }
}

pub fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version.trim()).map_err(|e| {
        Error::validation_invalid_argument(
            "version",
            format!("Invalid version '{}': {}", version, e),
            Some(version.to_string()),
            None,
        )
    })
}

pub fn is_prerelease(version: &str) -> bool {
    Version::parse(version.trim())
        .map(|v| !v.pre.is_empty())
        .unwrap_or(false)
}

/// Compute the next version.
///
/// Follows npm's rules: releasing from a prerelease drops the prerelease
/// without bumping when the target component is already in place
/// (`1.3.0-rc.1` + minor = `1.3.0`). `preid` names the prerelease
/// identifier for the `pre*` kinds. Build metadata is always dropped.
pub fn increment(version: &str, release_type: ReleaseType, preid: Option<&str>) -> Result<String> {
    let mut v = parse_version(version)?;
    let was_pre = !v.pre.is_empty();
    v.build = BuildMetadata::EMPTY;

    match release_type {
        ReleaseType::Major => {
            if !(was_pre && v.minor == 0 && v.patch == 0) {
                v.major += 1;
            }
            v.minor = 0;
            v.patch = 0;
            v.pre = Prerelease::EMPTY;
        }
        ReleaseType::Minor => {
            if !(was_pre && v.patch == 0) {
                v.minor += 1;
            }
            v.patch = 0;
            v.pre = Prerelease::EMPTY;
        }
        ReleaseType::Patch => {
            if !was_pre {
                v.patch += 1;
            }
            v.pre = Prerelease::EMPTY;
        }
        ReleaseType::Premajor => {
            v.major += 1;
            v.minor = 0;
            v.patch = 0;
            v.pre = first_prerelease(preid)?;
        }
        ReleaseType::Preminor => {
            v.minor += 1;
            v.patch = 0;
            v.pre = first_prerelease(preid)?;
        }
        ReleaseType::Prepatch => {
            v.patch += 1;
            v.pre = first_prerelease(preid)?;
        }
        ReleaseType::Prerelease => {
            if was_pre {
                v.pre = next_prerelease(&v.pre, preid)?;
            } else {
                v.patch += 1;
                v.pre = first_prerelease(preid)?;
            }
        }
    }

    Ok(v.to_string())
}

fn first_prerelease(preid: Option<&str>) -> Result<Prerelease> {
    match preid {
        Some(id) => build_prerelease(&format!("{}.0", id)),
        None => build_prerelease("0"),
    }
}

/// Bump the last numeric identifier, or append `.0` when there is none.
/// A different `preid` restarts the series at `<preid>.0`.
fn next_prerelease(current: &Prerelease, preid: Option<&str>) -> Result<Prerelease> {
    let mut parts: Vec<String> = current.as_str().split('.').map(str::to_string).collect();

    if let Some(id) = preid {
        if parts.first().map(String::as_str) != Some(id) {
            return first_prerelease(preid);
        }
    }

    match parts.iter().rposition(|p| p.parse::<u64>().is_ok()) {
        Some(idx) => {
            let n: u64 = parts[idx].parse().unwrap_or(0);
            parts[idx] = (n + 1).to_string();
        }
        None => parts.push("0".to_string()),
    }

    build_prerelease(&parts.join("."))
}

fn build_prerelease(value: &str) -> Result<Prerelease> {
    Prerelease::new(value).map_err(|e| {
        Error::validation_invalid_argument(
            "preid",
            format!("Invalid prerelease identifier '{}': {}", value, e),
            Some(value.to_string()),
            None,
        )
    })
}
