use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::git;
use crate::manifest::Manifest;

pub const COMMIT_MESSAGE: &str = "chore: update contributors";

#[derive(Debug, Clone, Serialize)]
pub struct ContributorsUpdate {
    pub contributors: Vec<String>,
    pub updated: bool,
}

/// Rewrite the manifest's contributors from git history and commit the
/// change. Nothing is written or committed when the list is unchanged.
pub fn update(project_dir: &Path, manifest: &mut Manifest) -> Result<ContributorsUpdate> {
    let contributors = git::get_authors(project_dir)?;
    let updated = manifest.set_contributors(&contributors)?;

    if updated {
        manifest.save()?;
        let file = manifest
            .path()
            .strip_prefix(project_dir)
            .unwrap_or(manifest.path())
            .to_string_lossy()
            .to_string();
        git::add(project_dir, &[&file])?;
        git::commit(project_dir, COMMIT_MESSAGE)?;
    }

    Ok(ContributorsUpdate {
        contributors,
        updated,
    })
}
