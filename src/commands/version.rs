use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use relman::config::ReleaseConfig;
use relman::io;
use relman::manifest::{Manifest, ManifestKind};
use relman::version::{self, ReleaseType};

use super::CmdResult;

#[derive(Args)]
pub struct VersionArgs {
    #[command(subcommand)]
    command: VersionCommand,
}

#[derive(Subcommand)]
enum VersionCommand {
    /// Show the manifest version
    Show {
        /// Project directory
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Bump the manifest version without committing
    Bump {
        /// Release type: major, minor, patch, premajor, preminor, prepatch, prerelease
        release_type: String,

        /// Prerelease identifier (e.g. rc, beta)
        #[arg(long)]
        preid: Option<String>,

        /// Preview the new version without writing the manifest
        #[arg(long)]
        dry_run: bool,

        /// Project directory
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum VersionOutput {
    Show(VersionShowOutput),
    Bump(VersionBumpOutput),
}

#[derive(Serialize)]
pub struct VersionShowOutput {
    command: String,
    manifest: String,
    kind: ManifestKind,
    version: String,
    prerelease: bool,
}

#[derive(Serialize)]
pub struct VersionBumpOutput {
    command: String,
    manifest: String,
    release_type: ReleaseType,
    old_version: String,
    new_version: String,
    dry_run: bool,
}

fn load_manifest(path: &Path) -> relman::Result<Manifest> {
    let dir = io::expand_path(path);
    let config = ReleaseConfig::load(&dir)?;
    Manifest::load(&config.manifest_path(&dir)?)
}

pub fn run(args: VersionArgs) -> CmdResult<VersionOutput> {
    match args.command {
        VersionCommand::Show { path } => {
            let manifest = load_manifest(&path)?;
            let version = manifest.version()?;

            Ok((
                VersionOutput::Show(VersionShowOutput {
                    command: "version.show".to_string(),
                    manifest: manifest.path().display().to_string(),
                    kind: manifest.kind(),
                    prerelease: version::is_prerelease(&version),
                    version,
                }),
                0,
            ))
        }
        VersionCommand::Bump {
            release_type,
            preid,
            dry_run,
            path,
        } => {
            let release_type: ReleaseType = release_type.parse()?;
            let mut manifest = load_manifest(&path)?;
            let old_version = manifest.version()?;
            let new_version = version::increment(&old_version, release_type, preid.as_deref())?;

            if !dry_run {
                manifest.set_version(&new_version)?;
                manifest.save()?;
                relman::log_status!("version", "v{} -> v{}", old_version, new_version);
            }

            Ok((
                VersionOutput::Bump(VersionBumpOutput {
                    command: "version.bump".to_string(),
                    manifest: manifest.path().display().to_string(),
                    release_type,
                    old_version,
                    new_version,
                    dry_run,
                }),
                0,
            ))
        }
    }
}
