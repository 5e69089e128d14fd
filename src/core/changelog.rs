//! Changelog generation from conventional commits.
//!
//! Sections are rendered newest-first at the top of the file:
//!
//! ```text
//! <a name="1.3.0"></a>
//! # [1.3.0](https://github.com/acme/app/compare/v1.2.3...v1.3.0) (2026-10-18)
//!
//! ### Features
//!
//! * **cli:** add flag ([abc1234](https://github.com/acme/app/commit/abc1234))
//! ```

use chrono::Local;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::git::{self, strip_conventional_prefix, CommitCategory, CommitInfo};
use crate::utils::io;

const BREAKING_HEADING: &str = "BREAKING CHANGES";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotesSection {
    pub heading: &'static str,
    pub entries: Vec<String>,
}

/// Output of [`generate`].
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedChangelog {
    pub version: String,
    pub notes: String,
    pub commit_count: usize,
}

/// Group commits into changelog sections. Headings with no entries are dropped.
pub fn group_commits(commits: &[CommitInfo], repo_url: Option<&str>) -> Vec<NotesSection> {
    let headings = [
        CommitCategory::Fix,
        CommitCategory::Feature,
        CommitCategory::Perf,
    ];

    let mut sections: Vec<NotesSection> = headings
        .iter()
        .filter_map(|category| {
            let entries: Vec<String> = commits
                .iter()
                .filter(|c| c.category == *category)
                .map(|c| render_entry(c, repo_url))
                .collect();
            let heading = category.changelog_heading()?;
            (!entries.is_empty()).then_some(NotesSection { heading, entries })
        })
        .collect();

    let breaking: Vec<String> = commits
        .iter()
        .filter(|c| c.breaking)
        .map(|c| format!("* {}", strip_conventional_prefix(&c.subject)))
        .collect();
    if !breaking.is_empty() {
        sections.push(NotesSection {
            heading: BREAKING_HEADING,
            entries: breaking,
        });
    }

    sections
}

fn render_entry(commit: &CommitInfo, repo_url: Option<&str>) -> String {
    let scope = commit
        .scope
        .as_deref()
        .map(|s| format!("**{}:** ", s))
        .unwrap_or_default();
    let link = match repo_url {
        Some(url) => format!("[{}]({}/commit/{})", commit.hash, url, commit.hash),
        None => commit.hash.clone(),
    };
    format!(
        "* {}{} ({})",
        scope,
        strip_conventional_prefix(&commit.subject),
        link
    )
}

pub fn compare_url(repo_url: &str, from_tag: &str, to_tag: &str) -> String {
    format!("{}/compare/{}...{}", repo_url, from_tag, to_tag)
}

pub fn render_header(version: &str, compare_url: Option<&str>, date: &str) -> String {
    let title = match compare_url {
        Some(url) => format!("[{}]({})", version, url),
        None => version.to_string(),
    };
    format!("<a name=\"{}\"></a>\n# {} ({})", version, title, date)
}

pub fn render_notes(sections: &[NotesSection]) -> String {
    sections
        .iter()
        .map(|s| format!("### {}\n\n{}\n", s.heading, s.entries.join("\n")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Put a new section on top of the existing changelog content.
pub fn prepend(existing: &str, header: &str, notes: &str) -> String {
    let mut out = format!("{}\n\n{}", header, notes);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    let rest = existing.trim_start();
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
    }
    out
}

/// Body of the newest version section, without its anchor or heading.
pub fn extract_latest_notes(content: &str) -> Option<String> {
    let version_heading = Regex::new(r"^#{1,2} \[?v?\d+\.\d+").ok()?;
    let lines: Vec<&str> = content.lines().collect();

    let start = lines.iter().position(|l| version_heading.is_match(l))?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("<a name=") || version_heading.is_match(l))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let body = lines[start + 1..end].join("\n").trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// Render the section for `version` from commits since `previous_tag` and
/// prepend it to the changelog file, creating the file when missing.
pub fn generate(
    project_dir: &Path,
    changelog_path: &Path,
    version: &str,
    previous_tag: Option<&str>,
    new_tag: &str,
    repo_url: Option<&str>,
) -> Result<GeneratedChangelog> {
    let commits = git::get_commits_since_tag(project_dir, previous_tag)?;
    let sections = group_commits(&commits, repo_url);

    let compare = match (repo_url, previous_tag) {
        (Some(url), Some(from)) => Some(compare_url(url, from, new_tag)),
        _ => None,
    };
    let date = Local::now().format("%Y-%m-%d").to_string();
    let header = render_header(version, compare.as_deref(), &date);
    let notes = render_notes(&sections);

    let existing = io::read_file_optional(changelog_path, "read changelog")?.unwrap_or_default();
    io::write_file_atomic(
        changelog_path,
        &prepend(&existing, &header, &notes),
        "write changelog",
    )?;

    Ok(GeneratedChangelog {
        version: version.to_string(),
        notes: notes.trim_end().to_string(),
        commit_count: commits.len(),
    })
}
