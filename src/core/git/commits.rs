use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use super::git;
use crate::error::Result;
use crate::utils::command;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub category: CommitCategory,
    pub breaking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitCategory {
    Feature,
    Fix,
    Perf,
    Docs,
    Chore,
    Merge,
    Other,
}

impl CommitCategory {
    /// Changelog section heading. None for categories left out of changelogs.
    pub fn changelog_heading(&self) -> Option<&'static str> {
        match self {
            CommitCategory::Feature => Some("Features"),
            CommitCategory::Fix => Some("Bug Fixes"),
            CommitCategory::Perf => Some("Performance Improvements"),
            CommitCategory::Docs
            | CommitCategory::Chore
            | CommitCategory::Merge
            | CommitCategory::Other => None,
        }
    }
}

/// Conventional commit header: `type(scope)!: subject`.
pub struct ConventionalHeader<'a> {
    pub category: CommitCategory,
    pub scope: Option<&'a str>,
    pub breaking: bool,
}

/// Parse a commit subject into a category based on conventional commit format.
/// Falls back to Other if no pattern matches.
pub fn parse_conventional_commit(subject: &str) -> ConventionalHeader<'_> {
    let lower = subject.to_lowercase();

    if lower.starts_with("merge pull request")
        || lower.starts_with("merge branch")
        || lower.starts_with("merge remote-tracking")
    {
        return ConventionalHeader {
            category: CommitCategory::Merge,
            scope: None,
            breaking: false,
        };
    }

    let header = Regex::new(r"^(\w+)(?:\(([^)]*)\))?(!)?: ").ok();
    let Some(caps) = header.as_ref().and_then(|re| re.captures(subject)) else {
        return ConventionalHeader {
            category: CommitCategory::Other,
            scope: None,
            breaking: false,
        };
    };

    let category = match caps[1].to_lowercase().as_str() {
        "feat" => CommitCategory::Feature,
        "fix" => CommitCategory::Fix,
        "perf" => CommitCategory::Perf,
        "docs" => CommitCategory::Docs,
        "chore" => CommitCategory::Chore,
        _ => CommitCategory::Other,
    };

    ConventionalHeader {
        category,
        scope: caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()),
        breaking: caps.get(3).is_some(),
    }
}

/// Strip conventional commit prefix from a subject line.
/// "feat: Add new feature" -> "Add new feature"
/// "fix(scope): Fix bug" -> "Fix bug"
pub fn strip_conventional_prefix(subject: &str) -> &str {
    if let Some(pos) = subject.find(": ") {
        let prefix = &subject[..pos];
        if prefix
            .chars()
            .all(|c| c.is_alphanumeric() || c == '(' || c == ')' || c == '!' || c == '-')
        {
            return &subject[pos + 2..];
        }
    }
    subject
}

/// Get the latest tag reachable from HEAD. None if no tags exist.
pub fn get_latest_tag(dir: &Path) -> Option<String> {
    command::run_in_optional(dir, "git", &["describe", "--tags", "--abbrev=0"])
}

/// Commits since a tag (or all commits if tag is None), newest first.
pub fn get_commits_since_tag(dir: &Path, tag: Option<&str>) -> Result<Vec<CommitInfo>> {
    let range = tag
        .map(|t| format!("{}..HEAD", t))
        .unwrap_or_else(|| "HEAD".to_string());
    let format = format!("--format=%h{}%s{}%b{}", FIELD_SEP, FIELD_SEP, RECORD_SEP);
    let stdout = git(dir, &["log", &range, &format])?;

    let commits = stdout
        .split(RECORD_SEP)
        .filter_map(|record| {
            let mut fields = record.trim_start_matches('\n').splitn(3, FIELD_SEP);
            let hash = fields.next()?.trim();
            let subject = fields.next()?.trim();
            let body = fields.next().unwrap_or("");
            if hash.is_empty() {
                return None;
            }

            let header = parse_conventional_commit(subject);
            Some(CommitInfo {
                hash: hash.to_string(),
                subject: subject.to_string(),
                scope: header.scope.map(str::to_string),
                category: header.category,
                breaking: header.breaking || body.contains("BREAKING CHANGE"),
            })
        })
        .collect();

    Ok(commits)
}

/// Unique `Name <email>` author entries over the whole history, sorted.
///
/// Duplicates differing only in case collapse to the earliest spelling.
pub fn get_authors(dir: &Path) -> Result<Vec<String>> {
    let stdout = git(dir, &["log", "--reverse", "--format=%aN <%aE>"])?;
    let mut seen = HashSet::new();
    let mut authors: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && seen.insert(l.to_lowercase()))
        .map(str::to_string)
        .collect();
    authors.sort();
    Ok(authors)
}
