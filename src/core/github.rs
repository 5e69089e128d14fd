//! GitHub releases API client.

use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, RemoteApiFailedDetails, Result};

const USER_AGENT: &str = concat!("relman/", env!("CARGO_PKG_VERSION"));

/// `owner/name` on a GitHub host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSlug {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Parse `owner/name`, an https/ssh/scp-style git URL, or an npm
    /// `git+https://` repository URL.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let short = Regex::new(r"^([\w.-]+)/([\w.-]+)$").ok()?;
        if let Some(caps) = short.captures(input) {
            return Some(Self::new("github.com", &caps[1], &caps[2]));
        }

        let url = Regex::new(concat!(
            r"^(?:git\+)?(?:(?:https?|ssh|git)://)?(?:[^@/]+@)?",
            r"([^/:]+)(?::\d+)?[:/]([\w.-]+)/([\w.-]+?)(?:\.git)?/?$",
        ))
        .ok()?;
        let caps = url.captures(input)?;
        Some(Self::new(&caps[1], &caps[2], &caps[3]))
    }

    fn new(host: &str, owner: &str, name: &str) -> Self {
        Self {
            host: host.to_string(),
            owner: owner.to_string(),
            name: name.trim_end_matches(".git").to_string(),
        }
    }

    pub fn web_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.name)
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub prerelease: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatedRelease {
    pub id: u64,
    pub html_url: String,
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn create_release(
        &self,
        repo: &RepoSlug,
        request: &ReleaseRequest,
    ) -> Result<CreatedRelease> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.api_url, repo.owner, repo.name
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(request)
            .send()
            .map_err(|e| {
                Error::remote_api_failed(
                    format!("HTTP request failed: {}", e),
                    RemoteApiFailedDetails {
                        url: url.clone(),
                        status: None,
                        body: String::new(),
                    },
                )
                .with_retryable(true)
            })?;

        let status = response.status();
        let body = response.text().unwrap_or_default();

        if !status.is_success() {
            return Err(Error::remote_api_failed(
                format!("GitHub API error: HTTP {}", status.as_u16()),
                RemoteApiFailedDetails {
                    url,
                    status: Some(status.as_u16()),
                    body,
                },
            )
            .with_retryable(status.is_server_error()));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            Error::internal_json(e.to_string(), Some("parse GitHub release response".to_string()))
        })?;
        serde_json::from_value(value).map_err(|e| {
            Error::internal_json(e.to_string(), Some("parse GitHub release response".to_string()))
        })
    }
}
