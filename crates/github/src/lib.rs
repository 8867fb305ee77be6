//! GitHub issue source.
//!
//! Fetches an issue and pages through its comments via the REST API:
//! - `GET /repos/{owner}/{repo}/issues/{number}`
//! - `GET /repos/{owner}/{repo}/issues/{number}/comments?per_page=100`
//!
//! Comment pages are followed through the `Link: <…>; rel="next"` header
//! until it disappears, so the thread comes back in chronological order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use issuefold_core::error::SourceError;
use issuefold_core::{Fragment, IssueRef, IssueSource, IssueThread};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("issuefold/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;

/// Issue source backed by the GitHub REST API.
pub struct GitHubIssueSource {
    api_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubIssueSource {
    /// Create a new source. Without a token requests are anonymous and
    /// subject to GitHub's much lower unauthenticated rate limit.
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        if token.is_none() {
            info!("No GitHub token provided, using unauthenticated requests");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            api_url: DEFAULT_API_URL.into(),
            token,
            client,
        }
    }

    /// Create with a custom API URL (e.g., GitHub Enterprise or tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!(url = %url, "GitHub request");

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response);
        }

        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let body = response.text().await.unwrap_or_default();
        let message = github_message(&body);

        Err(match status {
            404 => SourceError::NotFound(message),
            429 => SourceError::RateLimited(message),
            403 if rate_limited => SourceError::RateLimited(message),
            401 | 403 => SourceError::Unauthorized(message),
            _ => {
                warn!(status, body = %body, "GitHub API error");
                SourceError::Api { status, message }
            }
        })
    }

    async fn fetch_issue(&self, issue: &IssueRef) -> Result<ApiIssue, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_url, issue.owner, issue.repo, issue.number
        );
        self.get(&url)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("issue: {e}")))
    }

    async fn fetch_comments(&self, issue: &IssueRef) -> Result<Vec<Fragment>, SourceError> {
        let mut next = Some(format!(
            "{}/repos/{}/{}/issues/{}/comments?per_page={PER_PAGE}",
            self.api_url, issue.owner, issue.repo, issue.number
        ));
        let mut fragments = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let response = self.get(&url).await?;
            next = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);

            let page: Vec<ApiComment> = response
                .json()
                .await
                .map_err(|e| SourceError::Decode(format!("comments page {}: {e}", pages + 1)))?;
            pages += 1;
            fragments.extend(page.into_iter().map(ApiComment::into_fragment));
        }

        debug!(pages, comments = fragments.len(), "Fetched issue comments");
        Ok(fragments)
    }
}

#[async_trait]
impl IssueSource for GitHubIssueSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_thread(&self, issue: &IssueRef) -> Result<IssueThread, SourceError> {
        let api_issue = self.fetch_issue(issue).await?;
        let comments = self.fetch_comments(issue).await?;

        info!(issue = %issue, comments = comments.len(), "Fetched issue thread");

        Ok(IssueThread {
            title: api_issue.title,
            body: api_issue.body.unwrap_or_default(),
            comments,
        })
    }
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Pull `message` out of a GitHub error body, or return the body.
fn github_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

// --- GitHub API types ---

#[derive(Debug, Deserialize)]
struct ApiIssue {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl ApiComment {
    fn into_fragment(self) -> Fragment {
        Fragment {
            body: self.body.unwrap_or_default(),
            author: self.user.map(|u| u.login),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
