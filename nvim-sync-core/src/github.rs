//! GitHub REST implementation of [`TreeFetcher`] and [`ContentFetcher`].
//!
//! - Tree: `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
//! - Content: `GET /repos/{owner}/{repo}/contents/{path}` with the raw media
//!   type, so the body is the file itself instead of base64 JSON.
//!
//! An empty token sends unauthenticated requests (low rate limit, public
//! repositories only).

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::contract::{CollaboratorError, ContentFetcher, RepoTree, TreeFetcher};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const USER_AGENT: &str = concat!("nvim-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("rate limited by GitHub ({status}): {url}")]
    RateLimited { status: StatusCode, url: String },

    #[error("GitHub returned {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct GithubClient {
    http: Client,
    api_base_url: String,
}

impl GithubClient {
    pub fn new() -> Result<Self, GithubError> {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    /// Points the client at another API root (GitHub Enterprise, tests).
    pub fn with_base_url(api_base_url: impl Into<String>) -> Result<Self, GithubError> {
        let api_base_url = api_base_url.into();
        Url::parse(&api_base_url).map_err(|_| GithubError::InvalidBaseUrl(api_base_url.clone()))?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        info!(api_base_url = %api_base_url, "Initialized GithubClient");
        Ok(GithubClient { http, api_base_url })
    }

    /// Builds `{base}/repos/{owner}/{repo}/{tail...}`, percent-encoding each
    /// segment. `/` inside a tail part separates segments.
    fn endpoint(&self, owner: &str, repo: &str, tail: &[&str]) -> Result<Url, GithubError> {
        let mut url = Url::parse(&self.api_base_url)
            .map_err(|_| GithubError::InvalidBaseUrl(self.api_base_url.clone()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| GithubError::InvalidBaseUrl(self.api_base_url.clone()))?;
            segments.pop_if_empty().extend(["repos", owner, repo]);
            for part in tail {
                segments.extend(part.split('/'));
            }
        }
        Ok(url)
    }

    async fn get(
        &self,
        url: Url,
        token: &str,
        accept: Option<&str>,
    ) -> Result<reqwest::Response, GithubError> {
        let mut request = self.http.get(url.clone());
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = url.to_string();
        // A 403 is only a rate limit when the quota is spent; otherwise it is
        // a permission error.
        let quota_exhausted = response
            .headers()
            .get(RATE_LIMIT_REMAINING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        match status {
            StatusCode::NOT_FOUND => Err(GithubError::NotFound { url }),
            StatusCode::TOO_MANY_REQUESTS => Err(GithubError::RateLimited { status, url }),
            StatusCode::FORBIDDEN if quota_exhausted => {
                Err(GithubError::RateLimited { status, url })
            }
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
                Err(GithubError::Status { status, url, body })
            }
        }
    }
}

#[async_trait]
impl TreeFetcher for GithubClient {
    async fn fetch_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<RepoTree, CollaboratorError> {
        let mut url = self.endpoint(owner, repo, &["git", "trees", branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        info!(owner, repo, branch, "Fetching repository tree");

        let tree: RepoTree = self
            .get(url, token, None)
            .await
            .map_err(|e| {
                error!(error = %e, owner, repo, branch, "Failed to fetch repository tree");
                e
            })?
            .json()
            .await
            .map_err(GithubError::from)?;
        info!(
            revision = %tree.sha,
            entries = tree.tree.len(),
            truncated = tree.truncated,
            "Fetched repository tree"
        );
        Ok(tree)
    }
}

#[async_trait]
impl ContentFetcher for GithubClient {
    async fn fetch_content(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, CollaboratorError> {
        let url = self.endpoint(owner, repo, &["contents", path])?;
        debug!(owner, repo, path, "Fetching file content");
        let content = self
            .get(url, token, Some(RAW_MEDIA_TYPE))
            .await?
            .text()
            .await
            .map_err(GithubError::from)?;
        Ok(content)
    }
}
