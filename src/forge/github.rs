//! forge::github
//!
//! GitHub commit comparison via the REST compare endpoint.
//!
//! # Design
//!
//! `GET /repos/{owner}/{repo}/compare/{base}...{head}` reports how `head`
//! relates to `base` in its `status` field. Only that field is read;
//! `per_page=1` keeps the response small since the commit list is unused.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not retry (the workflow re-runs the job instead)
//!
//! # Example
//!
//! ```ignore
//! use bufpush::core::types::Secret;
//! use bufpush::forge::github::GitHubComparator;
//! use bufpush::forge::CommitComparator;
//!
//! let forge = GitHubComparator::new(Secret::new("ghp_xxx"), "octocat", "hello-world");
//! let status = forge.compare_commits(&base_sha, &head_sha).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::traits::{CommitComparator, CompareStatus, ForgeError};
use crate::core::config::{GitHubConfig, DEFAULT_GITHUB_API_URL};
use crate::core::types::Secret;

/// User-Agent header value for API requests.
pub const USER_AGENT_VALUE: &str = "buf-push-action";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// GitHub commit comparator.
pub struct GitHubComparator {
    /// HTTP client for making requests
    client: Client,
    /// Token with read access to the repository contents
    token: Secret,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubComparator")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubComparator {
    /// Create a comparator against github.com.
    pub fn new(token: Secret, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_GITHUB_API_URL)
    }

    /// Create a comparator with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`).
    pub fn with_api_base(
        token: Secret,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a comparator from resolved configuration.
    pub fn from_config(config: &GitHubConfig) -> Self {
        Self::with_api_base(
            config.token.clone(),
            config.owner.clone(),
            config.repo.clone(),
            config.api_base.clone(),
        )
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for the compare endpoint.
    fn compare_url(&self, base: &str, head: &str) -> String {
        format!(
            "{}/repos/{}/{}/compare/{}...{}?per_page=1",
            self.api_base, self.owner, self.repo, base, head
        )
    }

    /// Map a non-success response onto a `ForgeError`.
    async fn error_from_response(response: Response) -> ForgeError {
        let status = response.status();

        // Try to get error message from body
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
                ForgeError::RateLimited
            }
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl CommitComparator for GitHubComparator {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn compare_commits(&self, base: &str, head: &str) -> Result<CompareStatus, ForgeError> {
        let url = self.compare_url(base, head);
        debug!(base, head, repo = %format!("{}/{}", self.owner, self.repo), "comparing commits");

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let comparison: GitHubComparison =
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })?;

        CompareStatus::parse(&comparison.status)
            .ok_or(ForgeError::UnexpectedStatus(comparison.status))
    }
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// The part of the compare response this crate reads.
#[derive(Deserialize)]
struct GitHubComparison {
    status: String,
}
