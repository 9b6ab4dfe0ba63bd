pub mod client;
pub mod types;

pub use client::RestClient;
pub use types::{
    CommitState, IssueComment, IssueRef, Page, PrCommit, PullRequestInfo, PullRequestRef,
    StatusTarget,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// The GitHub operations the bot performs.
/// Implementations must be Send + Sync so one client can serve concurrent
/// webhook deliveries.
#[async_trait]
pub trait GitHub: Send + Sync {
    async fn get_pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestInfo, GitHubError>;

    /// Create a commit status on `target.sha` under `target.context`.
    async fn create_status(
        &self,
        target: &StatusTarget,
        state: CommitState,
        description: &str,
    ) -> Result<(), GitHubError>;

    /// Fetch one page (1-based) of the PR's commits.
    async fn list_commits_page(
        &self,
        pr: &PullRequestRef,
        page: u32,
    ) -> Result<Page<PrCommit>, GitHubError>;

    /// Fetch one page (1-based) of the issue's comments.
    async fn list_comments_page(
        &self,
        issue: &IssueRef,
        page: u32,
    ) -> Result<Page<IssueComment>, GitHubError>;

    async fn create_comment(&self, issue: &IssueRef, body: &str)
        -> Result<IssueComment, GitHubError>;

    async fn update_comment(
        &self,
        issue: &IssueRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubError>;

    async fn delete_comment(&self, issue: &IssueRef, comment_id: u64) -> Result<(), GitHubError>;
}

/// Parse a GitHub PR URL into its component parts.
///
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}
pub fn parse_pr_url(url: &str) -> Result<PullRequestRef, GitHubError> {
    let invalid = || GitHubError::InvalidUrl(url.to_string());
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;

    if parsed.host_str() != Some("github.com") {
        return Err(invalid());
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(invalid());
    }

    let pull_number = segments[3].parse::<u64>().map_err(|_| invalid())?;

    Ok(PullRequestRef::new(segments[0], segments[1], pull_number))
}
