use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::types::{
    CommitState, IssueComment, IssueRef, Page, PrCommit, PullRequestInfo, PullRequestRef,
    StatusTarget,
};
use super::{GitHub, GitHubError};
use crate::config::Config;

const PER_PAGE: u32 = 100;
const API_VERSION: &str = "2022-11-28";

/// GitHub REST API client backed by reqwest.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl RestClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        RestClient {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Build a client from the resolved configuration.
    /// Returns GitHubError::MissingToken when no token is configured.
    pub fn from_config(config: &Config) -> Result<Self, GitHubError> {
        let token = config.github_token().ok_or(GitHubError::MissingToken)?;
        Ok(Self::new(config.api_url(), token))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header(USER_AGENT, "commitlint-bot")
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(&self.token)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
    ) -> Result<Page<T>, GitHubError> {
        let response = self
            .request(Method::GET, path)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .send()
            .await?
            .error_for_status()?;

        let next = next_page(response.headers());
        let items = response.json::<Vec<T>>().await?;
        debug!(path, page, items = items.len(), next = ?next, "received page");
        Ok(Page { items, next })
    }
}

/// Extract the `page` number of the `rel="next"` link, if any.
fn next_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    let links = match parse_link_header::parse_with_rel(link) {
        Ok(links) => links,
        Err(e) => {
            warn!(error = ?e, link, "unparseable Link header");
            return None;
        }
    };
    links.get("next")?.queries.get("page")?.parse().ok()
}

#[async_trait]
impl GitHub for RestClient {
    #[instrument(skip(self, pr), fields(pr = %pr))]
    async fn get_pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestInfo, GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}", pr.owner, pr.repo, pr.pull_number);
        let info = self
            .request(Method::GET, &path)
            .send()
            .await?
            .error_for_status()?
            .json::<PullRequestInfo>()
            .await?;
        debug!(title = %info.title, head = %info.head.sha, "received PR metadata");
        Ok(info)
    }

    #[instrument(skip(self, target), fields(sha = %target.sha, context = %target.context))]
    async fn create_status(
        &self,
        target: &StatusTarget,
        state: CommitState,
        description: &str,
    ) -> Result<(), GitHubError> {
        let path = format!(
            "/repos/{}/{}/statuses/{}",
            target.owner, target.repo, target.sha
        );
        self.request(Method::POST, &path)
            .json(&serde_json::json!({
                "state": state,
                "context": target.context,
                "description": description,
            }))
            .send()
            .await?
            .error_for_status()?;
        debug!(%state, "commit status created");
        Ok(())
    }

    #[instrument(skip(self, pr), fields(pr = %pr))]
    async fn list_commits_page(
        &self,
        pr: &PullRequestRef,
        page: u32,
    ) -> Result<Page<PrCommit>, GitHubError> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/commits",
            pr.owner, pr.repo, pr.pull_number
        );
        self.get_page(&path, page).await
    }

    #[instrument(skip(self, issue), fields(issue = issue.issue_number))]
    async fn list_comments_page(
        &self,
        issue: &IssueRef,
        page: u32,
    ) -> Result<Page<IssueComment>, GitHubError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            issue.owner, issue.repo, issue.issue_number
        );
        self.get_page(&path, page).await
    }

    #[instrument(skip(self, issue, body), fields(issue = issue.issue_number))]
    async fn create_comment(
        &self,
        issue: &IssueRef,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            issue.owner, issue.repo, issue.issue_number
        );
        let comment = self
            .request(Method::POST, &path)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?
            .json::<IssueComment>()
            .await?;
        debug!(comment_id = comment.id, "comment created");
        Ok(comment)
    }

    #[instrument(skip(self, issue, body), fields(issue = issue.issue_number))]
    async fn update_comment(
        &self,
        issue: &IssueRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let path = format!(
            "/repos/{}/{}/issues/comments/{}",
            issue.owner, issue.repo, comment_id
        );
        self.request(Method::PATCH, &path)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        debug!("comment updated");
        Ok(())
    }

    #[instrument(skip(self, issue), fields(issue = issue.issue_number))]
    async fn delete_comment(&self, issue: &IssueRef, comment_id: u64) -> Result<(), GitHubError> {
        let path = format!(
            "/repos/{}/{}/issues/comments/{}",
            issue.owner, issue.repo, comment_id
        );
        self.request(Method::DELETE, &path)
            .send()
            .await?
            .error_for_status()?;
        debug!("comment deleted");
        Ok(())
    }
}
