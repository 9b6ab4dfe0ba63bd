use serde::{Deserialize, Serialize};

/// Identifies the pull request a bot run works on.
/// Parsed from a PR URL or taken from a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
}

impl PullRequestRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, pull_number: u64) -> Self {
        PullRequestRef {
            owner: owner.into(),
            repo: repo.into(),
            pull_number,
        }
    }

    /// The issue that carries this PR's conversation (same number).
    pub fn issue(&self) -> IssueRef {
        IssueRef {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            issue_number: self.pull_number,
        }
    }

    /// The status line `context` owns on `sha`.
    pub fn status_target(&self, sha: impl Into<String>, context: impl Into<String>) -> StatusTarget {
        StatusTarget {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            sha: sha.into(),
            context: context.into(),
        }
    }
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.pull_number)
    }
}

/// Comment operations address the PR through its issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

/// One commit-status line on a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTarget {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    /// Distinguishes this bot's status from other checks
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "pending"),
            CommitState::Success => write!(f, "success"),
            CommitState::Failure => write!(f, "failure"),
        }
    }
}

/// An entry of `GET /repos/{owner}/{repo}/pulls/{n}/commits`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrCommit {
    pub sha: String,
    pub commit: CommitDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitDetails {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub login: String,
}

/// An issue comment. `user` is null for comments by deleted accounts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub body: Option<String>,
}

impl IssueComment {
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// The slice of pull request metadata the bot needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub head: HeadRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeadRef {
    pub sha: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of the following page, None on the last page
    pub next: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_ref_derivations() {
        let pr = PullRequestRef::new("org", "repo", 42);
        let issue = pr.issue();
        assert_eq!(issue.issue_number, 42);
        assert_eq!(issue.owner, "org");

        let target = pr.status_target("abc123", "commitlint");
        assert_eq!(target.sha, "abc123");
        assert_eq!(target.context, "commitlint");
        assert_eq!(pr.to_string(), "org/repo#42");
    }

    #[test]
    fn test_commit_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(CommitState::Failure).unwrap(),
            serde_json::json!("failure")
        );
        assert_eq!(CommitState::Pending.to_string(), "pending");
    }

    #[test]
    fn test_comment_without_user() {
        let comment: IssueComment =
            serde_json::from_value(serde_json::json!({ "id": 7, "user": null })).unwrap();
        assert_eq!(comment.author_login(), None);
        assert_eq!(comment.body, None);
    }

    #[test]
    fn test_deserialize_pr_commit() {
        let commit: PrCommit = serde_json::from_value(serde_json::json!({
            "sha": "abc123",
            "commit": { "message": "fix stuff", "author": { "name": "a" } },
            "url": "https://api.github.com/..."
        }))
        .unwrap();
        assert_eq!(commit.sha, "abc123");
        assert_eq!(commit.commit.message, "fix stuff");
    }
}
