use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::config::LintConfig;
use crate::github::{
    CommitState, GitHub, GitHubError, IssueComment, IssueRef, PullRequestRef,
};
use crate::lint::{self, LintError, RuleSet, CONVENTIONAL};
use crate::report::{self, Report};

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Lint(#[from] LintError),

    #[error("Lint task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The bot's name on GitHub.
///
/// The name doubles as the commit status context; comments are recognised
/// as the bot's own when their author login is `{name}[bot]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    name: String,
}

impl BotIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        BotIdentity { name: name.into() }
    }

    pub fn context(&self) -> &str {
        &self.name
    }

    pub fn login(&self) -> String {
        format!("{}[bot]", self.name)
    }

    pub fn authored(&self, comment: &IssueComment) -> bool {
        comment.author_login() == Some(self.login().as_str())
    }
}

/// A pull request event reduced to what a lint run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintRequest {
    pub pull_request: PullRequestRef,
    pub head_sha: String,
}

/// What a run did to the bot comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Created(u64),
    Updated(u64),
    Deleted(u64),
    Unchanged,
}

/// Outcome of one lint run.
#[derive(Debug)]
pub struct LintRun {
    pub report: Report,
    pub state: CommitState,
    pub comment: CommentAction,
}

/// Lint every commit of the pull request, one page at a time.
///
/// Each page is linted as soon as it arrives; the report spans all pages.
#[instrument(skip(github, pr, rules), fields(pr = %pr))]
pub async fn collect_report(
    github: &dyn GitHub,
    pr: &PullRequestRef,
    rules: &RuleSet,
) -> Result<Report, BotError> {
    let mut report = Report::default();
    let mut page = 1;
    loop {
        let commits = github.list_commits_page(pr, page).await?;
        for commit in commits.items {
            let outcome = lint::lint(&commit.commit.message, rules);
            report.record(commit.sha, outcome);
        }
        debug!(
            page,
            checked = report.commits_checked,
            errors = report.error_count,
            warnings = report.warning_count,
            "linted commit page"
        );
        match commits.next {
            Some(next) if next > page => page = next,
            Some(next) => {
                warn!(page, next, "commit listing does not advance, stopping");
                break;
            }
            None => break,
        }
    }
    Ok(report)
}

/// Find the bot's comment among all comments on the issue.
#[instrument(skip(github, issue, identity), fields(issue = issue.issue_number))]
pub async fn find_bot_comment(
    github: &dyn GitHub,
    issue: &IssueRef,
    identity: &BotIdentity,
) -> Result<Option<IssueComment>, BotError> {
    let mut page = 1;
    loop {
        let comments = github.list_comments_page(issue, page).await?;
        if let Some(found) = comments.items.into_iter().find(|c| identity.authored(c)) {
            debug!(comment_id = found.id, page, "found bot comment");
            return Ok(Some(found));
        }
        match comments.next {
            Some(next) if next > page => page = next,
            Some(next) => {
                warn!(page, next, "comment listing does not advance, stopping");
                return Ok(None);
            }
            None => return Ok(None),
        }
    }
}

/// Lint a pull request's commits and report back to GitHub.
///
/// 1. Mark the head commit's status pending.
/// 2. Lint every commit with the conventional rule set.
/// 3. Set the status to success or failure.
/// 4. Create, update or delete the bot comment so it exists exactly when
///    there are problems to show.
///
/// Any failure aborts the run; earlier side effects are not rolled back.
#[instrument(skip_all, fields(pr = %request.pull_request, head = %request.head_sha))]
pub async fn perform_lint(
    github: &dyn GitHub,
    identity: &BotIdentity,
    overrides: &LintConfig,
    request: &LintRequest,
) -> Result<LintRun, BotError> {
    let pr = &request.pull_request;
    let issue = pr.issue();
    let target = pr.status_target(&request.head_sha, identity.context());

    github
        .create_status(&target, CommitState::Pending, report::PENDING_DESCRIPTION)
        .await?;

    let rules = RuleSet::load_with(CONVENTIONAL, overrides)?;
    let report = collect_report(github, pr, &rules).await?;

    let state = report.state();
    github
        .create_status(&target, state, &report::status_description(&report))
        .await?;
    info!(
        %state,
        commits = report.commits_checked,
        errors = report.error_count,
        warnings = report.warning_count,
        "commit status reported"
    );

    let existing = find_bot_comment(github, &issue, identity).await?;
    let comment = if report.has_problems() {
        let body = report::render_comment(&report);
        match existing {
            Some(previous) => {
                github.update_comment(&issue, previous.id, &body).await?;
                CommentAction::Updated(previous.id)
            }
            None => {
                let created = github.create_comment(&issue, &body).await?;
                CommentAction::Created(created.id)
            }
        }
    } else {
        match existing {
            Some(previous) => {
                github.delete_comment(&issue, previous.id).await?;
                CommentAction::Deleted(previous.id)
            }
            None => CommentAction::Unchanged,
        }
    };
    info!(comment = ?comment, "bot comment reconciled");

    Ok(LintRun {
        report,
        state,
        comment,
    })
}

/// Per-PR async locks. Runs for the same pull request queue behind each
/// other; an entry is removed when its last holder or waiter goes away.
#[derive(Default)]
struct PrLocks {
    inner: Mutex<HashMap<PullRequestRef, PrSlot>>,
}

struct PrSlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Guards alive for this PR, waiting or holding
    users: usize,
}

struct PrGuard<'a> {
    locks: &'a PrLocks,
    key: PullRequestRef,
    held: Option<OwnedMutexGuard<()>>,
}

impl PrLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<PullRequestRef, PrSlot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, pr: &PullRequestRef) -> PrGuard<'_> {
        let lock = {
            let mut map = self.map();
            let slot = map.entry(pr.clone()).or_insert_with(|| PrSlot {
                lock: Arc::default(),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };
        // Registered before waiting, so dropping this future still releases
        // the slot.
        let mut guard = PrGuard {
            locks: self,
            key: pr.clone(),
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

impl Drop for PrGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut map = self.locks.map();
        if let Some(slot) = map.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                map.remove(&self.key);
            }
        }
    }
}

/// Long-lived orchestrator shared by webhook deliveries.
#[derive(Clone)]
pub struct Bot {
    github: Arc<dyn GitHub>,
    identity: BotIdentity,
    overrides: LintConfig,
    locks: Arc<PrLocks>,
}

impl Bot {
    pub fn new(github: Arc<dyn GitHub>, identity: BotIdentity, overrides: LintConfig) -> Self {
        Bot {
            github,
            identity,
            overrides,
            locks: Arc::default(),
        }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Run `perform_lint` on its own task, serialized per pull request.
    ///
    /// The run finishes even if the caller stops waiting for it, e.g. when
    /// GitHub drops a slow webhook delivery.
    pub async fn handle(&self, request: &LintRequest) -> Result<LintRun, BotError> {
        let bot = self.clone();
        let request = request.clone();
        let run = async move {
            let _guard = bot.locks.acquire(&request.pull_request).await;
            let result =
                perform_lint(bot.github.as_ref(), &bot.identity, &bot.overrides, &request).await;
            if let Err(e) = &result {
                error!(pr = %request.pull_request, error = %e, "lint run failed");
            }
            result
        };
        tokio::spawn(run.in_current_span()).await?
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::github::{Page, PrCommit, PullRequestInfo, StatusTarget};
    use crate::github::types::{CommitDetails, HeadRef, User};
    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedStatus {
        pub sha: String,
        pub context: String,
        pub state: CommitState,
        pub description: String,
    }

    #[derive(Default)]
    pub struct FakeState {
        pub commit_pages: Vec<Vec<PrCommit>>,
        pub comments: Vec<IssueComment>,
        pub comments_per_page: usize,
        pub statuses: Vec<RecordedStatus>,
        pub updates: Vec<(u64, String)>,
        pub next_comment_id: u64,
        /// Operation name that fails with an API error
        pub fail_on: Option<&'static str>,
    }

    /// In-memory GitHub used by orchestrator and webhook tests.
    #[derive(Default)]
    pub struct FakeGitHub {
        pub state: Mutex<FakeState>,
    }

    pub fn commit(sha: &str, message: &str) -> PrCommit {
        PrCommit {
            sha: sha.to_string(),
            commit: CommitDetails {
                message: message.to_string(),
            },
        }
    }

    pub fn comment(id: u64, login: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            user: Some(User {
                login: login.to_string(),
            }),
            body: Some(body.to_string()),
        }
    }

    impl FakeGitHub {
        pub fn with_commits(pages: Vec<Vec<PrCommit>>) -> Self {
            let fake = FakeGitHub::default();
            {
                let mut state = fake.lock();
                state.commit_pages = pages;
                state.comments_per_page = 30;
                state.next_comment_id = 1000;
            }
            fake
        }

        pub fn lock(&self) -> MutexGuard<'_, FakeState> {
            self.state.lock().unwrap()
        }

        pub fn set_commits(&self, pages: Vec<Vec<PrCommit>>) {
            self.lock().commit_pages = pages;
        }

        fn check(&self, op: &'static str) -> Result<(), GitHubError> {
            if self.lock().fail_on == Some(op) {
                return Err(GitHubError::InvalidUrl(format!("simulated {op} failure")));
            }
            Ok(())
        }
    }

    fn page_of<T: Clone>(items: &[T], page: u32, per_page: usize) -> Page<T> {
        let start = (page as usize - 1) * per_page;
        let chunk: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
        let next = (start + per_page < items.len()).then_some(page + 1);
        Page { items: chunk, next }
    }

    #[async_trait]
    impl GitHub for FakeGitHub {
        async fn get_pull_request(
            &self,
            pr: &PullRequestRef,
        ) -> Result<PullRequestInfo, GitHubError> {
            self.check("get_pull_request")?;
            Ok(PullRequestInfo {
                number: pr.pull_number,
                title: "Test PR".to_string(),
                head: HeadRef {
                    sha: "head0000".to_string(),
                },
            })
        }

        async fn create_status(
            &self,
            target: &StatusTarget,
            state: CommitState,
            description: &str,
        ) -> Result<(), GitHubError> {
            self.check("create_status")?;
            self.lock().statuses.push(RecordedStatus {
                sha: target.sha.clone(),
                context: target.context.clone(),
                state,
                description: description.to_string(),
            });
            Ok(())
        }

        async fn list_commits_page(
            &self,
            _pr: &PullRequestRef,
            page: u32,
        ) -> Result<Page<PrCommit>, GitHubError> {
            self.check("list_commits_page")?;
            let state = self.lock();
            let index = page as usize - 1;
            let items = state.commit_pages.get(index).cloned().unwrap_or_default();
            let next = (index + 1 < state.commit_pages.len()).then_some(page + 1);
            Ok(Page { items, next })
        }

        async fn list_comments_page(
            &self,
            _issue: &IssueRef,
            page: u32,
        ) -> Result<Page<IssueComment>, GitHubError> {
            self.check("list_comments_page")?;
            // Let concurrent runs interleave here.
            tokio::task::yield_now().await;
            let state = self.lock();
            Ok(page_of(&state.comments, page, state.comments_per_page))
        }

        async fn create_comment(
            &self,
            _issue: &IssueRef,
            body: &str,
        ) -> Result<IssueComment, GitHubError> {
            self.check("create_comment")?;
            let mut state = self.lock();
            state.next_comment_id += 1;
            let created = comment(state.next_comment_id, "commitlint[bot]", body);
            state.comments.push(created.clone());
            Ok(created)
        }

        async fn update_comment(
            &self,
            _issue: &IssueRef,
            comment_id: u64,
            body: &str,
        ) -> Result<(), GitHubError> {
            self.check("update_comment")?;
            let mut state = self.lock();
            state.updates.push((comment_id, body.to_string()));
            if let Some(existing) = state.comments.iter_mut().find(|c| c.id == comment_id) {
                existing.body = Some(body.to_string());
            }
            Ok(())
        }

        async fn delete_comment(
            &self,
            _issue: &IssueRef,
            comment_id: u64,
        ) -> Result<(), GitHubError> {
            self.check("delete_comment")?;
            self.lock().comments.retain(|c| c.id != comment_id);
            Ok(())
        }
    }
}
