use crate::github::CommitState;
use crate::lint::{LintOutcome, LintProblem};

/// Problems found in one commit. Only commits with problems are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLintResult {
    pub sha: String,
    pub errors: Vec<LintProblem>,
    pub warnings: Vec<LintProblem>,
}

/// Aggregate lint result for a pull request, rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// False if any commit failed an error-level rule
    pub valid: bool,
    /// Offending commits, in listing order
    pub commits: Vec<CommitLintResult>,
    pub error_count: usize,
    pub warning_count: usize,
    /// Commits linted, including clean ones
    pub commits_checked: usize,
}

impl Default for Report {
    fn default() -> Self {
        Report {
            valid: true,
            commits: vec![],
            error_count: 0,
            warning_count: 0,
            commits_checked: 0,
        }
    }
}

impl Report {
    /// Fold one commit's outcome into the report.
    pub fn record(&mut self, sha: impl Into<String>, outcome: LintOutcome) {
        self.commits_checked += 1;
        if !outcome.valid {
            self.valid = false;
        }
        if !outcome.has_problems() {
            return;
        }
        self.error_count += outcome.errors.len();
        self.warning_count += outcome.warnings.len();
        self.commits.push(CommitLintResult {
            sha: sha.into(),
            errors: outcome.errors,
            warnings: outcome.warnings,
        });
    }

    pub fn has_problems(&self) -> bool {
        self.error_count + self.warning_count > 0
    }

    /// Final commit status for this report.
    pub fn state(&self) -> CommitState {
        if self.valid {
            CommitState::Success
        } else {
            CommitState::Failure
        }
    }
}
