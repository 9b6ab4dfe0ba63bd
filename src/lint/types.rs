/// How a rule violation counts against a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintProblem {
    /// Rule name (e.g., "type-enum")
    pub rule: &'static str,
    /// Human-readable description, rendered verbatim in reports
    pub message: String,
    pub level: Severity,
}

/// Result of linting one commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintOutcome {
    /// True when no error-level rule failed
    pub valid: bool,
    pub errors: Vec<LintProblem>,
    pub warnings: Vec<LintProblem>,
}

impl LintOutcome {
    pub fn clean() -> Self {
        LintOutcome {
            valid: true,
            errors: vec![],
            warnings: vec![],
        }
    }

    pub fn has_problems(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }
}
