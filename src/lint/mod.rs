pub mod parser;
pub mod rules;
pub mod types;

pub use types::{LintOutcome, LintProblem, Severity};

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::config::LintConfig;
use parser::ParsedCommit;

/// Name of the only built-in rule set.
pub const CONVENTIONAL: &str = "conventional";

#[derive(Debug, Error)]
pub enum LintError {
    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),
}

/// A single commit message check.
/// Rules report at most one problem; the rule set decides its severity.
pub trait Rule: Send + Sync {
    /// Rule identifier (e.g., "subject-empty")
    fn name(&self) -> &'static str;

    /// Return a violation message, or None when the commit passes.
    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String>;
}

struct RuleEntry {
    level: Severity,
    rule: Box<dyn Rule>,
}

impl RuleEntry {
    fn new(level: Severity, rule: impl Rule + 'static) -> Self {
        RuleEntry {
            level,
            rule: Box::new(rule),
        }
    }
}

/// An ordered list of rules with their severities.
pub struct RuleSet {
    name: String,
    entries: Vec<RuleEntry>,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl RuleSet {
    /// Load a named rule set with its default options.
    #[cfg(test)]
    pub fn load(name: &str) -> Result<Self, LintError> {
        Self::load_with(name, &LintConfig::default())
    }

    /// Load a named rule set, applying configured overrides.
    ///
    /// Accepts `conventional` and the `@commitlint/config-conventional`
    /// package name for the same set.
    pub fn load_with(name: &str, overrides: &LintConfig) -> Result<Self, LintError> {
        match name {
            CONVENTIONAL | "@commitlint/config-conventional" => {
                Ok(Self::conventional(overrides))
            }
            other => Err(LintError::UnknownRuleSet(other.to_string())),
        }
    }

    fn conventional(overrides: &LintConfig) -> Self {
        let max = |value: Option<usize>| value.unwrap_or(rules::DEFAULT_MAX_LENGTH);
        let types = overrides.types.clone().unwrap_or_else(|| {
            rules::CONVENTIONAL_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect()
        });

        let entries = vec![
            RuleEntry::new(Severity::Warning, rules::BodyLeadingBlank),
            RuleEntry::new(
                Severity::Error,
                rules::BodyMaxLineLength {
                    max: max(overrides.body_max_line_length),
                },
            ),
            RuleEntry::new(Severity::Warning, rules::FooterLeadingBlank),
            RuleEntry::new(
                Severity::Error,
                rules::FooterMaxLineLength {
                    max: max(overrides.footer_max_line_length),
                },
            ),
            RuleEntry::new(
                Severity::Error,
                rules::HeaderMaxLength {
                    max: max(overrides.header_max_length),
                },
            ),
            RuleEntry::new(Severity::Error, rules::HeaderTrim),
            RuleEntry::new(Severity::Error, rules::ScopeCase),
            RuleEntry::new(Severity::Error, rules::SubjectCase),
            RuleEntry::new(Severity::Error, rules::SubjectEmpty),
            RuleEntry::new(Severity::Error, rules::SubjectFullStop),
            RuleEntry::new(Severity::Error, rules::TypeCase),
            RuleEntry::new(Severity::Error, rules::TypeEmpty),
            RuleEntry::new(Severity::Error, rules::TypeEnum { types }),
        ];

        RuleSet {
            name: CONVENTIONAL.to_string(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.rule.name()).collect()
    }
}

fn ignore_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(Merge pull request (.*)|Merge (.*?) into (.*?)|Merge branch (.*?))$",
            r"^Merge tag (.*?)$",
            r"^Merge remote-tracking branch(\s*)(.*)",
            r"^(Merged (.*?)(in|into) (.*)|Merged PR (.*): (.*))",
            r"^(R|r)evert (.*)",
            r"^(amend|fixup|squash)!",
            r"^Automatic merge(.*)",
            r"^Auto-merged (.*?) into (.*)",
            r"^(chore(\([^)]+\))?:\s*)?v?\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("ignore pattern is a valid regex"))
        .collect()
    })
}

/// Whether a message is exempt from linting (merges, reverts, autosquash
/// commits, release version bumps).
pub fn is_ignored(message: &str) -> bool {
    let header = message.lines().next().unwrap_or("");
    ignore_patterns().iter().any(|p| p.is_match(header))
}

/// Lint one commit message against a rule set.
pub fn lint(message: &str, rules: &RuleSet) -> LintOutcome {
    if is_ignored(message) {
        debug!("commit message matches an ignore pattern");
        return LintOutcome::clean();
    }

    let commit = parser::parse(message);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for entry in &rules.entries {
        let Some(message) = entry.rule.check(&commit) else {
            continue;
        };
        let problem = LintProblem {
            rule: entry.rule.name(),
            message,
            level: entry.level,
        };
        match entry.level {
            Severity::Error => errors.push(problem),
            Severity::Warning => warnings.push(problem),
        }
    }

    debug!(
        header = %commit.header,
        errors = errors.len(),
        warnings = warnings.len(),
        "linted commit message"
    );

    LintOutcome {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
