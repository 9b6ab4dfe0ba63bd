use super::parser::ParsedCommit;
use super::Rule;

/// Commit types accepted by the conventional rule set.
pub const CONVENTIONAL_TYPES: &[&str] = &[
    "build", "chore", "ci", "docs", "feat", "fix", "perf", "refactor", "revert", "style", "test",
];

pub const DEFAULT_MAX_LENGTH: usize = 100;

fn is_lower_case(value: &str) -> bool {
    value == value.to_lowercase()
}

fn is_upper_case(value: &str) -> bool {
    value.chars().any(char::is_alphabetic) && value == value.to_uppercase()
}

fn starts_upper(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_sentence_case(value: &str) -> bool {
    starts_upper(value)
}

fn is_start_case(value: &str) -> bool {
    let mut words = value.split_whitespace().peekable();
    words.peek().is_some() && words.all(starts_upper)
}

fn is_pascal_case(value: &str) -> bool {
    starts_upper(value) && value.chars().all(char::is_alphanumeric)
}

fn too_long(lines: &[&str], max: usize) -> bool {
    lines.iter().any(|line| line.chars().count() > max)
}

pub struct BodyLeadingBlank;

impl Rule for BodyLeadingBlank {
    fn name(&self) -> &'static str {
        "body-leading-blank"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        if commit.body.is_empty() || commit.blank_before_body {
            return None;
        }
        Some("body must have leading blank line".to_string())
    }
}

pub struct BodyMaxLineLength {
    pub max: usize,
}

impl Rule for BodyMaxLineLength {
    fn name(&self) -> &'static str {
        "body-max-line-length"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        too_long(&commit.body, self.max).then(|| {
            format!(
                "body's lines must not be longer than {} characters",
                self.max
            )
        })
    }
}

pub struct FooterLeadingBlank;

impl Rule for FooterLeadingBlank {
    fn name(&self) -> &'static str {
        "footer-leading-blank"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        if commit.footer.is_empty() || commit.blank_before_footer {
            return None;
        }
        Some("footer must have leading blank line".to_string())
    }
}

pub struct FooterMaxLineLength {
    pub max: usize,
}

impl Rule for FooterMaxLineLength {
    fn name(&self) -> &'static str {
        "footer-max-line-length"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        too_long(&commit.footer, self.max).then(|| {
            format!(
                "footer's lines must not be longer than {} characters",
                self.max
            )
        })
    }
}

pub struct HeaderMaxLength {
    pub max: usize,
}

impl Rule for HeaderMaxLength {
    fn name(&self) -> &'static str {
        "header-max-length"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let length = commit.header.chars().count();
        (length > self.max).then(|| {
            format!(
                "header must not be longer than {} characters, current length is {}",
                self.max, length
            )
        })
    }
}

pub struct HeaderTrim;

impl Rule for HeaderTrim {
    fn name(&self) -> &'static str {
        "header-trim"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        (commit.header != commit.header.trim())
            .then(|| "header must not be surrounded by whitespace".to_string())
    }
}

pub struct ScopeCase;

impl Rule for ScopeCase {
    fn name(&self) -> &'static str {
        "scope-case"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let scope = commit.scope?;
        (!is_lower_case(scope)).then(|| "scope must be lower-case".to_string())
    }
}

pub struct SubjectCase;

impl Rule for SubjectCase {
    fn name(&self) -> &'static str {
        "subject-case"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let subject = commit.subject?;
        let forbidden = is_sentence_case(subject)
            || is_start_case(subject)
            || is_pascal_case(subject)
            || is_upper_case(subject);
        forbidden.then(|| {
            "subject must not be sentence-case, start-case, pascal-case, upper-case".to_string()
        })
    }
}

pub struct SubjectEmpty;

impl Rule for SubjectEmpty {
    fn name(&self) -> &'static str {
        "subject-empty"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        commit
            .subject
            .is_none()
            .then(|| "subject may not be empty".to_string())
    }
}

pub struct SubjectFullStop;

impl Rule for SubjectFullStop {
    fn name(&self) -> &'static str {
        "subject-full-stop"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let subject = commit.subject?.trim_end();
        // An ellipsis is not a full stop.
        (subject.ends_with('.') && !subject.ends_with("..."))
            .then(|| "subject may not end with full stop".to_string())
    }
}

pub struct TypeCase;

impl Rule for TypeCase {
    fn name(&self) -> &'static str {
        "type-case"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let commit_type = commit.commit_type?;
        (!is_lower_case(commit_type)).then(|| "type must be lower-case".to_string())
    }
}

pub struct TypeEmpty;

impl Rule for TypeEmpty {
    fn name(&self) -> &'static str {
        "type-empty"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        commit
            .commit_type
            .is_none()
            .then(|| "type may not be empty".to_string())
    }
}

pub struct TypeEnum {
    pub types: Vec<String>,
}

impl Rule for TypeEnum {
    fn name(&self) -> &'static str {
        "type-enum"
    }

    fn check(&self, commit: &ParsedCommit<'_>) -> Option<String> {
        let commit_type = commit.commit_type?;
        if self.types.iter().any(|t| t == commit_type) {
            return None;
        }
        Some(format!("type must be one of [{}]", self.types.join(", ")))
    }
}
