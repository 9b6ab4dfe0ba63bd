use regex::Regex;
use std::sync::OnceLock;

/// A commit message split into the parts the rules inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit<'a> {
    /// First line, untrimmed
    pub header: &'a str,
    pub commit_type: Option<&'a str>,
    pub scope: Option<&'a str>,
    pub subject: Option<&'a str>,
    /// Body lines with surrounding blank lines removed; empty when absent
    pub body: Vec<&'a str>,
    /// Trailer block; empty when absent
    pub footer: Vec<&'a str>,
    /// Whether the line right after the header is blank
    pub blank_before_body: bool,
    /// Whether the line right before the footer is blank
    pub blank_before_footer: bool,
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\w*)(?:\((.*)\))?!?: (.*)$").expect("header pattern is a valid regex")
    })
}

fn trailer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:BREAKING[ -]CHANGE: |[A-Za-z][\w-]*(?:: | #)\S)")
            .expect("trailer pattern is a valid regex")
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn trim_blank_lines<'s, 'a>(mut lines: &'s [&'a str]) -> &'s [&'a str] {
    while let Some((first, rest)) = lines.split_first() {
        if !is_blank(first) {
            break;
        }
        lines = rest;
    }
    while let Some((last, rest)) = lines.split_last() {
        if !is_blank(last) {
            break;
        }
        lines = rest;
    }
    lines
}

/// Parse a raw commit message.
///
/// The header is matched against `type(scope)!: subject`; a header that does
/// not match leaves type, scope and subject unset. The footer begins at the
/// first trailer-looking line after the header.
pub fn parse(message: &str) -> ParsedCommit<'_> {
    let lines: Vec<&str> = message.lines().collect();
    let header = lines.first().copied().unwrap_or("");

    let (commit_type, scope, subject) = match header_pattern().captures(header) {
        Some(caps) => (
            non_empty(caps.get(1).map(|m| m.as_str())),
            non_empty(caps.get(2).map(|m| m.as_str())),
            non_empty(caps.get(3).map(|m| m.as_str())),
        ),
        None => (None, None, None),
    };

    let rest: &[&str] = lines.get(1..).unwrap_or(&[]);
    let footer_start = rest
        .iter()
        .position(|line| trailer_pattern().is_match(line))
        .unwrap_or(rest.len());

    let body = trim_blank_lines(&rest[..footer_start]).to_vec();
    let footer = trim_blank_lines(&rest[footer_start..]).to_vec();

    let blank_before_body = rest.first().map_or(true, |line| is_blank(line));
    let blank_before_footer = footer_start > 0 && is_blank(rest[footer_start - 1]);

    ParsedCommit {
        header,
        commit_type,
        scope,
        subject,
        body,
        footer,
        blank_before_body,
        blank_before_footer,
    }
}
