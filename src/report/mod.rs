pub mod types;

pub use types::Report;

use crate::github::PullRequestRef;
use crate::lint::LintProblem;
use colored::Colorize;

/// Status description while a run is in progress.
pub const PENDING_DESCRIPTION: &str = "Waiting for the status to be reported";

pub const HELP_URL: &str = "https://help.github.com/en/articles/changing-a-commit-message";

/// One-line summary used as the final commit status description.
pub fn status_description(report: &Report) -> String {
    format!(
        "Found {} problems, {} warnings",
        report.error_count, report.warning_count
    )
}

/// Render the PR comment body.
///
/// Each offending commit gets a bullet followed by its errors (`:x:`) and
/// warnings (`:warning:`).
pub fn render_comment(report: &Report) -> String {
    let mut body = String::new();
    for commit in &report.commits {
        body.push_str(&format!("* Commit: {}\n", commit.sha));
        for error in &commit.errors {
            body.push_str(&format!("  - :x: {}\n", error.message));
        }
        for warning in &commit.warnings {
            body.push_str(&format!("  - :warning: {}\n", warning.message));
        }
    }

    format!(
        "\nFound {} problems, {} warnings within this pull request.\n\n{}\n\n\
         You may need to [change a commit messages][{}] to comply with the contribution guidelines.\n",
        report.error_count, report.warning_count, body, HELP_URL
    )
}

fn problem_line(problem: &LintProblem) -> String {
    format!("{}  {}", problem.message, format!("[{}]", problem.rule).dimmed())
}

/// Print the report to the terminal with colors.
///
/// PR owner/repo#42: 3 commits checked
///
/// ✗ abc123
///   error    type may not be empty  [type-empty]
///   warning  body must have leading blank line  [body-leading-blank]
///
/// Found 1 problems, 1 warnings
pub fn print_terminal_report(report: &Report, pr: &PullRequestRef) {
    println!();
    println!(
        "PR {}: {} commits checked",
        pr.to_string().bold(),
        report.commits_checked
    );
    println!();

    if report.commits.is_empty() {
        println!("  {}", "All commit messages pass.".green());
        println!();
    }

    for commit in &report.commits {
        let marker = if commit.errors.is_empty() {
            "!".yellow().bold()
        } else {
            "✗".red().bold()
        };
        println!("{} {}", marker, commit.sha);
        for error in &commit.errors {
            println!("  {}    {}", "error".red(), problem_line(error));
        }
        for warning in &commit.warnings {
            println!("  {}  {}", "warning".yellow(), problem_line(warning));
        }
        println!();
    }

    let summary = status_description(report);
    if report.valid {
        println!("{} {}", "PASS".green().bold(), summary);
    } else {
        println!("{} {}", "FAIL".red().bold(), summary);
    }
    println!();
}
