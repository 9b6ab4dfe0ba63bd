mod bot;
mod config;
mod github;
mod lint;
mod report;
mod webhook;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::bot::{Bot, BotIdentity, LintRequest};
use crate::github::{GitHub, RestClient};
use crate::lint::{RuleSet, CONVENTIONAL};

/// commitlint-bot: lints pull request commit messages against the
/// conventional commit rules and reports back as a commit status and a
/// PR comment.
#[derive(Parser, Debug)]
#[command(name = "commitlint-bot", version, about)]
struct Cli {
    /// Config file path (defaults to .commitlint-bot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the webhook server
    Serve {
        /// Address to listen on (overrides [server].bind and PORT)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Lint the commits of one pull request
    Check {
        /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
        pr_url: String,

        /// Also set the commit status and bot comment on GitHub
        #[arg(long)]
        report: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    let client = RestClient::from_config(&config)?;
    debug!(api_url = %config.api_url(), "configured GitHub client");

    match cli.command {
        Command::Serve { bind } => {
            let identity = BotIdentity::new(config.app_name()?);
            let addr = bind.unwrap_or_else(|| config.bind_address().to_string());
            let bot = Bot::new(Arc::new(client), identity, config.lint.clone());
            info!(
                bot = %bot.identity().login(),
                signed = config.server.webhook_secret.is_some(),
                "starting webhook server"
            );
            let state = webhook::WebhookState::new(bot, config.server.webhook_secret.clone());
            webhook::serve(&addr, Arc::new(state)).await?;
        }
        Command::Check { pr_url, report } => {
            let span = info_span!("pr_check", pr_url = %pr_url);
            check(&config, &client, &pr_url, report).instrument(span).await?;
        }
    }

    Ok(())
}

async fn check(
    config: &config::Config,
    client: &RestClient,
    pr_url: &str,
    publish: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("parsing PR URL");
    let pr = github::parse_pr_url(pr_url)?;
    debug!(owner = %pr.owner, repo = %pr.repo, pr = pr.pull_number, "parsed PR URL");

    if publish {
        let identity = BotIdentity::new(config.app_name()?);
        let info = client.get_pull_request(&pr).await?;
        info!(number = info.number, title = %info.title, head = %info.head.sha, "fetched pull request");
        let request = LintRequest {
            pull_request: pr.clone(),
            head_sha: info.head.sha,
        };
        let run = bot::perform_lint(client, &identity, &config.lint, &request).await?;
        info!(state = %run.state, comment = ?run.comment, "reported to GitHub");
        report::print_terminal_report(&run.report, &pr);
        return Ok(());
    }

    let rules = RuleSet::load_with(CONVENTIONAL, &config.lint)?;
    debug!(rule_set = rules.name(), rules = rules.rule_names().len(), "loaded rules");
    let result = bot::collect_report(client, &pr, &rules).await?;
    info!(
        commits = result.commits_checked,
        errors = result.error_count,
        warnings = result.warning_count,
        "lint complete"
    );
    report::print_terminal_report(&result, &pr);
    if !result.valid {
        return Err(report::status_description(&result).into());
    }
    Ok(())
}
