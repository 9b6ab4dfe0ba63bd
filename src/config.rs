use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".commitlint-bot.toml";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Bot name is not configured (set APP_NAME or [app].name)")]
    MissingAppName,

    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),
}

/// Top-level configuration loaded from .commitlint-bot.toml.
///
/// All fields are optional in the file; environment variables fill in or
/// override what the deployment provides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// Overrides for the conventional rule set
    #[serde(default)]
    pub lint: LintConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Bot name. Used as the status context and, suffixed with `[bot]`,
    /// to recognise the bot's own comments. Overridden by APP_NAME.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST API base URL, for GitHub Enterprise. Defaults to api.github.com.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Socket address the webhook server listens on
    pub bind: Option<String>,
    /// Shared secret for X-Hub-Signature-256 verification
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LintConfig {
    pub header_max_length: Option<usize>,
    pub body_max_line_length: Option<usize>,
    pub footer_max_line_length: Option<usize>,
    /// Replaces the allowed commit types when set
    pub types: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from `path`, or from .commitlint-bot.toml in the
    /// current directory when no path is given. A missing default file yields
    /// the default config; environment variables are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` abstracts `std::env::var` so
    /// tests can feed their own values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("APP_NAME").filter(|v| !v.is_empty()) {
            self.app.name = Some(name);
        }
        if self.github.token.is_none() {
            self.github.token = lookup("GITHUB_TOKEN").filter(|v| !v.is_empty());
        }
        if let Some(url) = lookup("GITHUB_API_URL").filter(|v| !v.is_empty()) {
            self.github.api_url = Some(url);
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET").filter(|v| !v.is_empty()) {
            self.server.webhook_secret = Some(secret);
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            let port: u16 = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
            self.server.bind = Some(format!("0.0.0.0:{port}"));
        }
        Ok(())
    }

    /// The configured bot name, required for anything that talks to GitHub
    /// on the bot's behalf.
    pub fn app_name(&self) -> Result<&str, ConfigError> {
        self.app
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingAppName)
    }

    /// Resolved GitHub token. File values win; GITHUB_TOKEN fills the gap
    /// during `load`.
    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn api_url(&self) -> &str {
        self.github
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    pub fn bind_address(&self) -> &str {
        self.server.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }
}
