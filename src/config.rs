use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ScopeError};
use crate::github::DEFAULT_API_URL;
use crate::sync::PublishMode;

/// Account browsed when nothing else is configured.
pub const DEFAULT_USER: &str = "octocat";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub user: String,
    pub api_url: String,
    pub token_env: Option<String>,
    pub token_command: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub publish: PublishMode,
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            publish: PublishMode::Incremental,
            concurrency: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    pub network: NetworkConfig,
}

/// Command-line overrides; `None` leaves the configured value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub user: Option<String>,
    pub api_url: Option<String>,
    pub batch_counts: bool,
    pub concurrency: Option<usize>,
}

pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("ghscope").join("config.toml"))
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    /// A missing default file means defaults; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match config_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| ScopeError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            Err(e) => Err(ScopeError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides (`GITHUB_USER`).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(user) = lookup("GITHUB_USER").filter(|u| !u.is_empty()) {
            self.github.user = user;
        }
        self
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(user) = &overrides.user {
            self.github.user = user.clone();
        }
        if let Some(api_url) = &overrides.api_url {
            self.github.api_url = api_url.clone();
        }
        if overrides.batch_counts {
            self.sync.publish = PublishMode::Batch;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.sync.concurrency = concurrency;
        }
        self
    }

    /// Find a token: the configured env var, then the token command.
    /// `None` means anonymous access.
    pub fn resolve_token(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(env_var) = &self.github.token_env {
            if let Some(token) = lookup(env_var.as_str()).filter(|t| !t.trim().is_empty()) {
                return Some(token.trim().to_string());
            }
        }

        self.github.token_command.as_deref().and_then(try_cli_token)
    }
}

/// Run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::debug!(command, "token command failed");
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
