//! Configuration types and loading.
//!
//! Config is loaded once at startup from an optional JSON file (e.g. `~/.relay/config.json`)
//! and the environment, then handed to the server and client constructors.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Slack (event source) settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Notion (page destination) settings.
    #[serde(default)]
    pub notion: NotionConfig,
}

/// Bind address and port for the webhook listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook endpoint (default 8080).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; Slack must be able to reach it).
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Slack app settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Bot token (xoxb-...) used for conversations.history. Overridden by SLACK_BOT_TOKEN env.
    pub bot_token: Option<String>,
    /// Signing secret. When set, inbound requests must carry a valid X-Slack-Signature.
    /// Overridden by SLACK_SIGNING_SECRET env. Unset means no verification.
    pub signing_secret: Option<String>,
    /// Web API base URL (default https://slack.com).
    pub api_base_url: Option<String>,
}

/// Notion integration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionConfig {
    /// Integration token. Overridden by NOTION_API_TOKEN env.
    pub api_token: Option<String>,
    /// Target database id. Overridden by NOTION_DB_ID env.
    pub database_id: Option<String>,
    /// Name of the database's title property (default "テーマ").
    pub title_property: Option<String>,
    /// API base URL (default https://api.notion.com).
    pub api_base_url: Option<String>,
}

pub const DEFAULT_TITLE_PROPERTY: &str = "テーマ";

/// Environment variables that override config file values, applied once at load time.
pub const SLACK_BOT_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
pub const SLACK_SIGNING_SECRET_ENV: &str = "SLACK_SIGNING_SECRET";
pub const NOTION_API_TOKEN_ENV: &str = "NOTION_API_TOKEN";
pub const NOTION_DB_ID_ENV: &str = "NOTION_DB_ID";

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    /// Overwrite credentials with non-blank values from `env` (a variable lookup).
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        let targets = [
            (SLACK_BOT_TOKEN_ENV, &mut self.slack.bot_token),
            (SLACK_SIGNING_SECRET_ENV, &mut self.slack.signing_secret),
            (NOTION_API_TOKEN_ENV, &mut self.notion.api_token),
            (NOTION_DB_ID_ENV, &mut self.notion.database_id),
        ];
        for (name, field) in targets {
            if let Some(v) = non_blank(env(name).as_ref()) {
                *field = Some(v);
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env_overrides(|name| std::env::var(name).ok());
        self
    }
}

/// Slack bot token, if set and non-blank.
pub fn resolve_slack_token(config: &Config) -> Option<String> {
    non_blank(config.slack.bot_token.as_ref())
}

/// Slack signing secret, if set and non-blank.
pub fn resolve_slack_signing_secret(config: &Config) -> Option<String> {
    non_blank(config.slack.signing_secret.as_ref())
}

/// Notion integration token, if set and non-blank.
pub fn resolve_notion_token(config: &Config) -> Option<String> {
    non_blank(config.notion.api_token.as_ref())
}

/// Notion database id, if set and non-blank.
pub fn resolve_notion_database_id(config: &Config) -> Option<String> {
    non_blank(config.notion.database_id.as_ref())
}

/// Title property name, falling back to [`DEFAULT_TITLE_PROPERTY`].
pub fn resolve_title_property(config: &Config) -> String {
    non_blank(config.notion.title_property.as_ref())
        .unwrap_or_else(|| DEFAULT_TITLE_PROPERTY.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".relay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or RELAY_CONFIG_PATH / default), then apply environment
/// overrides. Missing file => default config, so the relay can run from environment variables alone.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config.with_env_overrides(), path))
}
