//! Configuration management for pager-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::fmt;
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use discord_pager::PaginatorConfig;
use serde::{Deserialize, Serialize};

use crate::text::parse_bool;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub pagination: PaginatorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Discord bot specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Command prefixes, tried in order
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub status: OperationalStatus,
    /// Guild the staff commands belong to
    #[serde(default)]
    pub home_guild_id: Option<u64>,
    /// Webhook receiving error reports in production
    #[serde(default)]
    pub error_webhook_url: Option<String>,
}

/// Role ids granting each staff level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub admin: Vec<u64>,
    #[serde(default)]
    pub moderator: Vec<u64>,
    #[serde(default)]
    pub engineer: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_blacklist_path")]
    pub blacklist_path: String,
    /// Errors kept for the `errors` command; `None` keeps all of them
    #[serde(default = "default_error_cache_limit")]
    pub error_cache_limit: Option<usize>,
    /// Directory for the rolling log file
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blacklist_path: default_blacklist_path(),
            error_cache_limit: default_error_cache_limit(),
            log_dir: default_log_dir(),
        }
    }
}

/// Where failures get reported: a webhook in production, the channel
/// itself while testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalStatus {
    #[default]
    #[serde(alias = "PRODUCTION")]
    Production,
    #[serde(alias = "TESTING")]
    Testing,
}

impl FromStr for OperationalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "testing" => Ok(Self::Testing),
            other => Err(format!(
                "unknown status '{}', expected PRODUCTION or TESTING",
                other
            )),
        }
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "PRODUCTION"),
            Self::Testing => write!(f, "TESTING"),
        }
    }
}

/// Source of environment variables.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub(crate) fn from_env_impl(env: &impl ReadEnv) -> Result<Self> {
        let bot_token = env.var("DISCORD_BOT_TOKEN").context("DISCORD_BOT_TOKEN not set")?;

        let prefixes = env
            .var("BOT_PREFIXES")
            .map(|s| parse_list(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_prefixes);

        let status = match env.var("BOT_STATUS") {
            Some(s) => s.parse().map_err(anyhow::Error::msg)?,
            None => OperationalStatus::default(),
        };

        let home_guild_id = parse_opt::<u64>(env, "HOME_GUILD_ID")?;
        let error_webhook_url = env.var("ERROR_WEBHOOK_URL").filter(|s| !s.is_empty());

        let roles = RolesConfig {
            admin: parse_id_list(&env.var("ADMIN_ROLES").unwrap_or_default()),
            moderator: parse_id_list(&env.var("MOD_ROLES").unwrap_or_default()),
            engineer: parse_id_list(&env.var("ENGINEER_ROLES").unwrap_or_default()),
        };

        let mut pagination = PaginatorConfig::default();
        if let Some(max_size) = parse_opt(env, "PAGINATION_MAX_SIZE")? {
            pagination.max_size = max_size;
        }
        if let Some(max_pages) = parse_opt(env, "PAGINATION_MAX_PAGES")? {
            pagination.max_pages = max_pages;
        }
        if let Some(timeout_secs) = parse_opt(env, "PAGINATION_TIMEOUT_SECS")? {
            pagination.timeout_secs = timeout_secs;
        }
        if let Some(by_lines) = env.var("PAGINATION_BY_LINES") {
            pagination.by_lines = parse_bool(&by_lines)
                .map_err(|e| anyhow::anyhow!("PAGINATION_BY_LINES: {}", e))?;
        }

        let mut storage = StorageConfig::default();
        if let Some(path) = env.var("BLACKLIST_PATH") {
            storage.blacklist_path = path;
        }
        if let Some(limit) = env.var("ERROR_CACHE_LIMIT") {
            storage.error_cache_limit = match limit.trim() {
                "" | "none" => None,
                n => Some(n.parse().context("ERROR_CACHE_LIMIT must be a number")?),
            };
        }
        if let Some(dir) = env.var("LOG_DIR") {
            storage.log_dir = dir;
        }

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                prefixes,
                status,
                home_guild_id,
                error_webhook_url,
            },
            roles,
            pagination,
            storage,
        })
    }
}

fn default_bot_token() -> String {
    std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default()
}

fn default_prefixes() -> Vec<String> {
    ["Tim.", "T.", "t.", "tim."].iter().map(|s| s.to_string()).collect()
}

fn default_blacklist_path() -> String {
    "data/blacklist.json".to_string()
}

fn default_error_cache_limit() -> Option<usize> {
    Some(100)
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn parse_opt<T>(env: &impl ReadEnv, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env.var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(None),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

fn parse_id_list(s: &str) -> Vec<u64> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .filter_map(|x| x.parse::<u64>().ok())
        .collect()
}
