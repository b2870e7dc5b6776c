//! Process configuration, read once at startup from a TOML file.

use crate::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CLIENT_SECRET_ENV: &str = "SNOOFEED_REDDIT_CLIENT_SECRET";
pub const PASSWORD_ENV: &str = "SNOOFEED_REDDIT_PASSWORD";

/// Reddit's listing endpoints cap `limit` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    pub reddit: RedditConfig,
    /// Width of the maturity window in hours.
    pub max_hours_ago: u64,
    /// History cap.
    pub max_rss_items: usize,
    /// Request ceiling per run.
    pub max_requests: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Subscriber-count breakpoint -> minimum score.
    pub min_score: BTreeMap<String, i64>,
    /// Subscriber-count breakpoint -> minimum comment count.
    pub min_comments: BTreeMap<String, u64>,
    #[serde(default)]
    pub blacklist_strings: Vec<String>,
    #[serde(default)]
    pub ignore_allow_list: Vec<String>,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_rss_file_path")]
    pub rss_file_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storage.json")
}

fn default_rss_file_path() -> PathBuf {
    PathBuf::from("rss.xml")
}

impl HarvestConfig {
    /// Read, parse, resolve secrets from the environment and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.resolve_secrets(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill secrets the file left out from `lookup` (the environment in
    /// production).
    pub fn resolve_secrets<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.reddit.client_secret.is_none() {
            self.reddit.client_secret = Some(lookup(CLIENT_SECRET_ENV).ok_or_else(|| {
                ConfigError::MissingEnvironmentVariable {
                    var_name: CLIENT_SECRET_ENV.to_string(),
                }
            })?);
        }
        if self.reddit.password.is_none() {
            self.reddit.password = Some(lookup(PASSWORD_ENV).ok_or_else(|| {
                ConfigError::MissingEnvironmentVariable {
                    var_name: PASSWORD_ENV.to_string(),
                }
            })?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rss_items == 0 {
            return Err(invalid("max_rss_items", "0"));
        }
        if self.max_requests == 0 {
            return Err(invalid("max_requests", "0"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(invalid("page_size", &self.page_size.to_string()));
        }
        if self.reddit.client_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.client_id".to_string(),
            });
        }
        self.breakpoints().map(|_| ())
    }

    /// Breakpoints with their `(min_score, min_comments)` pair, ascending.
    pub fn breakpoints(&self) -> Result<BTreeMap<u64, (i64, u64)>, ConfigError> {
        if self.min_score.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "min_score needs at least one breakpoint".to_string(),
            });
        }
        if self.min_score.len() != self.min_comments.len() {
            return Err(ConfigError::ValidationFailed {
                reason: "min_score and min_comments must list the same breakpoints".to_string(),
            });
        }

        let mut table = BTreeMap::new();
        for (key, min_score) in &self.min_score {
            let breakpoint = parse_breakpoint("min_score", key)?;
            let min_comments =
                self.min_comments
                    .get(key)
                    .ok_or_else(|| ConfigError::ValidationFailed {
                        reason: format!("min_comments has no entry for breakpoint {}", key),
                    })?;
            table.insert(breakpoint, (*min_score, *min_comments));
        }
        Ok(table)
    }

    pub fn user_agent(&self) -> String {
        self.reddit.user_agent.clone().unwrap_or_else(|| {
            format!(
                "snoofeed/{} by {}",
                env!("CARGO_PKG_VERSION"),
                self.reddit.username
            )
        })
    }
}

fn parse_breakpoint(field: &str, key: &str) -> Result<u64, ConfigError> {
    key.trim().parse::<u64>().map_err(|_| invalid(field, key))
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
