//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ListingSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cron expression for scheduled runs (5 or 6 fields)
    #[serde(default = "defaults::schedule")]
    pub schedule: String,

    /// Listing pages to scrape, in override order (later wins on title clash)
    #[serde(default = "defaults::sources")]
    pub sources: Vec<String>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// History file location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Listing page selectors
    #[serde(default)]
    pub selectors: ListingSelectors,

    /// Notification channels
    #[serde(default)]
    pub notifiers: NotifierConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `path`, or defaults when the file does not exist.
    ///
    /// A file that exists but fails to parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Override settings from `YTS_*` environment variables.
    ///
    /// Returns one message per ignored override; logging may not be set up yet.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override settings from any key lookup (environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();

        if let Some(schedule) = lookup("YTS_SCHEDULE") {
            self.schedule = schedule;
        }

        if let Some(timeout) = lookup("YTS_REQUEST_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.http.request_timeout_secs = secs,
                Err(_) => ignored.push(format!(
                    "Ignoring invalid YTS_REQUEST_TIMEOUT_SECS: {timeout}"
                )),
            }
        }

        if let Some(dir) = lookup("YTS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(file) = lookup("YTS_HISTORY_FILE") {
            self.storage.history_file = file;
        }

        if let Some(sources) = lookup("YTS_SOURCES") {
            self.sources = sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(url) = lookup("YTS_DISCORD_WEBHOOK_URL") {
            self.notifiers.discord.webhook_url = url;
        }

        if let Some(url) = lookup("YTS_SLACK_WEBHOOK_URL") {
            self.notifiers.slack.webhook_url = url;
        }

        if let Some(level) = lookup("YTS_LOG_LEVEL") {
            self.logging.level = level;
        }

        ignored
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.trim().is_empty() {
            return Err(AppError::validation("schedule is empty"));
        }
        crate::pipeline::normalize_cron(&self.schedule)
            .map_err(|e| AppError::validation(format!("schedule: {e}")))?;
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(AppError::validation("http.request_timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }
        for source in &self.sources {
            Url::parse(source)
                .map_err(|e| AppError::validation(format!("Invalid source URL {source}: {e}")))?;
        }
        if self.storage.history_file.trim().is_empty() {
            return Err(AppError::validation("storage.history_file is empty"));
        }
        for (name, selector) in self.selectors.all() {
            if selector.trim().is_empty() {
                return Err(AppError::validation(format!("selectors.{name} is empty")));
            }
        }
        for (name, webhook) in [
            ("discord", &self.notifiers.discord),
            ("slack", &self.notifiers.slack),
        ] {
            if webhook.is_enabled() {
                Url::parse(&webhook.webhook_url).map_err(|e| {
                    AppError::validation(format!("notifiers.{name}.webhook_url is invalid: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: defaults::schedule(),
            sources: defaults::sources(),
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            selectors: ListingSelectors::default(),
            notifiers: NotifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum pages fetched in parallel
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts per page after a timeout, connect error, 429 or 5xx
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Referer header sent with each request
    #[serde(default = "defaults::referrer")]
    pub referrer: String,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            request_timeout_secs: defaults::request_timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            referrer: defaults::referrer(),
        }
    }
}

/// History storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the history file
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// History file name within `data_dir`
    #[serde(default = "defaults::history_file")]
    pub history_file: String,
}

impl StorageConfig {
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            history_file: defaults::history_file(),
        }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifierConfig {
    #[serde(default)]
    pub discord: WebhookConfig,

    #[serde(default)]
    pub slack: WebhookConfig,
}

/// A webhook channel; disabled while the URL is empty.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub webhook_url: String,
}

impl WebhookConfig {
    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn schedule() -> String {
        "*/30 * * * *".into()
    }
    pub fn sources() -> Vec<String> {
        vec![
            "https://yts.mx/".into(),
            "https://yts.autos/".into(),
            "https://yts.rs/".into(),
            "https://yts.lt/".into(),
            "https://yts.do/".into(),
        ]
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36".into()
    }
    pub fn request_timeout() -> u64 {
        60
    }
    pub fn max_concurrent() -> usize {
        2
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn referrer() -> String {
        "https://www.google.com/".into()
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn history_file() -> String {
        "history.json".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
