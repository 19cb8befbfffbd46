//! Configuration management
//!
//! Configuration is sourced from environment variables (the deployment
//! path) or a TOML file, then range-validated before anything starts.
//! Validation failures are fatal at startup; nothing later re-checks.

use crate::error::{Error, Result};
use crate::models::WallpaperSource;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Sections
// ============================================================================

/// Telegram credentials and targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,

    /// Target channel: `@username` or numeric chat id
    pub channel_id: String,

    /// The single user allowed to issue commands
    pub admin_user_id: u64,
}

/// API keys for the wallpaper providers; at least one must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderKeys {
    pub pexels: Option<String>,
    pub unsplash: Option<String>,
    pub wallhaven: Option<String>,
}

/// Batch assembly and pacing knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Images per scheduled batch (1-10)
    pub wallpapers_per_batch: usize,

    /// Hours between scheduled batches (1-24)
    pub batch_interval_hours: u64,

    /// Seconds between consecutive sends within a batch (1-300)
    pub send_delay_seconds: u64,

    /// Retry attempts for transient failures (1-10)
    pub max_retries: u32,

    /// Minimum pixel height for the portrait check
    pub min_height: u32,

    /// Candidates fetched per quota slot, to survive filtering
    pub overfetch_factor: usize,

    /// Reject candidates whose metadata hits the exclusion list
    pub content_filter: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wallpapers_per_batch: 4,
            batch_interval_hours: 2,
            send_delay_seconds: 10,
            max_retries: 3,
            min_height: 800,
            overfetch_factor: 3,
            content_filter: true,
        }
    }
}

/// Outbound HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Image downloads per second
    pub rate_limit_per_sec: u32,

    /// User-Agent sent to providers and image hosts
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            rate_limit_per_sec: 2,
            user_agent: format!("tapet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// On-disk state location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding stats.json, seen_images.json and rotation.json
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub providers: ProviderKeys,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let telegram = TelegramConfig {
            bot_token: require_env("BOT_TOKEN")?,
            channel_id: require_env("CHANNEL_ID")?,
            admin_user_id: parse_env("ADMIN_USER_ID", None)?
                .ok_or_else(|| Error::config("ADMIN_USER_ID is required"))?,
        };

        let providers = ProviderKeys {
            pexels: optional_env("PEXELS_API_KEY"),
            unsplash: optional_env("UNSPLASH_API_KEY"),
            wallhaven: optional_env("WALLHAVEN_API_KEY"),
        };

        let batch_defaults = BatchConfig::default();
        let batch = BatchConfig {
            wallpapers_per_batch: parse_env(
                "WALLPAPERS_PER_BATCH",
                Some(batch_defaults.wallpapers_per_batch),
            )?
            .unwrap_or(batch_defaults.wallpapers_per_batch),
            batch_interval_hours: parse_env(
                "BATCH_INTERVAL_HOURS",
                Some(batch_defaults.batch_interval_hours),
            )?
            .unwrap_or(batch_defaults.batch_interval_hours),
            send_delay_seconds: parse_env(
                "SEND_DELAY_SECONDS",
                Some(batch_defaults.send_delay_seconds),
            )?
            .unwrap_or(batch_defaults.send_delay_seconds),
            max_retries: parse_env("MAX_RETRIES", Some(batch_defaults.max_retries))?
                .unwrap_or(batch_defaults.max_retries),
            min_height: parse_env("TAPET_MIN_HEIGHT", Some(batch_defaults.min_height))?
                .unwrap_or(batch_defaults.min_height),
            overfetch_factor: parse_env(
                "TAPET_OVERFETCH_FACTOR",
                Some(batch_defaults.overfetch_factor),
            )?
            .unwrap_or(batch_defaults.overfetch_factor),
            content_filter: parse_env("TAPET_CONTENT_FILTER", Some(batch_defaults.content_filter))?
                .unwrap_or(batch_defaults.content_filter),
        };

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            request_timeout_secs: parse_env(
                "TAPET_REQUEST_TIMEOUT",
                Some(http_defaults.request_timeout_secs),
            )?
            .unwrap_or(http_defaults.request_timeout_secs),
            rate_limit_per_sec: parse_env(
                "TAPET_RATE_LIMIT",
                Some(http_defaults.rate_limit_per_sec),
            )?
            .unwrap_or(http_defaults.rate_limit_per_sec),
            user_agent: optional_env("TAPET_USER_AGENT").unwrap_or(http_defaults.user_agent),
        };

        let storage = StorageConfig {
            data_dir: optional_env("TAPET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| StorageConfig::default().data_dir),
        };

        let config = Self {
            telegram,
            providers,
            batch,
            http,
            storage,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::config(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and required relationships
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::config("bot token must not be empty"));
        }
        if self.telegram.channel_id.trim().is_empty() {
            return Err(Error::config("channel id must not be empty"));
        }
        if self.telegram.admin_user_id == 0 {
            return Err(Error::config("admin user id must not be zero"));
        }

        if self.configured_sources().is_empty() {
            return Err(Error::config(
                "at least one provider API key is required \
                 (PEXELS_API_KEY, UNSPLASH_API_KEY or WALLHAVEN_API_KEY)",
            ));
        }

        check_range(
            "wallpapers_per_batch",
            self.batch.wallpapers_per_batch as u64,
            1,
            10,
        )?;
        check_range(
            "batch_interval_hours",
            self.batch.batch_interval_hours,
            1,
            24,
        )?;
        check_range("send_delay_seconds", self.batch.send_delay_seconds, 1, 300)?;
        check_range("max_retries", u64::from(self.batch.max_retries), 1, 10)?;

        if self.batch.overfetch_factor == 0 {
            return Err(Error::config("overfetch_factor must be at least 1"));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(Error::config("request timeout must be at least 1 second"));
        }
        if self.http.rate_limit_per_sec == 0 {
            return Err(Error::config("rate limit must be at least 1 per second"));
        }

        Ok(())
    }

    /// Sources with a configured API key, in rotation order
    ///
    /// Wallhaven works without a key, but is only rotated in when its key
    /// variable is set so an operator opts in explicitly.
    pub fn configured_sources(&self) -> Vec<WallpaperSource> {
        let mut sources = Vec::new();
        if self.providers.pexels.is_some() {
            sources.push(WallpaperSource::Pexels);
        }
        if self.providers.unsplash.is_some() {
            sources.push(WallpaperSource::Unsplash);
        }
        if self.providers.wallhaven.is_some() {
            sources.push(WallpaperSource::Wallhaven);
        }
        sources
    }

    /// API key for a source, if configured
    pub fn api_key(&self, source: WallpaperSource) -> Option<&str> {
        match source {
            WallpaperSource::Pexels => self.providers.pexels.as_deref(),
            WallpaperSource::Unsplash => self.providers.unsplash.as_deref(),
            WallpaperSource::Wallhaven => self.providers.wallhaven.as_deref(),
        }
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.batch.batch_interval_hours * 3600)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_secs(self.batch.send_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| Error::config(format!("{key} is required")))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: Option<T>) -> Result<Option<T>> {
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::config(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
