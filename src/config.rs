//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::stats::{
    AggregateOptions, AggregationMethod, PeriodGranularity, SortOrder, WeekStart,
    DEFAULT_MAX_PERIODS,
};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Aggregation defaults
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub granularity: PeriodGranularity,

    #[serde(default)]
    pub method: AggregationMethod,

    #[serde(default)]
    pub sort: SortOrder,

    #[serde(default)]
    pub week_start: WeekStart,

    /// Minutes east of UTC defining local calendar days
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default = "default_max_periods")]
    pub max_periods: usize,
}

fn default_max_periods() -> usize {
    DEFAULT_MAX_PERIODS
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            granularity: PeriodGranularity::default(),
            method: AggregationMethod::default(),
            sort: SortOrder::default(),
            week_start: WeekStart::default(),
            utc_offset_minutes: 0,
            max_periods: default_max_periods(),
        }
    }
}

impl StatsConfig {
    /// Fixed offset for `utc_offset_minutes`, if it is in range
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Build aggregator options from this config
    ///
    /// An out-of-range offset falls back to UTC.
    pub fn aggregate_options(&self) -> AggregateOptions {
        let mut options = AggregateOptions::new()
            .with_week_start(self.week_start)
            .with_sort(self.sort)
            .with_max_periods(self.max_periods);

        match self.offset() {
            Some(offset) => options = options.with_offset(offset),
            None => tracing::warn!(
                minutes = self.utc_offset_minutes,
                "UTC offset out of range, using UTC"
            ),
        }

        options
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("lifestats").join("config.toml")),
            Some(PathBuf::from("./lifestats.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Load an explicit file if given, otherwise search the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Stats overrides
        if let Some(value) = var("LIFESTATS_GRANULARITY") {
            match PeriodGranularity::from_str(&value) {
                Some(g) => self.stats.granularity = g,
                None => tracing::warn!("Ignoring LIFESTATS_GRANULARITY={}", value),
            }
        }
        if let Some(value) = var("LIFESTATS_METHOD") {
            match AggregationMethod::from_str(&value) {
                Some(m) => self.stats.method = m,
                None => tracing::warn!("Ignoring LIFESTATS_METHOD={}", value),
            }
        }
        if let Some(value) = var("LIFESTATS_SORT") {
            match SortOrder::from_str(&value) {
                Some(s) => self.stats.sort = s,
                None => tracing::warn!("Ignoring LIFESTATS_SORT={}", value),
            }
        }
        if let Some(value) = var("LIFESTATS_WEEK_START") {
            match WeekStart::from_str(&value) {
                Some(w) => self.stats.week_start = w,
                None => tracing::warn!("Ignoring LIFESTATS_WEEK_START={}", value),
            }
        }
        if let Some(value) = var("LIFESTATS_UTC_OFFSET") {
            match value.trim().parse() {
                Ok(minutes) => self.stats.utc_offset_minutes = minutes,
                Err(_) => tracing::warn!("Ignoring LIFESTATS_UTC_OFFSET={}", value),
            }
        }

        // Logging overrides
        if let Some(level) = var("LIFESTATS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LIFESTATS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# lifestats configuration
#
# Environment variables override these settings:
# - LIFESTATS_GRANULARITY
# - LIFESTATS_METHOD
# - LIFESTATS_SORT
# - LIFESTATS_WEEK_START
# - LIFESTATS_UTC_OFFSET
# - LIFESTATS_LOG_LEVEL
# - LIFESTATS_LOG_FORMAT

[stats]
# Period size: hour, day, week, month or year
granularity = "day"

# Reduction per period: sum, mean, min, max, count or first
method = "mean"

# Output order: "period_key" (chronological) or "label" (alphabetical)
sort = "period_key"

# First day of the week: monday (ISO) or sunday
week_start = "monday"

# Minutes east of UTC that define local calendar days
utc_offset_minutes = 0

# Ranges needing more periods than this produce no output
max_periods = 100000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty or json
format = "pretty"
"#
    .to_string()
}
