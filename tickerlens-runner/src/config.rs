//! Application configuration, loaded from TOML.
//!
//! Every section and key is optional; anything left out takes the default
//! shown in [`AppConfig::default`].

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid history period '{0}' (expected e.g. 30d, 12w, 6mo, 5y)")]
    InvalidPeriod(String),
}

/// Which data provider fetches fresh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("financial_data.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` level directive, e.g. "info" or "tickerlens_runner=debug".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// How far back to fetch prices: `Nd`, `Nw`, `Nmo` or `Ny`.
    pub history_period: String,
    pub cache_dir: PathBuf,
    pub provider: ProviderKind,
    /// Root of the CSV import tree, used by the csv provider.
    pub csv_dir: PathBuf,
    /// Never touch the network; serve from the cache only.
    pub offline: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            history_period: "5y".into(),
            cache_dir: PathBuf::from("data"),
            provider: ProviderKind::Yahoo,
            csv_dir: PathBuf::from("import"),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Appended to bare symbols longer than four characters.
    pub long_symbol_suffix: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            long_symbol_suffix: ".NS".into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub data: DataConfig,
    pub market: MarketConfig,
}

impl AppConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        parse_period(&config.data.history_period)?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// Returns `Ok(None)` when the file does not exist so the caller can warn
    /// and fall back to defaults; a file that exists but cannot be read or
    /// parsed is an error.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path).map(Some)
    }

    /// First date of the configured history window ending at `today`.
    pub fn history_start(&self, today: NaiveDate) -> Result<NaiveDate, ConfigError> {
        let period = parse_period(&self.data.history_period)?;
        Ok(period.start_from(today))
    }
}

/// A look-back span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPeriod {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl HistoryPeriod {
    /// The date `self` before `end`. Month arithmetic clamps to month end.
    pub fn start_from(&self, end: NaiveDate) -> NaiveDate {
        let back = match *self {
            HistoryPeriod::Days(n) => end.checked_sub_signed(chrono::Duration::days(n.into())),
            HistoryPeriod::Weeks(n) => end.checked_sub_signed(chrono::Duration::weeks(n.into())),
            HistoryPeriod::Months(n) => end.checked_sub_months(Months::new(n)),
            HistoryPeriod::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
        };
        back.unwrap_or(NaiveDate::MIN)
    }
}

/// Parse `30d`, `12w`, `6mo`, `5y` (case-insensitive).
pub fn parse_period(s: &str) -> Result<HistoryPeriod, ConfigError> {
    let lower = s.trim().to_ascii_lowercase();
    let invalid = || ConfigError::InvalidPeriod(s.to_string());

    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = lower.split_at(split);
    let n: u32 = digits.parse().map_err(|_| invalid())?;
    if n == 0 {
        return Err(invalid());
    }

    match unit {
        "d" => Ok(HistoryPeriod::Days(n)),
        "w" | "wk" => Ok(HistoryPeriod::Weeks(n)),
        "mo" => Ok(HistoryPeriod::Months(n)),
        "y" => Ok(HistoryPeriod::Years(n)),
        _ => Err(invalid()),
    }
}
