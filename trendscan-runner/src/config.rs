//! Run configuration loaded from `trendscan.toml`.
//!
//! Every section and field is optional; anything absent takes its default.
//! The loaded struct is immutable for the run and handed to each job at
//! construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::gate::UnavailablePolicy;
use crate::logging::LoggingConfig;
use crate::sync::SyncOrder;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub paths: PathsConfig,
    pub sync: SyncConfig,
    pub scan: ScanParams,
    pub gate: GateConfig,
    pub logging: LoggingConfig,
}

/// Where the universe, the price cache and the outputs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub universe: PathBuf,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Saved vendor payloads for `import`.
    pub manual_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            universe: PathBuf::from("universe/final_universe.csv"),
            data_dir: PathBuf::from("data/stocks"),
            output_dir: PathBuf::from("market"),
            manual_dir: PathBuf::from("data/manual/stocks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Instruments successfully merged per invocation.
    pub max_per_run: usize,
    /// Pause after every fetch attempt, in seconds.
    pub sleep_secs: f64,
    /// Fetch floor for instruments with no stored history.
    pub start_date: NaiveDate,
    pub order: SyncOrder,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_per_run: 10,
            sleep_secs: 5.0,
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            order: SyncOrder::AsLoaded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Weekly moving-average window, in weeks.
    pub ma_window: usize,
    /// Minimum daily bars before an instrument is considered.
    pub min_list_days: usize,
    pub max_output: usize,
    /// Trailing daily bars whose summed volume must be nonzero.
    pub volume_lookback: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            ma_window: 20,
            min_list_days: 250,
            max_output: 50,
            volume_lookback: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    pub min_advancing: u32,
    pub on_unavailable: UnavailablePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_advancing: 1000,
            on_unavailable: UnavailablePolicy::Pass,
        }
    }
}

impl ScanConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.ma_window < 1 {
            return Err(ConfigError::Invalid("scan.ma_window must be >= 1".into()));
        }
        if self.scan.volume_lookback < 1 {
            return Err(ConfigError::Invalid(
                "scan.volume_lookback must be >= 1".into(),
            ));
        }
        if !self.sync.sleep_secs.is_finite() || self.sync.sleep_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sync.sleep_secs must be a non-negative number, got {}",
                self.sync.sleep_secs
            )));
        }
        Ok(())
    }
}
