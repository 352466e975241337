//! Tracing subscriber setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// `level` is an `EnvFilter` directive; `RUST_LOG` overrides it when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl LoggingConfig {
    /// Install the global subscriber. Later calls are ignored.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        // A subscriber may already be installed (tests); keep it.
        let _ = match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
            _ => fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
        };
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
