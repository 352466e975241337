//! SignalRecord: one row of a watchlist.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of signal the scanner emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// Weekly close crossed above its weekly moving average this week.
    WeeklyTrendUp,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::WeeklyTrendUp => "WEEKLY_TREND_UP",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scan hit. `close` and `ma` are already rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub code: String,
    pub name: String,
    pub close: f64,
    pub ma: f64,
    pub kind: SignalKind,
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
