//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over where daily bars come from (the
//! Eastmoney kline endpoint, saved payloads, test scripts) so the sync engine
//! never sees vendor transport or schema details.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Fetch/parse variants are per-instrument and recoverable; `StoreIo` and
/// `StoreCorrupt` mean the cache itself cannot be trusted.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {code}")]
    SymbolNotFound { code: String },

    #[error("hard stop: provider is refusing requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("store I/O error at {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt series file {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("breadth unavailable: {0}")]
    BreadthUnavailable(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// True for failures of the local cache, which abort a batch rather than
    /// skipping one instrument.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, DataError::StoreIo { .. } | DataError::StoreCorrupt { .. })
    }
}

/// Trait for daily price sources.
///
/// `fetch` returns bars dated `start` or later. An empty series means the
/// vendor had nothing new; callers decide whether that is noteworthy.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for `code` from `start` (inclusive) up to the latest available.
    fn fetch(&self, code: &str, start: NaiveDate) -> Result<PriceSeries, DataError>;

    /// Whether the provider is currently accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}
