//! TrendScan Runner: the batch jobs over the price cache.
//!
//! This crate builds on `trendscan-core` to provide:
//! - Configuration loading (`trendscan.toml`)
//! - Incremental sync with quota, pacing and failure isolation
//! - Market breadth gate
//! - Weekly trend scanner and the dated watchlist output
//! - Manual import of saved vendor payloads
//! - Tracing subscriber setup

pub mod config;
pub mod gate;
pub mod import;
pub mod job;
pub mod logging;
pub mod scanner;
pub mod sync;
pub mod watchlist;

pub use config::{ConfigError, GateConfig, PathsConfig, ScanConfig, ScanParams, SyncConfig};
pub use gate::{GateDecision, MarketGate, UnavailablePolicy};
pub use import::{import_dir, ImportError, ImportSummary};
pub use job::{run_scan_job, ScanJobError, ScanOutcome};
pub use logging::LoggingConfig;
pub use scanner::{ScanError, ScanReport, ScanSummary, TrendScanner};
pub use sync::{
    InstrumentOutcome, Pacer, SyncEngine, SyncError, SyncOrder, SyncProgress, SyncSummary,
    ThreadPacer, TracingProgress,
};
pub use watchlist::{WatchlistError, WatchlistSink};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
        assert_send::<SyncSummary>();
        assert_sync::<SyncSummary>();
    }
}
