//! The scan job end to end: gate, scan, watchlist.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;
use trendscan_core::data::{BreadthSource, PriceStore, Universe};

use crate::config::ScanConfig;
use crate::gate::{GateDecision, MarketGate};
use crate::scanner::{ScanError, ScanReport, TrendScanner};
use crate::watchlist::{WatchlistError, WatchlistSink};

#[derive(Debug, Error)]
pub enum ScanJobError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Watchlist(#[from] WatchlistError),
}

#[derive(Debug)]
pub enum ScanOutcome {
    /// The gate held the scan back. Nothing was read and nothing written.
    Skipped(GateDecision),
    Completed {
        decision: GateDecision,
        report: ScanReport,
        watchlist: PathBuf,
    },
}

/// Gate, scan and write the watchlist for `run_date`.
pub fn run_scan_job(
    config: &ScanConfig,
    store: &PriceStore,
    universe: &Universe,
    breadth: &dyn BreadthSource,
    run_date: NaiveDate,
) -> Result<ScanOutcome, ScanJobError> {
    let decision = MarketGate::new(config.gate.clone()).evaluate(breadth);
    if !decision.proceeds() {
        return Ok(ScanOutcome::Skipped(decision));
    }

    let report = TrendScanner::new(store, config.scan.clone()).scan(universe)?;
    let watchlist = WatchlistSink::new(&config.paths.output_dir).write(run_date, &report.records)?;

    Ok(ScanOutcome::Completed {
        decision,
        report,
        watchlist,
    })
}
