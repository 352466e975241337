//! TrendScanner: weekly close crossing above its weekly moving average.
//!
//! Per instrument, in universe order:
//! 1. daily history of at least `min_list_days` bars
//! 2. nonzero summed volume over the trailing `volume_lookback` bars
//! 3. at least `ma_window + 1` weekly bars
//! 4. fire when the latest week crosses above its average
//!
//! Stops as soon as `max_output` records are collected, so a capped result
//! is always the hits from a universe-order prefix.

use thiserror::Error;
use trendscan_core::data::{DataError, PriceStore, Universe};
use trendscan_core::domain::{round2, Instrument, SignalKind, SignalRecord};
use trendscan_core::indicators::{crossed_above, weekly_with_ma};

use crate::config::ScanParams;

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("price store failure for {code}: {source}")]
    Store {
        code: String,
        #[source]
        source: DataError,
    },
}

/// Per-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Instruments examined before the run ended.
    pub scanned: usize,
    /// Too few daily or weekly bars.
    pub insufficient_history: usize,
    /// Zero traded volume over the lookback.
    pub inactive: usize,
    /// No stored series at all.
    pub missing: usize,
    pub signals: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub records: Vec<SignalRecord>,
    pub summary: ScanSummary,
}

/// Why an instrument produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Missing,
    ShortHistory,
    Inactive,
    NoCross,
}

pub struct TrendScanner<'a> {
    store: &'a PriceStore,
    params: ScanParams,
}

impl<'a> TrendScanner<'a> {
    pub fn new(store: &'a PriceStore, params: ScanParams) -> Self {
        Self { store, params }
    }

    /// Scan the universe against the store snapshot.
    pub fn scan(&self, universe: &Universe) -> Result<ScanReport, ScanError> {
        let total = universe.len();
        let mut report = ScanReport::default();

        tracing::info!(
            total,
            ma_window = self.params.ma_window,
            max_output = self.params.max_output,
            "scan starting"
        );

        for inst in universe.instruments() {
            if report.records.len() >= self.params.max_output {
                tracing::info!(max_output = self.params.max_output, "output cap reached");
                break;
            }

            report.summary.scanned += 1;
            if report.summary.scanned % PROGRESS_EVERY == 0 {
                tracing::info!(scanned = report.summary.scanned, total, "scan progress");
            }

            match self.evaluate(inst)? {
                Ok(record) => {
                    tracing::info!(code = %record.code, close = record.close, ma = record.ma, "signal");
                    report.records.push(record);
                }
                Err(Skip::Missing) => report.summary.missing += 1,
                Err(Skip::ShortHistory) => report.summary.insufficient_history += 1,
                Err(Skip::Inactive) => report.summary.inactive += 1,
                Err(Skip::NoCross) => {}
            }
        }

        report.summary.signals = report.records.len();
        tracing::info!(
            scanned = report.summary.scanned,
            signals = report.summary.signals,
            insufficient_history = report.summary.insufficient_history,
            inactive = report.summary.inactive,
            missing = report.summary.missing,
            "scan complete"
        );
        Ok(report)
    }

    fn evaluate(&self, inst: &Instrument) -> Result<Result<SignalRecord, Skip>, ScanError> {
        let series = self.store.load(&inst.code).map_err(|source| ScanError::Store {
            code: inst.code.clone(),
            source,
        })?;

        if series.is_empty() {
            return Ok(Err(Skip::Missing));
        }
        if series.len() < self.params.min_list_days {
            return Ok(Err(Skip::ShortHistory));
        }
        if series.trailing_volume(self.params.volume_lookback) == 0.0 {
            return Ok(Err(Skip::Inactive));
        }

        let window = self.params.ma_window.max(1);
        let weekly = weekly_with_ma(series.bars(), window);
        if weekly.len() < window + 1 {
            return Ok(Err(Skip::ShortHistory));
        }

        let this = &weekly[weekly.len() - 1];
        let last = &weekly[weekly.len() - 2];
        if !crossed_above(last, this) {
            return Ok(Err(Skip::NoCross));
        }

        Ok(Ok(SignalRecord {
            code: inst.code.clone(),
            name: inst.name.clone(),
            close: round2(this.close),
            ma: round2(this.ma),
            kind: SignalKind::WeeklyTrendUp,
        }))
    }
}
