//! SyncEngine: incremental fetch-and-merge across the universe.
//!
//! For each instrument the resume point is derived from the stored series
//! (day after its last bar, or the configured floor). Instruments already
//! current are skipped without touching the provider. Everything else is
//! fetched, merged and persisted, up to `max_per_run` successful merges.
//!
//! A failed, unparsable or empty fetch is logged and counted; the instrument
//! is simply retried on the next invocation. Once the provider refuses
//! requests (circuit breaker open) the walk stops and the remaining
//! instruments are left as not reached. Only store failures abort.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use trendscan_core::clock::Clock;
use trendscan_core::data::{DataError, PriceProvider, PriceStore, Universe};
use trendscan_core::domain::Instrument;

use crate::config::SyncConfig;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("price store failure for {code}: {source}")]
    Store {
        code: String,
        #[source]
        source: DataError,
    },
}

/// Order in which the universe is walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOrder {
    /// Universe file order. The quota always favors the same prefix.
    #[default]
    AsLoaded,
    /// Shuffled with a seed derived from the run date: reproducible within a
    /// day, different across days.
    Shuffle,
}

/// Blocking pause between fetch attempts.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// What happened to one instrument during a sync.
#[derive(Debug)]
pub enum InstrumentOutcome {
    /// Resume point is today or later; no fetch.
    UpToDate,
    /// New bars merged and persisted.
    Merged {
        fetched: usize,
        last_date: Option<NaiveDate>,
    },
    /// Provider returned no bars.
    Empty,
    Failed(DataError),
}

/// Observer for sync progress.
pub trait SyncProgress {
    /// Called before an instrument is examined.
    fn on_start(&self, code: &str, index: usize, total: usize);

    /// Called once an instrument's outcome is known.
    fn on_outcome(&self, code: &str, index: usize, total: usize, outcome: &InstrumentOutcome);

    /// Called when the run is done.
    fn on_batch_complete(&self, summary: &SyncSummary);
}

/// Progress reporter that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl SyncProgress for TracingProgress {
    fn on_start(&self, code: &str, index: usize, total: usize) {
        tracing::debug!(code, index = index + 1, total, "checking instrument");
    }

    fn on_outcome(&self, code: &str, index: usize, total: usize, outcome: &InstrumentOutcome) {
        let position = index + 1;
        match outcome {
            InstrumentOutcome::UpToDate => {
                tracing::debug!(code, position, total, "already current")
            }
            InstrumentOutcome::Merged { fetched, last_date } => tracing::info!(
                code,
                position,
                total,
                fetched,
                last_date = ?last_date,
                "updated"
            ),
            InstrumentOutcome::Empty => {
                tracing::info!(code, position, total, "no new bars")
            }
            InstrumentOutcome::Failed(err) => {
                tracing::warn!(code, position, total, error = %err, "fetch failed")
            }
        }
    }

    fn on_batch_complete(&self, summary: &SyncSummary) {
        tracing::info!(
            total = summary.total,
            processed = summary.processed,
            up_to_date = summary.up_to_date,
            empty = summary.empty,
            failed = summary.failed,
            "sync complete"
        );
    }
}

/// Summary of one sync invocation.
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Instruments in the universe.
    pub total: usize,
    /// Instruments with new bars merged and persisted.
    pub processed: usize,
    pub up_to_date: usize,
    pub empty: usize,
    pub failed: usize,
    pub failures: Vec<(String, DataError)>,
}

impl SyncSummary {
    /// Instruments never examined because the quota ran out.
    pub fn not_reached(&self) -> usize {
        self.total
            .saturating_sub(self.processed + self.up_to_date + self.empty + self.failed)
    }
}

pub struct SyncEngine<'a> {
    store: &'a PriceStore,
    provider: &'a dyn PriceProvider,
    clock: &'a dyn Clock,
    pacer: &'a dyn Pacer,
    progress: &'a dyn SyncProgress,
    config: SyncConfig,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        store: &'a PriceStore,
        provider: &'a dyn PriceProvider,
        clock: &'a dyn Clock,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
            pacer: &ThreadPacer,
            progress: &TracingProgress,
            config,
        }
    }

    pub fn with_pacer(mut self, pacer: &'a dyn Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn SyncProgress) -> Self {
        self.progress = progress;
        self
    }

    fn pause_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.config.sleep_secs).unwrap_or(Duration::ZERO)
    }

    /// Walk the universe once. Returns the run summary; `processed` is the
    /// number of instruments whose series grew.
    pub fn run(&self, universe: &Universe) -> Result<SyncSummary, SyncError> {
        let instruments = ordered(universe, self.config.order, self.clock.today());
        let total = instruments.len();
        let pause = self.pause_duration();
        let mut summary = SyncSummary {
            total,
            ..SyncSummary::default()
        };

        tracing::info!(
            provider = self.provider.name(),
            total,
            max_per_run = self.config.max_per_run,
            order = ?self.config.order,
            "sync starting"
        );

        for (i, inst) in instruments.iter().enumerate() {
            if summary.processed >= self.config.max_per_run {
                tracing::info!(processed = summary.processed, "per-run quota reached");
                break;
            }

            let code = inst.code.as_str();
            self.progress.on_start(code, i, total);

            let existing = self.store.load(code).map_err(|source| SyncError::Store {
                code: code.to_string(),
                source,
            })?;
            let start = existing.resume_date(self.config.start_date);

            if start >= self.clock.today() {
                summary.up_to_date += 1;
                self.progress
                    .on_outcome(code, i, total, &InstrumentOutcome::UpToDate);
                continue;
            }

            let fetched = self.provider.fetch(code, start);
            let outcome = match fetched {
                Ok(incoming) if incoming.is_empty() => {
                    summary.empty += 1;
                    InstrumentOutcome::Empty
                }
                Ok(incoming) => {
                    let merged = existing.merge(&incoming);
                    self.store
                        .persist(code, &merged)
                        .map_err(|source| SyncError::Store {
                            code: code.to_string(),
                            source,
                        })?;
                    summary.processed += 1;
                    InstrumentOutcome::Merged {
                        fetched: incoming.len(),
                        last_date: merged.last_date(),
                    }
                }
                Err(e) if e.is_store_failure() => {
                    return Err(SyncError::Store {
                        code: code.to_string(),
                        source: e,
                    })
                }
                Err(e) => {
                    summary.failed += 1;
                    InstrumentOutcome::Failed(e)
                }
            };

            self.progress.on_outcome(code, i, total, &outcome);
            if let InstrumentOutcome::Failed(e) = outcome {
                let refused = matches!(e, DataError::CircuitBreakerTripped)
                    || !self.provider.is_available();
                summary.failures.push((code.to_string(), e));
                if refused {
                    // Every later fetch would be refused too; leave them for the next run.
                    tracing::warn!(
                        provider = self.provider.name(),
                        not_reached = summary.not_reached(),
                        "provider is refusing requests, stopping sync"
                    );
                    break;
                }
            }

            self.pacer.pause(pause);
        }

        self.progress.on_batch_complete(&summary);
        Ok(summary)
    }
}

/// Instruments in the order the run should walk them.
pub fn ordered(universe: &Universe, order: SyncOrder, run_date: NaiveDate) -> Vec<Instrument> {
    let mut instruments = universe.instruments().to_vec();
    if order == SyncOrder::Shuffle {
        let mut rng = StdRng::seed_from_u64(run_date.num_days_from_ce() as u64);
        instruments.shuffle(&mut rng);
    }
    instruments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(n: usize) -> Universe {
        Universe::new((1..=n).map(|i| Instrument::new(&format!("{i:06}"), "X")))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn as_loaded_keeps_universe_order() {
        let u = universe(5);
        let codes: Vec<String> = ordered(&u, SyncOrder::AsLoaded, d(2024, 6, 3))
            .into_iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec!["000001", "000002", "000003", "000004", "000005"]);
    }

    #[test]
    fn shuffle_is_stable_within_a_day() {
        let u = universe(50);
        let a = ordered(&u, SyncOrder::Shuffle, d(2024, 6, 3));
        let b = ordered(&u, SyncOrder::Shuffle, d(2024, 6, 3));
        let c = ordered(&u, SyncOrder::Shuffle, d(2024, 6, 4));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn order_parses_from_config_names() {
        let order: SyncOrder = serde_json::from_str("\"shuffle\"").unwrap();
        assert_eq!(order, SyncOrder::Shuffle);
        let order: SyncOrder = serde_json::from_str("\"as_loaded\"").unwrap();
        assert_eq!(order, SyncOrder::AsLoaded);
    }

    #[test]
    fn not_reached_counts_remaining() {
        let summary = SyncSummary {
            total: 10,
            processed: 3,
            up_to_date: 2,
            failed: 1,
            ..SyncSummary::default()
        };
        assert_eq!(summary.not_reached(), 4);
    }
}
