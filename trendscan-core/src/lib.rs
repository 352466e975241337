//! TrendScan core: price history cache and weekly trend indicators.
//!
//! - `domain`: instruments, daily bars, series with merge semantics, signal records
//! - `data`: flat-file price store, vendor providers, breadth sources, universe
//! - `indicators`: SMA, weekly resample, crossover detection
//! - `clock`: injectable "today"

pub mod clock;
pub mod data;
pub mod domain;
pub mod indicators;
