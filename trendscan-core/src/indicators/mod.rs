//! Derived series computed from a stored daily history.
//!
//! Everything here is pure: the scanner re-derives weekly bars and their
//! moving average from the cache on every run, nothing is persisted.

pub mod crossover;
pub mod sma;
pub mod weekly;

pub use crossover::crossed_above;
pub use sma::Sma;
pub use weekly::{resample_weekly, weekly_with_ma, WeeklyBar};

/// Create synthetic daily bars from close prices for testing.
///
/// One bar per weekday starting Monday 2024-01-01; weekends are skipped so
/// five consecutive closes make up one ISO week.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::PriceBar> {
    use crate::domain::PriceBar;
    use chrono::{Datelike, Weekday};

    let mut date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut bars = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date.succ_opt().unwrap();
        }
        let open = if i == 0 { close } else { closes[i - 1] };
        bars.push(PriceBar {
            date,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1000.0,
        });
        date = date.succ_opt().unwrap();
    }
    bars
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
