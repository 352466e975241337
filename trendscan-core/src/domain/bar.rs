//! PriceBar and PriceSeries: the per-instrument daily history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV bar for a single instrument.
///
/// Column order matches the on-disk cache: `date, open, high, low, close, volume`.
/// Volume is a float because caches written by earlier tooling store `1234.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Returns true if any price field is NaN or volume is negative/NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
            || self.volume < 0.0
    }
}

/// Ordered daily history for one instrument.
///
/// Invariant: dates are unique and strictly increasing. Every constructor
/// enforces it, so a `PriceSeries` in hand is always normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from bars in any order. Later bars win on duplicate dates.
    pub fn from_bars(bars: Vec<PriceBar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
        for bar in bars {
            by_date.insert(bar.date, bar);
        }
        Self {
            bars: by_date.into_values().collect(),
        }
    }

    /// Union by date of `self` and `incoming`; incoming wins on shared dates.
    ///
    /// Idempotent: `a.merge(x).merge(x) == a.merge(x)`.
    pub fn merge(&self, incoming: &PriceSeries) -> PriceSeries {
        let mut by_date: BTreeMap<NaiveDate, PriceBar> = self
            .bars
            .iter()
            .map(|b| (b.date, b.clone()))
            .collect();
        for bar in &incoming.bars {
            by_date.insert(bar.date, bar.clone());
        }
        PriceSeries {
            bars: by_date.into_values().collect(),
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// The implicit checkpoint: day after the last stored bar, or `floor` when empty.
    pub fn resume_date(&self, floor: NaiveDate) -> NaiveDate {
        match self.last_date() {
            Some(last) => last.succ_opt().unwrap_or(last),
            None => floor,
        }
    }

    /// Sum of volume over the trailing `n` bars (fewer if the series is shorter).
    pub fn trailing_volume(&self, n: usize) -> f64 {
        let start = self.bars.len().saturating_sub(n);
        self.bars[start..].iter().map(|b| b.volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> PriceBar {
        PriceBar {
            date,
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn from_bars_sorts_and_dedups() {
        let s = PriceSeries::from_bars(vec![
            bar(d(2024, 1, 3), 11.0),
            bar(d(2024, 1, 2), 10.0),
            bar(d(2024, 1, 3), 12.0),
        ]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.bars()[0].date, d(2024, 1, 2));
        // Later duplicate wins
        assert_eq!(s.bars()[1].close, 12.0);
    }

    #[test]
    fn merge_incoming_wins_on_overlap() {
        let existing = PriceSeries::from_bars(vec![bar(d(2024, 1, 2), 10.0), bar(d(2024, 1, 3), 11.0)]);
        let incoming = PriceSeries::from_bars(vec![bar(d(2024, 1, 3), 11.5), bar(d(2024, 1, 4), 12.0)]);

        let merged = existing.merge(&incoming);
        let closes: Vec<f64> = merged.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.5, 12.0]);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = PriceSeries::from_bars(vec![bar(d(2024, 1, 2), 10.0)]);
        let incoming = PriceSeries::from_bars(vec![bar(d(2024, 1, 2), 9.0), bar(d(2024, 1, 5), 12.0)]);

        let once = existing.merge(&incoming);
        let twice = once.merge(&incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_drops_history() {
        let existing = PriceSeries::from_bars(vec![bar(d(2020, 6, 1), 5.0), bar(d(2024, 1, 2), 10.0)]);
        let merged = existing.merge(&PriceSeries::empty());
        assert_eq!(merged, existing);
    }

    #[test]
    fn resume_date_is_day_after_last_bar() {
        let floor = d(2018, 1, 1);
        assert_eq!(PriceSeries::empty().resume_date(floor), floor);

        let s = PriceSeries::from_bars(vec![bar(d(2024, 2, 29), 10.0)]);
        assert_eq!(s.resume_date(floor), d(2024, 3, 1));
    }

    #[test]
    fn trailing_volume_sums_last_n() {
        let mut bars: Vec<PriceBar> = (1..=12).map(|i| bar(d(2024, 1, i), 10.0)).collect();
        for b in bars.iter_mut().skip(2) {
            b.volume = 0.0;
        }
        let s = PriceSeries::from_bars(bars);
        assert_eq!(s.trailing_volume(10), 0.0);
        assert_eq!(s.trailing_volume(12), 2_000.0);
        assert_eq!(s.trailing_volume(100), 2_000.0);
    }

    #[test]
    fn void_bar_detection() {
        let mut b = bar(d(2024, 1, 2), 10.0);
        assert!(!b.is_void());
        b.volume = -1.0;
        assert!(b.is_void());
    }
}
