//! Weekly resample and the weekly moving average.
//!
//! A week is an ISO week (Monday through Sunday). The weekly bar is the last
//! trading bar inside that week; weeks without trading produce no bar.

use super::sma::Sma;
use crate::domain::PriceBar;
use chrono::{Datelike, IsoWeek, NaiveDate};

/// Last trading observation of one ISO week, with the trailing mean of
/// weekly closes. `ma` is NaN until `window` weeks are available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyBar {
    /// Date of the last trading day in the week.
    pub date: NaiveDate,
    pub close: f64,
    pub ma: f64,
}

/// Collapse ascending daily bars to one bar per ISO week (the week's last bar).
pub fn resample_weekly(daily: &[PriceBar]) -> Vec<PriceBar> {
    let mut out: Vec<PriceBar> = Vec::new();
    let mut current: Option<IsoWeek> = None;

    for bar in daily {
        let week = bar.date.iso_week();
        if current == Some(week) {
            if let Some(last) = out.last_mut() {
                *last = bar.clone();
            }
        } else {
            out.push(bar.clone());
            current = Some(week);
        }
    }

    out
}

/// Weekly bars with a `window`-week simple moving average of closes.
pub fn weekly_with_ma(daily: &[PriceBar], window: usize) -> Vec<WeeklyBar> {
    let weeks = resample_weekly(daily);
    let closes: Vec<f64> = weeks.iter().map(|b| b.close).collect();
    let ma = Sma::new(window).compute(&closes);

    weeks
        .iter()
        .zip(ma)
        .map(|(bar, ma)| WeeklyBar {
            date: bar.date,
            close: bar.close,
            ma,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar_on(date: NaiveDate, close: f64) -> PriceBar {
        PriceBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn takes_last_bar_of_each_week() {
        // Mon 2024-01-01 .. Fri 2024-01-12, two full weeks
        let daily = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let weeks = resample_weekly(&daily);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].date, d(2024, 1, 5));
        assert_eq!(weeks[0].close, 5.0);
        assert_eq!(weeks[1].date, d(2024, 1, 12));
        assert_eq!(weeks[1].close, 10.0);
    }

    #[test]
    fn holiday_week_produces_no_bar() {
        let daily = vec![
            bar_on(d(2024, 9, 27), 10.0),
            // 2024-09-30 .. 2024-10-04: market closed except Monday
            bar_on(d(2024, 9, 30), 11.0),
            // 2024-10-07 .. 2024-10-13: nothing traded
            bar_on(d(2024, 10, 14), 12.0),
        ];
        let weeks = resample_weekly(&daily);
        let dates: Vec<NaiveDate> = weeks.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2024, 9, 27), d(2024, 9, 30), d(2024, 10, 14)]);
    }

    #[test]
    fn iso_week_spans_year_boundary() {
        // 2024-12-30 (Mon) and 2025-01-03 (Fri) are both ISO week 2025-W01
        let daily = vec![bar_on(d(2024, 12, 27), 1.0), bar_on(d(2024, 12, 30), 2.0), bar_on(d(2025, 1, 3), 3.0)];
        let weeks = resample_weekly(&daily);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].date, d(2025, 1, 3));
    }

    #[test]
    fn moving_average_defined_after_window() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let daily: Vec<PriceBar> = make_bars(&closes.iter().flat_map(|&c| [c; 5]).collect::<Vec<_>>());
        let weekly = weekly_with_ma(&daily, 4);

        assert_eq!(weekly.len(), 20);
        assert!(weekly[2].ma.is_nan());
        assert_approx(weekly[3].ma, 2.5, DEFAULT_EPSILON);
        assert_approx(weekly[19].ma, 18.5, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_input() {
        assert!(resample_weekly(&[]).is_empty());
        assert!(weekly_with_ma(&[], 20).is_empty());
    }
}
