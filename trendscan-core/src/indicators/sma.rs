//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1). Earlier
//! positions are NaN, and any NaN inside a window makes that window NaN.

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    pub fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = values[..self.period].iter().sum();
        let mut nan_in_window = values[..self.period].iter().any(|v| v.is_nan());
        if !nan_in_window {
            result[self.period - 1] = sum / self.period as f64;
        }

        for i in self.period..n {
            let leaving = values[i - self.period];
            let entering = values[i];

            if entering.is_nan() || leaving.is_nan() || nan_in_window {
                // Running sum is poisoned; rescan the window.
                let window = &values[(i + 1 - self.period)..=i];
                nan_in_window = window.iter().any(|v| v.is_nan());
                sum = window.iter().sum();
                if nan_in_window {
                    continue;
                }
            } else {
                sum = sum - leaving + entering;
            }

            result[i] = sum / self.period as f64;
        }

        result
    }
}
