//! Upward crossover of a price over its moving average.

use super::weekly::WeeklyBar;

/// True when `this` closes strictly above its average and `last` closed at
/// or below its own. An undefined (NaN) value on either side never fires.
pub fn crossed_above(last: &WeeklyBar, this: &WeeklyBar) -> bool {
    if last.close.is_nan() || last.ma.is_nan() || this.close.is_nan() || this.ma.is_nan() {
        return false;
    }
    this.close > this.ma && last.close <= last.ma
}
