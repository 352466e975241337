//! Domain types for trendscan

pub mod bar;
pub mod instrument;
pub mod signal;

pub use bar::{PriceBar, PriceSeries};
pub use instrument::{normalize_code, Instrument, Market};
pub use signal::{round2, SignalKind, SignalRecord};
