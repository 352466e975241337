//! Price data: storage, vendor providers, breadth, universe

pub mod breadth;
pub mod circuit_breaker;
pub mod eastmoney;
pub mod provider;
pub mod store;
pub mod universe;

pub use breadth::{BreadthSource, EastmoneyBreadth, FixedBreadth};
pub use circuit_breaker::CircuitBreaker;
pub use eastmoney::{parse_kline_payload, EastmoneyProvider};
pub use provider::{DataError, PriceProvider};
pub use store::{PriceStore, SeriesStatus};
pub use universe::{read_instruments, Universe, UniverseError};
