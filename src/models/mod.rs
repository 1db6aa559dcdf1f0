//! Domain models shared across the whole dashboard client.

pub mod market;
pub mod record;
pub mod snapshot;

pub use market::{Candle, ChartRange, Opportunity};
pub use record::{parse_record, Currency, IndicatorKind, Indicators, Record, Region, Volatility};
pub use snapshot::{Provenance, Snapshot};
