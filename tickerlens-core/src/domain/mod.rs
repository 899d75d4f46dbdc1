//! Domain types: the rows that flow through the pipeline.

pub mod fundamental;
pub mod price;
pub mod row;

pub use fundamental::{FundamentalRow, RawFundamentalRow, SourceTier, TierBatch};
pub use price::{PriceRow, RawPriceRow};
pub use row::{AlignedRow, CarriedFundamentals, IndicatorRow, SignalEvent, SignalKind};
