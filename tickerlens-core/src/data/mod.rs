//! Data ingestion: validation, alignment, providers and the price cache.

pub mod align;
pub mod cache;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod validate;
pub mod yahoo;

pub use align::{align_series, AlignError, EmptySeriesError};
pub use cache::{CacheLoad, CacheMeta, CacheStatus, PriceCache};
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, PriceFetch};
pub use synthetic::SyntheticProvider;
pub use validate::{DroppedRow, Validated, ValidationError};
pub use yahoo::YahooProvider;
