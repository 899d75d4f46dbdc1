//! tickerlens runner: everything around the core pipeline.
//!
//! This crate builds on `tickerlens-core` to provide:
//! - TOML configuration and ticker normalization
//! - Data loading with provider/cache fallback and fundamentals tier degradation
//! - SQLite persistence of daily metrics and signal events
//! - JSON export of the per-ticker output record
//! - Single-ticker and parallel batch drivers
//! - `tracing` subscriber setup

pub mod config;
pub mod data_loader;
pub mod export;
pub mod logging;
pub mod runner;
pub mod store;
pub mod ticker;

pub use config::{AppConfig, ConfigError, ProviderKind};
pub use data_loader::{load_ticker, LoadError, LoadOptions, LoadedTicker};
pub use export::{read_record, write_record, ExportError, LatestSnapshot, OutputRecord};
pub use logging::init_logging;
pub use runner::{
    run_batch, run_ticker, BatchSummary, RunContext, RunError, RunFlags, TickerRun,
};
pub use store::{MetricsStore, SaveSummary, StoreError};
pub use ticker::normalize_ticker;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_context_is_shareable_across_workers() {
        assert_send::<RunContext>();
        assert_sync::<RunContext>();
    }

    #[test]
    fn ticker_run_is_send_sync() {
        assert_send::<TickerRun>();
        assert_sync::<TickerRun>();
        assert_send::<OutputRecord>();
        assert_sync::<OutputRecord>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }

    #[test]
    fn store_moves_between_threads() {
        assert_send::<MetricsStore>();
    }
}
