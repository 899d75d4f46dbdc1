//! tickerlens core: the per-ticker merge-and-derive pipeline.
//!
//! - Domain rows (raw, validated, aligned, indicator) and signal events
//! - Schema validation with explicit drop reports
//! - Daily/quarterly alignment with monotonic, look-ahead-free carry-forward
//! - Moving averages, 52-week high and fundamental ratios
//! - Golden/death cross detection and quality grading
//! - Data providers (Yahoo Finance, CSV import, synthetic) and the Parquet price cache
//!
//! Nothing here logs or touches shared state; each ticker is an independent
//! unit of work.

pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod pipeline;
pub mod quality;
pub mod signals;

pub use pipeline::{process_ticker, PipelineError, StageReport, TickerAnalysis, TickerInput};
pub use quality::QualityGrade;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses the batch boundary is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::RawPriceRow>();
        require_sync::<domain::RawPriceRow>();
        require_send::<domain::TierBatch>();
        require_sync::<domain::TierBatch>();
        require_send::<domain::IndicatorRow>();
        require_sync::<domain::IndicatorRow>();
        require_send::<domain::SignalEvent>();
        require_sync::<domain::SignalEvent>();

        require_send::<TickerInput>();
        require_sync::<TickerInput>();
        require_send::<TickerAnalysis>();
        require_sync::<TickerAnalysis>();
        require_send::<PipelineError>();
        require_sync::<PipelineError>();

        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::PriceCache>();
        require_sync::<data::PriceCache>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();

        require_send::<indicators::IndicatorEngine>();
        require_sync::<indicators::IndicatorEngine>();

        // The pipeline takes only its input; no provider or connection leaks in.
        let _: fn(&TickerInput) -> Result<TickerAnalysis, PipelineError> = process_ticker;
    }
}
