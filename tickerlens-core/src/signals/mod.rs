//! Signal detection over indicator rows.
//!
//! Signals are derived facts about the indicator series: for a given input
//! series the event list is fixed and never revised.

pub mod crossover;

pub use crossover::{classify, detect_crossovers, scan, CrossPoint};
