//! Analytics modules.
//!
//! Derived statistics for the selected agency.

pub mod aggregator;

pub use aggregator::*;
