//! Agency tree search.

pub mod filter;

pub use filter::*;
