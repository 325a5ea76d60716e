//! Explorer state.

pub mod explorer;

pub use explorer::Explorer;
