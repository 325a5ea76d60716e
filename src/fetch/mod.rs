//! Fetch orchestration for per-agency data.

pub mod batch;
pub mod history;

pub use batch::{apply_refresh, load_title_data, refresh_single_title, DEFAULT_BATCH_SIZE};
pub use history::{load_changes, load_history};
