//! Data source abstraction.
//!
//! The explorer never talks HTTP directly; it goes through [`DataSource`],
//! implemented over the REST API by [`HttpDataSource`] and by an in-memory
//! double in tests.

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::{HttpDataSource, SourceConfig};

use crate::error::Result;
use crate::models::{parse_records, Agency, HistoricalData, TitleChange, WordCountResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Everything the explorer needs from the regulatory data API.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the full agency forest.
    async fn agencies(&self) -> Result<Vec<Arc<Agency>>>;

    /// Fetch the word-count history for one agency.
    async fn historical_word_counts(&self, agency_slug: &str) -> Result<Vec<HistoricalData>>;

    /// Fetch the title-count change log for one agency.
    async fn agency_changes(&self, agency_slug: &str) -> Result<Vec<TitleChange>>;

    /// Fetch the current word count of one title.
    async fn title_word_count(&self, title: u32) -> Result<WordCountResponse>;
}

/// Extract the agency array from a response body.
///
/// Accepts a bare array, or an object carrying the array under `agencies`
/// or `data`. Anything else yields an empty forest.
pub fn normalize_agency_list(body: Value) -> Vec<Arc<Agency>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("agencies").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Agency response has no agencies/data array");
                return Vec::new();
            }
        },
        _ => {
            warn!("Unexpected agency response shape");
            return Vec::new();
        }
    };

    parse_records(items)
}

/// Parse a response that should be an array of records.
///
/// Non-array bodies normalize to empty; individual malformed records are
/// skipped.
pub fn normalize_list<T: DeserializeOwned>(body: Value) -> Vec<T> {
    match body {
        Value::Array(items) => parse_records(items),
        Value::Null => Vec::new(),
        _ => {
            warn!("Expected an array response, got something else");
            Vec::new()
        }
    }
}
