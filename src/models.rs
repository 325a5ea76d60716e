//! Data models for the agency explorer.
//!
//! This module contains the agency tree as delivered by the data source
//! and the per-agency analytics records derived from it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A reference from an agency to part of the Code of Federal Regulations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfrReference {
    /// CFR title number.
    pub title: u32,
    /// Chapter within the title, if the reference is that specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    /// Subtitle within the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl CfrReference {
    /// Creates a title-level reference.
    #[cfg(test)]
    pub fn title(title: u32) -> Self {
        Self {
            title,
            chapter: None,
            subtitle: None,
        }
    }
}

impl fmt::Display for CfrReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Title {}", self.title)?;
        if let Some(ref subtitle) = self.subtitle {
            write!(f, ", Subtitle {}", subtitle)?;
        }
        if let Some(ref chapter) = self.chapter {
            write!(f, ", Chapter {}", chapter)?;
        }
        Ok(())
    }
}

/// A federal agency and its sub-agencies.
///
/// `children` and `cfr_references` are always present, defaulting to empty
/// when the source omits them or sends `null`. Malformed children and
/// references are dropped one by one; only a missing `slug` rejects the
/// agency itself. Children are shared behind `Arc` so filtered views can
/// reuse untouched subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sortable_name: String,
    /// Unique key of the agency.
    pub slug: String,
    #[serde(default, deserialize_with = "lenient_records")]
    pub children: Vec<Arc<Agency>>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub cfr_references: Vec<CfrReference>,
}

impl Agency {
    /// The name shown to users: the display name, or the plain name when
    /// no display name was provided.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Returns true if this agency directly references the given title.
    pub fn references_title(&self, title: u32) -> bool {
        self.cfr_references.iter().any(|r| r.title == title)
    }
}

/// Word count for one CFR title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleData {
    pub title: u32,
    pub word_count: u64,
    /// Date the count was taken for (as reported by the source).
    pub last_updated: String,
}

/// One point in an agency's word-count history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(
        default,
        alias = "total_words",
        alias = "wordCount",
        deserialize_with = "null_as_default"
    )]
    pub word_count: u64,
}

/// Change in the number of titles an agency references at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleChange {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, alias = "titleCount", deserialize_with = "null_as_default")]
    pub title_count: u64,
    /// Title records as delivered by the source; not interpreted here.
    #[serde(default, deserialize_with = "null_as_default")]
    pub titles: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub difference: i64,
}

/// Raw payload of the title word-count endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordCountResponse {
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Parse each item on its own, skipping (and logging) the ones that do not
/// deserialize.
pub fn parse_records<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}

/// `null` deserializes to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A nested list where bad entries are dropped instead of failing the parent.
fn lenient_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(parse_records(items)),
        Value::Null => Ok(Vec::new()),
        other => {
            warn!("Expected a list, got {}", other);
            Ok(Vec::new())
        }
    }
}

/// Aggregate counts for the selected agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Number of CFR references, duplicates included.
    pub total_references: usize,
    /// Number of distinct titles referenced.
    pub unique_title_count: usize,
    /// Number of direct child agencies.
    pub child_agency_count: usize,
}

/// Analytics for a single title of the selected agency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleAnalytics {
    pub title: u32,
    /// Loaded word count, or 0 when no data is available.
    pub word_count: u64,
    /// Date of the loaded word count, or empty.
    pub last_updated: String,
    /// How many of the agency's references point at this title.
    pub reference_count: usize,
}

/// Overview of an agency's word-count history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub points: usize,
    pub first_date: String,
    pub last_date: String,
    pub first_word_count: u64,
    pub last_word_count: u64,
    pub net_change: i64,
}

/// Metadata about an explorer report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Base URL of the data source.
    pub api_url: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Search query applied to the agency tree, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    /// Number of agencies in the full forest, children included.
    pub total_agencies: usize,
    /// Number of agencies in the filtered forest, children included.
    pub matching_agencies: usize,
}

/// Everything loaded for the selected agency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub slug: String,
    pub name: String,
    pub summary: AnalyticsSummary,
    pub unique_titles: Vec<u32>,
    /// Loaded word counts, ordered by title.
    pub title_data: Vec<TitleData>,
    pub total_word_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_title: Option<TitleAnalytics>,
    pub history: Vec<HistoricalData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<HistorySummary>,
    pub changes: Vec<TitleChange>,
    pub net_title_change: i64,
}

/// The complete explorer report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// The (possibly filtered) agency forest.
    pub agencies: Vec<Arc<Agency>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionReport>,
}
