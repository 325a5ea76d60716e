//! Agency analytics and statistics.
//!
//! Pure derivations over an agency's references and the data loaded for
//! it. Nothing here fetches.

use crate::models::{
    Agency, AnalyticsSummary, HistoricalData, HistorySummary, TitleAnalytics, TitleChange,
    TitleData,
};
use std::collections::BTreeSet;

/// Distinct titles referenced by the agency, ascending.
pub fn unique_titles(agency: &Agency) -> Vec<u32> {
    agency
        .cfr_references
        .iter()
        .map(|r| r.title)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reference counts for an agency.
pub fn summarize(agency: &Agency) -> AnalyticsSummary {
    AnalyticsSummary {
        total_references: agency.cfr_references.len(),
        unique_title_count: unique_titles(agency).len(),
        child_agency_count: agency.children.len(),
    }
}

/// Analytics for one of the agency's titles.
///
/// Missing word-count data shows up as zero and an empty date.
pub fn title_analytics(agency: &Agency, title_data: &[TitleData], title: u32) -> TitleAnalytics {
    let entry = title_data.iter().find(|d| d.title == title);

    TitleAnalytics {
        title,
        word_count: entry.map(|d| d.word_count).unwrap_or(0),
        last_updated: entry.map(|d| d.last_updated.clone()).unwrap_or_default(),
        reference_count: agency
            .cfr_references
            .iter()
            .filter(|r| r.title == title)
            .count(),
    }
}

/// Sum of all loaded title word counts.
pub fn total_word_count(title_data: &[TitleData]) -> u64 {
    title_data.iter().map(|d| d.word_count).sum()
}

/// First-to-last overview of a word-count history. `None` when empty.
pub fn summarize_history(history: &[HistoricalData]) -> Option<HistorySummary> {
    let first = history.first()?;
    let last = history.last()?;

    Some(HistorySummary {
        points: history.len(),
        first_date: first.date.clone(),
        last_date: last.date.clone(),
        first_word_count: first.word_count,
        last_word_count: last.word_count,
        net_change: last.word_count as i64 - first.word_count as i64,
    })
}

/// Net change in referenced titles across the change log.
pub fn net_title_change(changes: &[TitleChange]) -> i64 {
    changes.iter().map(|c| c.difference).sum()
}
