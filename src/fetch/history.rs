//! Word-count history and change-log loading.
//!
//! Both loaders swallow failures: the caller always gets a collection,
//! empty when the source had nothing or could not be reached.

use crate::models::{HistoricalData, TitleChange};
use crate::source::DataSource;
use tracing::{debug, warn};

/// Load an agency's word-count history, oldest point first.
pub async fn load_history(source: &dyn DataSource, agency_slug: &str) -> Vec<HistoricalData> {
    match source.historical_word_counts(agency_slug).await {
        Ok(mut history) => {
            history.sort_by(|a, b| a.date.cmp(&b.date));
            debug!("Loaded {} history points for {}", history.len(), agency_slug);
            history
        }
        Err(e) => {
            warn!("Failed to load history for {}: {}", agency_slug, e);
            Vec::new()
        }
    }
}

/// Load an agency's title change log.
pub async fn load_changes(source: &dyn DataSource, agency_slug: &str) -> Vec<TitleChange> {
    match source.agency_changes(agency_slug).await {
        Ok(changes) => {
            debug!("Loaded {} change entries for {}", changes.len(), agency_slug);
            changes
        }
        Err(e) => {
            warn!("Failed to load changes for {}: {}", agency_slug, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;

    fn point(date: &str, word_count: u64) -> HistoricalData {
        HistoricalData {
            date: date.to_string(),
            word_count,
        }
    }

    #[tokio::test]
    async fn test_history_sorted_by_date() {
        let mut source = MockSource::new();
        source.history.insert(
            "epa".to_string(),
            vec![point("2021-01-01", 3), point("2017-01-01", 1), point("2019-01-01", 2)],
        );

        let history = load_history(&source, "epa").await;
        let dates: Vec<&str> = history.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2017-01-01", "2019-01-01", "2021-01-01"]);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let mut source = MockSource::new();
        source.failing_slugs.insert("epa".to_string());
        source
            .history
            .insert("epa".to_string(), vec![point("2020-01-01", 1)]);

        assert!(load_history(&source, "epa").await.is_empty());
        assert!(load_changes(&source, "epa").await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_agency_is_empty() {
        let source = MockSource::new();
        assert!(load_history(&source, "nobody").await.is_empty());
        assert!(load_changes(&source, "nobody").await.is_empty());
    }
}
