//! Batched title word-count fetching.
//!
//! Titles are fetched in sequential batches; fetches inside a batch run
//! concurrently. A failing title is logged and left out of the result.

use crate::error::{FetchError, Result};
use crate::models::TitleData;
use crate::source::DataSource;
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Maximum number of concurrent title fetches.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Remove duplicate titles, keeping first-occurrence order.
pub fn dedup_titles(titles: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    titles.iter().copied().filter(|t| seen.insert(*t)).collect()
}

/// Fetch word counts for every distinct title.
///
/// Batch `n + 1` starts only after every fetch in batch `n` has settled.
/// The result holds successful fetches only, grouped by batch; callers
/// should look entries up by title rather than position.
pub async fn load_title_data(
    source: &dyn DataSource,
    titles: &[u32],
    batch_size: usize,
) -> Vec<TitleData> {
    let titles = dedup_titles(titles);
    let batch_size = batch_size.max(1);
    let mut loaded = Vec::with_capacity(titles.len());

    for (index, batch) in titles.chunks(batch_size).enumerate() {
        debug!("Fetching batch {} with titles {:?}", index + 1, batch);

        let outcomes = join_all(batch.iter().map(|&title| fetch_title(source, title))).await;

        for (title, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(data) => loaded.push(data),
                Err(e) if e.is_no_data() => debug!("Title {}: {}", title, e),
                Err(e) => warn!("Failed to fetch word count for title {}: {}", title, e),
            }
        }
    }

    info!(
        "Loaded word counts for {}/{} titles",
        loaded.len(),
        titles.len()
    );

    loaded
}

/// Fetch a single title's word count.
///
/// A response without a positive word count is reported as
/// [`FetchError::NoData`].
pub async fn fetch_title(source: &dyn DataSource, title: u32) -> Result<TitleData> {
    let response = source.title_word_count(title).await?;

    match response.word_count {
        Some(word_count) if word_count > 0 => Ok(TitleData {
            title,
            word_count,
            last_updated: response.date.unwrap_or_default(),
        }),
        _ => Err(FetchError::NoData { title }),
    }
}

/// Re-fetch one title, e.g. when it gets selected.
pub async fn refresh_single_title(source: &dyn DataSource, title: u32) -> Result<TitleData> {
    debug!("Refreshing title {}", title);
    fetch_title(source, title).await
}

/// Store a refreshed entry, replacing the one with the same title.
///
/// Other entries are left exactly as they were. A title that had no entry
/// yet is appended.
pub fn apply_refresh(title_data: &mut Vec<TitleData>, fresh: TitleData) {
    match title_data.iter_mut().find(|d| d.title == fresh.title) {
        Some(entry) => *entry = fresh,
        None => title_data.push(fresh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{FetchEvent, MockSource};
    use std::time::Duration;

    fn counts(titles: &[u32]) -> Vec<(u32, u64)> {
        titles.iter().map(|t| (*t, *t as u64 * 100)).collect()
    }

    fn position(events: &[FetchEvent], event: FetchEvent) -> usize {
        events.iter().position(|e| *e == event).unwrap()
    }

    #[test]
    fn test_dedup_titles() {
        assert_eq!(dedup_titles(&[1, 1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(dedup_titles(&[9, 3, 9, 3]), vec![9, 3]);
        assert!(dedup_titles(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_one_fetch_per_distinct_title() {
        let source = MockSource::with_word_counts(&counts(&[1, 2, 3, 4, 5, 6]));
        let loaded = load_title_data(&source, &[1, 1, 2, 3, 4, 5, 6], DEFAULT_BATCH_SIZE).await;

        let mut fetched = source.title_fetches();
        fetched.sort();
        assert_eq!(fetched, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(loaded.len(), 6);
    }

    #[tokio::test]
    async fn test_second_batch_waits_for_first() {
        let mut source = MockSource::with_word_counts(&counts(&[1, 2, 3, 4, 5, 6]));
        source.title_latency = Duration::from_millis(20);

        load_title_data(&source, &[1, 1, 2, 3, 4, 5, 6], DEFAULT_BATCH_SIZE).await;

        let events = source.events();
        let second_batch_start = position(&events, FetchEvent::Start(6));
        for title in 1..=5 {
            assert!(position(&events, FetchEvent::End(title)) < second_batch_start);
        }
        assert_eq!(source.max_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_failed_title_is_excluded() {
        let mut source = MockSource::with_word_counts(&counts(&[1, 2, 3, 4, 5, 6]));
        source.failing_titles.insert(5);

        let loaded = load_title_data(&source, &[1, 2, 3, 4, 5, 6], DEFAULT_BATCH_SIZE).await;

        let mut titles: Vec<u32> = loaded.iter().map(|d| d.title).collect();
        titles.sort();
        assert_eq!(titles, vec![1, 2, 3, 4, 6]);
    }

    #[tokio::test]
    async fn test_missing_or_zero_word_count_is_no_data() {
        let source = MockSource::with_word_counts(&[(1, 0), (2, 250)]);

        let loaded = load_title_data(&source, &[1, 2, 3], DEFAULT_BATCH_SIZE).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, 2);
        assert_eq!(loaded[0].last_updated, "2024-01-01");

        let err = fetch_title(&source, 3).await.unwrap_err();
        assert!(err.is_no_data());
    }

    #[tokio::test]
    async fn test_zero_batch_size_fetches_one_at_a_time() {
        let mut source = MockSource::with_word_counts(&counts(&[1, 2, 3]));
        source.title_latency = Duration::from_millis(5);

        let loaded = load_title_data(&source, &[1, 2, 3], 0).await;
        assert_eq!(loaded.len(), 3);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_only_matching_entry() {
        let source = MockSource::with_word_counts(&counts(&[1, 2, 3, 4]));
        let mut data = load_title_data(&source, &[1, 2, 3, 4], DEFAULT_BATCH_SIZE).await;
        let before = data.clone();

        source.set_word_count(3, 12_345);
        let fresh = refresh_single_title(&source, 3).await.unwrap();
        apply_refresh(&mut data, fresh);

        assert_eq!(data.len(), before.len());
        for (after, prior) in data.iter().zip(&before) {
            if after.title == 3 {
                assert_eq!(after.word_count, 12_345);
            } else {
                assert_eq!(after, prior);
            }
        }
    }

    #[test]
    fn test_apply_refresh_appends_missing_title() {
        let mut data = vec![TitleData {
            title: 1,
            word_count: 10,
            last_updated: String::new(),
        }];
        apply_refresh(
            &mut data,
            TitleData {
                title: 2,
                word_count: 20,
                last_updated: String::new(),
            },
        );
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].title, 2);
    }
}
