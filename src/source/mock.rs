//! In-memory data source for tests.

use super::DataSource;
use crate::error::{FetchError, Result};
use crate::models::{Agency, HistoricalData, TitleChange, WordCountResponse};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A fetch lifecycle event recorded by [`MockSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Start(u32),
    End(u32),
}

/// Configurable test double.
#[derive(Default)]
pub struct MockSource {
    pub agencies: Vec<Arc<Agency>>,
    word_counts: Mutex<HashMap<u32, u64>>,
    pub failing_titles: HashSet<u32>,
    pub history: HashMap<String, Vec<HistoricalData>>,
    pub changes: HashMap<String, Vec<TitleChange>>,
    pub failing_slugs: HashSet<String>,
    /// Slugs whose history request fails while their changes still load.
    pub failing_history_slugs: HashSet<String>,
    /// Latency applied per agency slug to history/changes requests.
    pub slug_latency: HashMap<String, Duration>,
    /// Latency applied to every title request.
    pub title_latency: Duration,
    /// Per-call latencies consumed by the next title requests, in order.
    title_latencies: Mutex<VecDeque<Duration>>,
    /// Date reported with each word count.
    pub date: String,
    events: Mutex<Vec<FetchEvent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            date: "2024-01-01".to_string(),
            ..Self::default()
        }
    }

    pub fn with_word_counts(counts: &[(u32, u64)]) -> Self {
        let mut source = Self::new();
        source.word_counts = Mutex::new(counts.iter().copied().collect());
        source
    }

    pub fn set_word_count(&self, title: u32, count: u64) {
        self.word_counts.lock().unwrap().insert(title, count);
    }

    /// Delay the next title requests by these amounts, one per request.
    pub fn queue_title_latencies(&self, latencies: &[Duration]) {
        self.title_latencies.lock().unwrap().extend(latencies);
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Titles whose fetch was started, in start order.
    pub fn title_fetches(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FetchEvent::Start(title) => Some(title),
                FetchEvent::End(_) => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn slug_delay(&self, slug: &str) {
        if let Some(delay) = self.slug_latency.get(slug) {
            tokio::time::sleep(*delay).await;
        }
    }

    fn server_error(what: String) -> FetchError {
        FetchError::Status {
            url: format!("mock://{}", what),
            status: 500,
            body: "internal error".to_string(),
        }
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn agencies(&self) -> Result<Vec<Arc<Agency>>> {
        Ok(self.agencies.clone())
    }

    async fn historical_word_counts(&self, agency_slug: &str) -> Result<Vec<HistoricalData>> {
        self.slug_delay(agency_slug).await;
        if self.failing_slugs.contains(agency_slug) || self.failing_history_slugs.contains(agency_slug)
        {
            return Err(Self::server_error(format!("history/{}", agency_slug)));
        }
        Ok(self.history.get(agency_slug).cloned().unwrap_or_default())
    }

    async fn agency_changes(&self, agency_slug: &str) -> Result<Vec<TitleChange>> {
        self.slug_delay(agency_slug).await;
        if self.failing_slugs.contains(agency_slug) {
            return Err(Self::server_error(format!("changes/{}", agency_slug)));
        }
        Ok(self.changes.get(agency_slug).cloned().unwrap_or_default())
    }

    async fn title_word_count(&self, title: u32) -> Result<WordCountResponse> {
        self.events.lock().unwrap().push(FetchEvent::Start(title));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // The answer reflects the data at request time.
        let word_count = self.word_counts.lock().unwrap().get(&title).copied();
        let latency = self
            .title_latencies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.title_latency);

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(FetchEvent::End(title));

        if self.failing_titles.contains(&title) {
            return Err(Self::server_error(format!("title/{}", title)));
        }

        Ok(WordCountResponse {
            word_count,
            date: Some(self.date.clone()),
        })
    }
}
