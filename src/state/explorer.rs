//! Selection state holder.
//!
//! `Explorer` owns the agency forest, the current agency/title selection and
//! every collection loaded for that selection. All mutation goes through its
//! entry points; each one bumps a revision on a watch channel so observers
//! can re-read the derived views.
//!
//! Loads triggered by a selection run on spawned tasks. There is no request
//! cancellation: a result is applied only if the selection it was requested
//! for is still current. Every `select_agency` call starts a new selection,
//! so reselecting the same agency also retires the older loads.

use crate::analysis::{self, summarize, title_analytics, unique_titles};
use crate::fetch::{
    apply_refresh, load_changes, load_history, load_title_data, refresh_single_title,
};
use crate::models::{
    Agency, AnalyticsSummary, HistoricalData, HistorySummary, TitleAnalytics, TitleChange,
    TitleData,
};
use crate::search::filter_agencies;
use crate::source::DataSource;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything the explorer knows at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ExplorerState {
    pub agencies: Vec<Arc<Agency>>,
    pub selected_agency: Option<Arc<Agency>>,
    /// Only set to a title the selected agency references directly.
    pub selected_title: Option<u32>,
    pub search_query: String,
    pub title_data: Vec<TitleData>,
    pub history: Vec<HistoricalData>,
    pub changes: Vec<TitleChange>,
    /// Bumped by every agency selection.
    pub generation: u64,
}

/// Shared handle to the explorer state. Cloning is cheap.
#[derive(Clone)]
pub struct Explorer {
    source: Arc<dyn DataSource>,
    state: Arc<Mutex<ExplorerState>>,
    revision: Arc<watch::Sender<u64>>,
    batch_size: usize,
}

impl Explorer {
    /// Create an explorer reading from `source`, fetching titles
    /// `batch_size` at a time.
    pub fn new(source: Arc<dyn DataSource>, batch_size: usize) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            source,
            state: Arc::new(Mutex::new(ExplorerState::default())),
            revision: Arc::new(revision),
            batch_size,
        }
    }

    /// Receive a notification after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ExplorerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn update<R>(&self, f: impl FnOnce(&mut ExplorerState) -> R) -> R {
        let result = f(&mut self.lock());
        self.notify();
        result
    }

    /// Apply a loaded result only if selection `generation` is still current.
    fn apply_if_current(
        &self,
        generation: u64,
        slug: &str,
        what: &str,
        f: impl FnOnce(&mut ExplorerState),
    ) -> bool {
        {
            let mut state = self.lock();
            if state.generation != generation {
                debug!("Discarding stale {} for {}", what, slug);
                return false;
            }
            f(&mut state);
        }
        self.notify();
        true
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Fetch the agency forest from the source. Failures leave an empty
    /// forest. Returns the number of top-level agencies.
    pub async fn load_agencies(&self) -> usize {
        let agencies = match self.source.agencies().await {
            Ok(agencies) => agencies,
            Err(e) => {
                warn!("Failed to load agencies: {}", e);
                Vec::new()
            }
        };

        info!("Loaded {} top-level agencies", agencies.len());
        let count = agencies.len();
        self.set_agencies(agencies);
        count
    }

    /// Replace the agency forest.
    pub fn set_agencies(&self, agencies: Vec<Arc<Agency>>) {
        self.update(|state| state.agencies = agencies);
    }

    /// Select an agency and start loading its data.
    ///
    /// The previous title selection and all per-agency collections are
    /// cleared before this returns. Title word counts, history and changes
    /// then load concurrently on a spawned task; the handle resolves once
    /// all three have settled.
    pub fn select_agency(&self, agency: Arc<Agency>) -> JoinHandle<()> {
        let slug = agency.slug.clone();
        let titles: Vec<u32> = agency.cfr_references.iter().map(|r| r.title).collect();
        info!("Selected agency {}", slug);

        let generation = self.update(|state| {
            state.generation += 1;
            state.selected_agency = Some(agency);
            state.selected_title = None;
            state.title_data.clear();
            state.history.clear();
            state.changes.clear();
            state.generation
        });

        let explorer = self.clone();
        tokio::spawn(async move { explorer.load_selection(generation, &slug, &titles).await })
    }

    async fn load_selection(&self, generation: u64, slug: &str, titles: &[u32]) {
        let source = self.source.as_ref();

        tokio::join!(
            async {
                let data = load_title_data(source, titles, self.batch_size).await;
                self.apply_if_current(generation, slug, "title data", |state| {
                    state.title_data = data
                });
            },
            async {
                let history = load_history(source, slug).await;
                self.apply_if_current(generation, slug, "history", |state| {
                    state.history = history
                });
            },
            async {
                let changes = load_changes(source, slug).await;
                self.apply_if_current(generation, slug, "changes", |state| {
                    state.changes = changes
                });
            },
        );
    }

    /// Select one of the selected agency's titles and refresh its word count.
    ///
    /// Returns `None` without changing anything when no agency is selected
    /// or the agency does not reference `title`.
    pub fn select_title(&self, title: u32) -> Option<JoinHandle<()>> {
        let (generation, slug) = {
            let mut state = self.lock();
            let agency = state.selected_agency.as_ref()?;
            if !agency.references_title(title) {
                debug!("Ignoring title {} not referenced by {}", title, agency.slug);
                return None;
            }
            let slug = agency.slug.clone();
            state.selected_title = Some(title);
            (state.generation, slug)
        };
        self.notify();

        let explorer = self.clone();
        Some(tokio::spawn(async move {
            match refresh_single_title(explorer.source.as_ref(), title).await {
                Ok(fresh) => {
                    explorer.apply_if_current(generation, &slug, "title refresh", |state| {
                        apply_refresh(&mut state.title_data, fresh)
                    });
                }
                Err(e) => warn!("Failed to refresh title {}: {}", title, e),
            }
        }))
    }

    /// Set the search query used by [`Explorer::filtered_agencies`].
    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.update(|state| state.search_query = query);
    }

    // ========================================================================
    // Read views
    // ========================================================================

    pub fn agencies(&self) -> Vec<Arc<Agency>> {
        self.lock().agencies.clone()
    }

    pub fn selected_agency(&self) -> Option<Arc<Agency>> {
        self.lock().selected_agency.clone()
    }

    pub fn selected_title(&self) -> Option<u32> {
        self.lock().selected_title
    }

    pub fn search_query(&self) -> String {
        self.lock().search_query.clone()
    }

    pub fn title_data(&self) -> Vec<TitleData> {
        self.lock().title_data.clone()
    }

    pub fn selected_agency_history(&self) -> Vec<HistoricalData> {
        self.lock().history.clone()
    }

    pub fn selected_agency_changes(&self) -> Vec<TitleChange> {
        self.lock().changes.clone()
    }

    /// The agency forest filtered by the current search query.
    pub fn filtered_agencies(&self) -> Vec<Arc<Agency>> {
        let state = self.lock();
        filter_agencies(&state.agencies, &state.search_query)
    }

    /// Distinct titles of the selected agency, ascending.
    pub fn unique_titles_of_selected(&self) -> Vec<u32> {
        self.lock()
            .selected_agency
            .as_deref()
            .map(unique_titles)
            .unwrap_or_default()
    }

    pub fn analytics_summary_of_selected(&self) -> Option<AnalyticsSummary> {
        self.lock().selected_agency.as_deref().map(summarize)
    }

    /// Analytics for the selected title, if one is selected.
    pub fn title_analytics(&self) -> Option<TitleAnalytics> {
        let state = self.lock();
        let agency = state.selected_agency.as_deref()?;
        let title = state.selected_title?;
        Some(title_analytics(agency, &state.title_data, title))
    }

    pub fn history_summary(&self) -> Option<HistorySummary> {
        analysis::summarize_history(&self.lock().history)
    }
}
