//! The timeline store: sole owner and writer of [`TimelineState`].
//!
//! Every public operation applies its transition atomically and then notifies
//! subscribers with the new snapshot. Operations that load data do so in two steps: an
//! immediate transition that clears the affected slice (the loading affordance) and a
//! second transition when the response arrives.
//!
//! # Request tokens
//!
//! Each slice that is filled asynchronously (year selection, day listing, conversation
//! detail, search) has a request token. Starting or clearing a slice bumps its token,
//! and a response is applied only if its token is still current. A superseded response
//! is dropped without notifying, so the last request issued wins regardless of the
//! order in which responses arrive.
//!
//! # Notifications
//!
//! Snapshots are queued under the state lock and delivered by whichever caller finds no
//! delivery in progress, with no lock held. Listeners therefore see snapshots in the
//! order transitions were applied, and may read from or drive the store themselves. A
//! transition made while another caller is delivering returns before its own snapshot
//! reaches the listeners.
//!
//! # Failures
//!
//! Only [`TimelineStore::initialize`] surfaces an error (and moves the store to
//! [`Phase::Failed`]). Every other failed or timed-out call is logged and leaves its
//! slice empty.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::cache::ContributionCache;
use super::clock::{Clock, SystemClock};
use super::state::{Phase, TimelineState};
use super::window::{Window, compute_window, visible_count, visible_date_range_label};
use crate::source::{DEFAULT_SEARCH_LIMIT, DataSource, SourceError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type Listener = Arc<dyn Fn(&TimelineState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound for any single data source call.
    pub request_timeout: Duration,
    /// Number of hits requested per search.
    pub search_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { request_timeout: DEFAULT_REQUEST_TIMEOUT, search_limit: DEFAULT_SEARCH_LIMIT }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slice {
    Year,
    Day,
    Conversation,
    Search,
}

#[derive(Debug, Default)]
struct RequestTokens {
    year: u64,
    day: u64,
    conversation: u64,
    search: u64,
}

impl RequestTokens {
    fn slot(&mut self, slice: Slice) -> &mut u64 {
        match slice {
            Slice::Year => &mut self.year,
            Slice::Day => &mut self.day,
            Slice::Conversation => &mut self.conversation,
            Slice::Search => &mut self.search,
        }
    }

    fn bump(&mut self, slice: Slice) -> u64 {
        let slot = self.slot(slice);
        *slot += 1;
        *slot
    }

    fn is_current(&mut self, slice: Slice, token: u64) -> bool {
        *self.slot(slice) == token
    }

    fn bump_all(&mut self) {
        for slice in [Slice::Year, Slice::Day, Slice::Conversation, Slice::Search] {
            self.bump(slice);
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: TimelineState,
    cache: ContributionCache,
    tokens: RequestTokens,
    /// Year fetches in flight; concurrent callers share one request.
    year_fetches: HashMap<i32, Arc<OnceCell<bool>>>,
    /// Snapshots not yet delivered to listeners, oldest first.
    undelivered: VecDeque<TimelineState>,
    delivering: bool,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

pub struct TimelineStore {
    source: Arc<dyn DataSource>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
    inner: Mutex<Inner>,
    listeners: Mutex<Listeners>,
}

impl TimelineStore {
    pub fn new(source: Arc<dyn DataSource>, options: StoreOptions) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), options)
    }

    pub fn with_clock(
        source: Arc<dyn DataSource>,
        clock: Arc<dyn Clock>,
        options: StoreOptions,
    ) -> Self {
        Self {
            source,
            clock,
            options,
            inner: Mutex::new(Inner::default()),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    // ----- subscription -------------------------------------------------------------

    /// Register a callback invoked with the new state after every transition.
    ///
    /// Listeners run on whichever task is delivering notifications, without any store
    /// lock held.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TimelineState) + Send + Sync + 'static,
    {
        let mut listeners = self.lock_listeners();
        listeners.next_id += 1;
        let id = ListenerId(listeners.next_id);
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.entries.len();
        listeners.entries.retain(|(existing, _)| *existing != id);
        listeners.entries.len() != before
    }

    // ----- read access --------------------------------------------------------------

    pub fn state(&self) -> TimelineState {
        self.lock_inner().state.clone()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn cached_years(&self) -> Vec<i32> {
        self.lock_inner().cache.years().collect()
    }

    /// Cells and month labels for the active window, derived on demand.
    pub fn window(&self) -> Window {
        let inner = self.lock_inner();
        compute_window(&inner.cache, inner.state.selected_year, self.clock.now())
    }

    pub fn visible_count(&self) -> u64 {
        let inner = self.lock_inner();
        visible_count(&inner.state, &inner.cache, self.clock.now())
    }

    pub fn date_range_label(&self) -> String {
        visible_date_range_label(&self.lock_inner().state, self.clock.now())
    }

    // ----- lifecycle ----------------------------------------------------------------

    /// Load statistics, then the current and previous year concurrently, and enter
    /// the rolling window.
    ///
    /// # Errors
    ///
    /// Returns the statistics error; the store is left in [`Phase::Failed`]. Failure
    /// to load either year is logged and tolerated.
    pub async fn initialize(&self) -> Result<(), SourceError> {
        self.update(|inner| {
            inner.state.phase = Phase::Loading;
            Some(())
        });

        let stats = match self.fetch(self.source.stats()).await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "failed to load archive statistics");
                let message = e.to_string();
                self.update(|inner| {
                    inner.state.phase = Phase::Failed(message);
                    Some(())
                });
                return Err(e);
            }
        };

        let year = self.clock.now().year();
        let (current, previous) = tokio::join!(self.load_year(year), self.load_year(year - 1));
        info!(
            conversations = stats.total_conversations,
            current_year_loaded = current,
            previous_year_loaded = previous,
            "timeline initialized"
        );

        self.update(|inner| {
            inner.tokens.bump_all();
            let state = &mut inner.state;
            state.available_years = stats.selectable_years();
            state.stats = Some(stats);
            state.selected_year = None;
            state.clear_browsing();
            state.phase = Phase::Ready;
            Some(())
        });
        Ok(())
    }

    /// Drop all listeners and ignore every response still in flight.
    pub fn dispose(&self) {
        {
            let mut inner = self.lock_inner();
            inner.tokens.bump_all();
            inner.state.phase = Phase::Disposed;
        }
        self.lock_listeners().entries.clear();
        debug!("timeline store disposed");
    }

    // ----- transitions --------------------------------------------------------------

    /// Switch to a specific year (`Some`) or back to the rolling window (`None`).
    ///
    /// An uncached year is fetched first; if that fails the current selection is kept.
    /// Returns whether the selection was applied.
    pub async fn select_year(&self, year: Option<i32>) -> bool {
        let Some(token) = self.begin(Slice::Year) else {
            return false;
        };

        if let Some(y) = year
            && !self.load_year(y).await
        {
            debug!(year = y, "keeping previous selection");
            return false;
        }

        self.update(|inner| {
            if !inner.tokens.is_current(Slice::Year, token) {
                debug!(?year, "discarding superseded year selection");
                return None;
            }
            inner.tokens.bump(Slice::Day);
            inner.tokens.bump(Slice::Conversation);
            inner.tokens.bump(Slice::Search);
            inner.state.selected_year = year;
            inner.state.clear_browsing();
            Some(())
        })
        .is_some()
    }

    /// Select a day and load the conversations started on it.
    pub async fn select_date(&self, date: NaiveDate) {
        let Some(token) = self.update(|inner| {
            let token = inner.tokens.bump(Slice::Day);
            inner.tokens.bump(Slice::Conversation);
            inner.tokens.bump(Slice::Search);
            inner.state.clear_browsing();
            inner.state.selected_date = Some(date);
            inner.state.day_loading = true;
            Some(token)
        }) else {
            return;
        };

        let result = self.fetch(self.source.conversations_for_date(date)).await;

        self.update(|inner| {
            if !inner.tokens.is_current(Slice::Day, token) {
                debug!(%date, "discarding superseded day listing");
                return None;
            }
            inner.state.day_loading = false;
            match result {
                Ok(day) => inner.state.conversation_list = day.conversations,
                Err(e) => warn!(%date, error = %e, "failed to load conversations for day"),
            }
            Some(())
        });
    }

    pub fn clear_date(&self) {
        self.update(|inner| {
            inner.tokens.bump(Slice::Day);
            inner.tokens.bump(Slice::Conversation);
            inner.tokens.bump(Slice::Search);
            inner.state.clear_browsing();
            Some(())
        });
    }

    /// Open a conversation and load its transcript.
    pub async fn select_conversation(&self, id: &str) {
        let Some(token) = self.update(|inner| {
            let token = inner.tokens.bump(Slice::Conversation);
            inner.state.clear_conversation();
            inner.state.selected_conversation_id = Some(id.to_string());
            inner.state.conversation_loading = true;
            Some(token)
        }) else {
            return;
        };

        let result = self.fetch(self.source.conversation(id)).await;

        self.update(|inner| {
            if !inner.tokens.is_current(Slice::Conversation, token) {
                debug!(id, "discarding superseded conversation");
                return None;
            }
            inner.state.conversation_loading = false;
            match result {
                Ok(detail) => inner.state.active_conversation = Some(detail),
                Err(e) => warn!(id, error = %e, "failed to load conversation"),
            }
            Some(())
        });
    }

    /// Run a free-text search. Blank queries are ignored.
    pub async fn search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let Some(token) = self.update(|inner| {
            let token = inner.tokens.bump(Slice::Search);
            inner.state.search_query = query.to_string();
            inner.state.search_results.clear();
            inner.state.search_in_flight = true;
            Some(token)
        }) else {
            return;
        };

        let result = self.fetch(self.source.search(query, self.options.search_limit)).await;

        self.update(|inner| {
            if !inner.tokens.is_current(Slice::Search, token) {
                debug!(query, "discarding superseded search results");
                return None;
            }
            inner.state.search_in_flight = false;
            match result {
                Ok(found) => inner.state.search_results = found.results,
                Err(e) => warn!(query, error = %e, "search failed"),
            }
            Some(())
        });
    }

    /// Drop the search and the open conversation; the selected day is kept.
    pub fn clear_search(&self) {
        self.update(|inner| {
            inner.tokens.bump(Slice::Search);
            inner.tokens.bump(Slice::Conversation);
            inner.state.clear_search();
            inner.state.clear_conversation();
            Some(())
        });
    }

    // ----- internals ----------------------------------------------------------------

    /// Ensure `year` is cached, fetching it if needed. Returns whether it is available.
    ///
    /// Callers asking for a year that is already being fetched wait for that request.
    async fn load_year(&self, year: i32) -> bool {
        let fetch = {
            let mut inner = self.lock_inner();
            if inner.cache.contains(year) {
                return true;
            }
            Arc::clone(inner.year_fetches.entry(year).or_default())
        };

        let loaded = *fetch.get_or_init(|| self.fetch_year(year)).await;

        let mut inner = self.lock_inner();
        if inner.year_fetches.get(&year).is_some_and(|f| Arc::ptr_eq(f, &fetch)) {
            inner.year_fetches.remove(&year);
        }
        loaded
    }

    async fn fetch_year(&self, year: i32) -> bool {
        debug!(year, "fetching contribution data");
        match self.fetch(self.source.contribution(year)).await {
            Ok(contribution) => {
                self.lock_inner().cache.insert(contribution);
                true
            }
            Err(e) => {
                warn!(year, error = %e, "failed to load contribution data");
                false
            }
        }
    }

    async fn fetch<T, F>(&self, request: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        let limit = self.options.request_timeout;
        tokio::time::timeout(limit, request).await.unwrap_or(Err(SourceError::Timeout(limit)))
    }

    fn begin(&self, slice: Slice) -> Option<u64> {
        let mut inner = self.lock_inner();
        if inner.state.phase == Phase::Disposed {
            return None;
        }
        Some(inner.tokens.bump(slice))
    }

    /// Apply `transition` under the state lock. When it returns `Some`, the resulting
    /// snapshot is queued for the listeners.
    fn update<R>(&self, transition: impl FnOnce(&mut Inner) -> Option<R>) -> Option<R> {
        let mut inner = self.lock_inner();
        if inner.state.phase == Phase::Disposed {
            return None;
        }
        let result = transition(&mut *inner)?;
        let snapshot = inner.state.clone();
        inner.undelivered.push_back(snapshot);
        if inner.delivering {
            return Some(result);
        }
        inner.delivering = true;
        drop(inner);

        self.deliver();
        Some(result)
    }

    /// Drain the notification queue. Only one caller delivers at a time.
    fn deliver(&self) {
        let _abandon_on_panic = DeliveryGuard(self);
        loop {
            let snapshot = {
                let mut inner = self.lock_inner();
                match inner.undelivered.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        inner.delivering = false;
                        return;
                    }
                }
            };
            let listeners: Vec<Listener> =
                self.lock_listeners().entries.iter().map(|(_, l)| Arc::clone(l)).collect();
            for listener in &listeners {
                listener(&snapshot);
            }
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases delivery if a listener panics mid-queue.
struct DeliveryGuard<'a>(&'a TimelineStore);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = self.0.lock_inner();
            inner.undelivered.clear();
            inner.delivering = false;
        }
    }
}
