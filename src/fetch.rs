// Fetch controllers: keep loading/error/data state for the listing grid and
// for a single listing, driven through the `CarsApi` seam.
//
// Each controller stamps every fetch with a ticket from a monotonic counter.
// A resolved fetch is applied only when its ticket is still the latest one
// issued, so the most recently started request wins no matter which response
// arrives first. `detach` stops any later result from being applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    api::CarsApi,
    filters::CarFilters,
    models::{Listing, Pagination},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

// State guarded together with the ticket counter, so that "is this ticket
// still current" and "apply the result" happen under one lock.
#[derive(Debug, Default)]
struct Tracked<S> {
    state: S,
    latest: u64,
    detached: bool,
}

#[derive(Debug)]
struct LatestWins<S> {
    inner: Mutex<Tracked<S>>,
}

impl<S: Default + Clone> LatestWins<S> {
    fn new() -> Self {
        Self { inner: Mutex::new(Tracked::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, Tracked<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Issues a new ticket and moves the state into loading. None once detached.
    fn begin(&self, enter_loading: impl FnOnce(&mut S)) -> Option<u64> {
        let mut tracked = self.lock();
        if tracked.detached {
            return None;
        }
        tracked.latest += 1;
        enter_loading(&mut tracked.state);
        Some(tracked.latest)
    }

    // Applies a resolved fetch if it is still the latest; returns whether it was applied
    fn finish(&self, ticket: u64, apply: impl FnOnce(&mut S)) -> bool {
        let mut tracked = self.lock();
        if tracked.detached || tracked.latest != ticket {
            return false;
        }
        apply(&mut tracked.state);
        true
    }

    fn snapshot(&self) -> S {
        self.lock().state.clone()
    }

    fn detach(&self) {
        self.lock().detached = true;
    }

    fn is_detached(&self) -> bool {
        self.lock().detached
    }
}

// --- Listing grid ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    pub cars: Vec<Listing>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: Option<Pagination>,
    pub phase: FetchPhase,
}

impl ListingState {
    /// A successful fetch that matched nothing. Never true after a failure.
    pub fn is_empty(&self) -> bool {
        self.phase == FetchPhase::Success && self.cars.is_empty()
    }
}

pub struct ListingController {
    api: Arc<dyn CarsApi>,
    filters: Mutex<CarFilters>,
    state: LatestWins<ListingState>,
}

impl ListingController {
    pub fn new(api: Arc<dyn CarsApi>, filters: CarFilters) -> Self {
        Self { api, filters: Mutex::new(filters), state: LatestWins::new() }
    }

    pub fn filters(&self) -> CarFilters {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn state(&self) -> ListingState {
        self.state.snapshot()
    }

    /// Replaces the filter model and starts one fetch for it.
    pub async fn update_filters(&self, filters: CarFilters) {
        *self.filters.lock().unwrap_or_else(PoisonError::into_inner) = filters.clone();
        self.fetch(filters).await;
    }

    pub async fn refetch(&self) {
        self.fetch(self.filters()).await;
    }

    pub fn detach(&self) {
        self.state.detach();
    }

    // Takes the filters by value so a concurrent update can't swap them
    // between storing and sending.
    async fn fetch(&self, filters: CarFilters) {
        let Some(ticket) = self.state.begin(|s| {
            s.loading = true;
            s.error = None;
            s.phase = FetchPhase::Loading;
        }) else {
            tracing::debug!("[LISTINGS] controller detached, not fetching");
            return;
        };

        let result = self.api.get_cars(&filters).await;

        let applied = self.state.finish(ticket, |s| {
            s.loading = false;
            match result {
                Ok(page) => {
                    s.cars = page.items;
                    s.pagination = page.pagination;
                    s.error = None;
                    s.phase = FetchPhase::Success;
                }
                Err(e) => {
                    tracing::warn!("[LISTINGS] fetch failed: {}", e);
                    s.cars = Vec::new();
                    s.pagination = None;
                    s.error = Some(e.user_message());
                    s.phase = FetchPhase::Failed;
                }
            }
        });
        if !applied {
            tracing::debug!("[LISTINGS] discarding result of superseded request #{}", ticket);
        }
    }
}

// --- Single listing ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDetailState {
    pub listing: Option<Listing>,
    pub loading: bool,
    pub error: Option<String>,
    // Set when the failure was a 404, so the page shows "not found" rather than an error banner
    pub not_found: bool,
    pub phase: FetchPhase,
}

pub struct ListingDetailController {
    api: Arc<dyn CarsApi>,
    id: String,
    state: LatestWins<ListingDetailState>,
}

impl ListingDetailController {
    pub fn new(api: Arc<dyn CarsApi>, id: impl Into<String>) -> Self {
        Self { api, id: id.into(), state: LatestWins::new() }
    }

    pub fn state(&self) -> ListingDetailState {
        self.state.snapshot()
    }

    pub fn detach(&self) {
        self.state.detach();
    }

    pub async fn refetch(&self) {
        // Nothing to look up
        if self.id.trim().is_empty() {
            return;
        }
        let Some(ticket) = self.state.begin(|s| {
            s.loading = true;
            s.error = None;
            s.not_found = false;
            s.phase = FetchPhase::Loading;
        }) else {
            return;
        };

        let result = self.api.get_car(&self.id).await;

        let applied = self.state.finish(ticket, |s| {
            s.loading = false;
            match result {
                Ok(listing) => {
                    s.listing = Some(listing);
                    s.phase = FetchPhase::Success;
                }
                Err(e) => {
                    s.listing = None;
                    s.not_found = e.is_not_found();
                    s.error = Some(e.user_message());
                    s.phase = FetchPhase::Failed;
                }
            }
        });
        if !applied && !self.state.is_detached() {
            tracing::debug!("[LISTING] discarding result of superseded request #{} for {}", ticket, self.id);
        }
    }
}
