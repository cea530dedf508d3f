use std::future;
use std::sync::Arc;

use common::{BikeStation, City, Stop, Vehicle, api};
use live_feed::{ConnectionState, FeedHandle, FeedRequest, FeedTransport, FeedUpdate, VehicleSnapshot};
use map_view::{
    Effect, EntityStore, FilterCriteria, FilterState, FilterToggle, FitOutcome, Selection,
    SelectionQuery, SelectionSync, VehicleKey, ViewportState, Visible,
};
use realtime::Notification;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::provider::Provider;

/// A mounted city map.
///
/// Owns the live feed connection and the static data fetches for its
/// lifetime. Every input (snapshot, fetched collection, viewport, URL,
/// filter) re-derives the selection; visible markers are computed on demand
/// from the current state.
pub struct CityMap<P: Provider> {
    city: City,
    provider: Arc<P>,
    settings: Settings,
    feed: Option<FeedHandle>,
    stops: Fetch<Stop>,
    bikes: Fetch<BikeStation>,
    store: EntityStore,
    viewport: ViewportState,
    filter: FilterState,
    query: SelectionQuery,
    sync: SelectionSync,
}

impl<P: Provider + 'static> CityMap<P> {
    /// Connect the feed, start the static data fetches and resolve the
    /// initial selection from `query`.
    ///
    /// Returns as soon as the feed task is running. Stops and bike stations
    /// land through [`CityMap::next_update`]; failures are reported through
    /// the provider and leave the affected collection empty. Must be called
    /// within a Tokio runtime.
    pub fn mount<T: FeedTransport>(
        city: City, query: &str, transport: T, provider: P, settings: Settings,
    ) -> Self {
        info!(city = %city, "mounting city map");

        let provider = Arc::new(provider);
        let request = FeedRequest::new(settings.feed_url.clone(), city.id.clone());
        let feed = live_feed::connect(transport, request, settings.reconnect, Arc::clone(&provider));

        let stops = if city.api.stops {
            Fetch::spawn(fetch_stops(city.clone(), Arc::clone(&provider)))
        } else {
            Fetch::idle()
        };
        let bikes = if city.api.bikes {
            Fetch::spawn(fetch_bikes(city.clone(), Arc::clone(&provider)))
        } else {
            Fetch::idle()
        };

        let mut map = Self {
            city,
            provider,
            settings,
            feed: Some(feed),
            stops,
            bikes,
            store: EntityStore::new(),
            viewport: ViewportState::default(),
            filter: FilterState::new(),
            query: SelectionQuery::parse(query),
            sync: SelectionSync::new(),
        };

        map.resync();
        map
    }

    /// Wait for the next feed change or fetched collection and apply it.
    /// Returns `false` once the feed has stopped for good.
    pub async fn next_update(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };

        let update = tokio::select! {
            stops = self.stops.landed() => {
                if let Some(stops) = stops {
                    self.store.load_stops(stops);
                    self.resync();
                }
                return true;
            }
            bikes = self.bikes.landed() => {
                if let Some(bikes) = bikes {
                    self.store.load_bikes(bikes);
                    self.resync();
                }
                return true;
            }
            update = feed.changed() => update,
        };

        match update {
            FeedUpdate::Snapshot(snapshot) => {
                self.on_positions(snapshot);
                true
            }
            FeedUpdate::State(state) => {
                debug!(city = %self.city, state = ?state, "connection state changed");
                !state.is_terminal()
            }
            FeedUpdate::Failed(err) => {
                error!(city = %self.city, code = %err.code(), error = %err, "live feed stopped");
                false
            }
            FeedUpdate::Ended => false,
        }
    }

    /// True while stops or bike stations are still being fetched.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.stops.is_pending() || self.bikes.is_pending()
    }

    /// Replace the vehicle collection with `snapshot`.
    pub fn on_positions(&mut self, snapshot: VehicleSnapshot) {
        self.store.replace_vehicles(snapshot.vehicles);
        self.resync();
    }

    pub const fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
    }

    /// The URL query changed outside the session (history navigation, a
    /// pasted link).
    pub fn navigate(&mut self, query: &str) {
        self.query = SelectionQuery::parse(query);
        self.resync();
    }

    pub fn select_vehicle(&mut self, vehicle: &Vehicle) {
        self.select(SelectionQuery::Vehicle(VehicleKey::from(vehicle)));
    }

    pub fn select_stop(&mut self, stop: &Stop) {
        self.select(SelectionQuery::Stop(stop.id.clone()));
    }

    pub fn select_bike(&mut self, station: &BikeStation) {
        self.select(SelectionQuery::Bike(station.id.clone()));
    }

    /// Drop the current selection, adding a history entry.
    pub fn clear_selection(&mut self) {
        self.select(SelectionQuery::None);
    }

    fn select(&mut self, query: SelectionQuery) {
        self.provider.push(&query.to_query());
        self.query = query;
        self.resync();
    }

    fn resync(&mut self) {
        for effect in self.sync.reconcile(&self.query, &self.store) {
            match effect {
                Effect::ClearQuery => {
                    self.query = SelectionQuery::None;
                    self.provider.replace(&self.query.to_query());
                }
                Effect::Recenter(center) => self.provider.jump_to(center),
                Effect::Report(err) => {
                    info!(city = %self.city, reason = %err, "selection cleared");
                    self.provider.notify(Notification::error(err.to_string()));
                }
            }
        }
    }

    /// Make `criteria` the active filter and frame what it matches.
    pub fn apply_filter(&mut self, criteria: FilterCriteria) {
        let outcome = self.filter.apply(criteria, self.store.vehicles(), self.settings.thresholds.fit_limit);

        match outcome {
            FitOutcome::Disabled => {}
            FitOutcome::NoResults => {
                self.provider.notify(Notification::error("No vehicles found."));
            }
            FitOutcome::Matched { count, fit } => {
                if let Some(bounds) = fit {
                    self.provider.fit_bounds(bounds);
                }
                self.provider.notify(Notification::success(format!("Found {count} vehicles.")));
            }
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
    }

    /// Clear an active filter, or ask the caller to open the filter editor.
    pub fn toggle_filter(&mut self) -> FilterToggle {
        self.filter.toggle()
    }

    #[must_use]
    pub fn visible(&self) -> Visible<'_> {
        map_view::visible(
            &self.store,
            &self.viewport,
            self.filter.criteria(),
            self.sync.selection(),
            &self.settings.thresholds,
        )
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        self.sync.selection()
    }

    #[must_use]
    pub const fn query(&self) -> &SelectionQuery {
        &self.query
    }

    #[must_use]
    pub const fn criteria(&self) -> &FilterCriteria {
        self.filter.criteria()
    }

    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// True until the first vehicle snapshot has arrived.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.feed.as_ref().map_or(ConnectionState::Closed, FeedHandle::state)
    }

    /// Close the feed connection and abandon outstanding fetches.
    pub async fn unmount(mut self) {
        self.stops.abort();
        self.bikes.abort();
        if let Some(feed) = self.feed.take() {
            feed.disconnect().await;
        }
        info!(city = %self.city, "city map unmounted");
    }
}

impl<P: Provider> Drop for CityMap<P> {
    fn drop(&mut self) {
        self.stops.abort();
        self.bikes.abort();
    }
}

async fn fetch_stops<P: Provider>(city: City, provider: Arc<P>) -> Option<Vec<Stop>> {
    match api::stops(&city, provider.as_ref()).await {
        Ok(stops) => Some(stops),
        Err(err) => {
            error!(monotonic_counter.fetch_errors = 1, city = %city, error = %err, "fetching stops failed");
            provider.notify(Notification::error("Could not fetch stops."));
            None
        }
    }
}

async fn fetch_bikes<P: Provider>(city: City, provider: Arc<P>) -> Option<Vec<BikeStation>> {
    match api::bikes(&city, provider.as_ref()).await {
        Ok(bikes) => Some(bikes),
        Err(err) => {
            error!(monotonic_counter.fetch_errors = 1, city = %city, error = %err, "fetching bike stations failed");
            provider.notify(Notification::error("Could not fetch bike stations."));
            None
        }
    }
}

// A one-shot static data fetch running beside the feed.
struct Fetch<T>(Option<JoinHandle<Option<Vec<T>>>>);

impl<T: Send + 'static> Fetch<T> {
    fn spawn(fetch: impl Future<Output = Option<Vec<T>>> + Send + 'static) -> Self {
        Self(Some(tokio::spawn(fetch)))
    }
}

impl<T> Fetch<T> {
    const fn idle() -> Self {
        Self(None)
    }

    const fn is_pending(&self) -> bool {
        self.0.is_some()
    }

    // Resolves once with the fetched collection; pends forever when idle.
    async fn landed(&mut self) -> Option<Vec<T>> {
        let Some(task) = self.0.as_mut() else {
            return future::pending().await;
        };
        let result = task.await;
        self.0 = None;

        match result {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "static data fetch did not finish");
                None
            }
        }
    }

    fn abort(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}
