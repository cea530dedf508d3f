use common::{BikeStation, Snapshot, Stop, Vehicle};
use tracing::{debug, warn};

/// Latest known state of each entity class.
///
/// Vehicles are replaced wholesale on every feed snapshot. Stops and bike
/// stations are loaded at most once per session and are empty until then.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    vehicles: Option<Snapshot<Vehicle>>,
    stops: Option<Snapshot<Stop>>,
    bikes: Option<Snapshot<BikeStation>>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_vehicles(&mut self, vehicles: Snapshot<Vehicle>) {
        debug!(count = vehicles.len(), "vehicle snapshot replaced");
        self.vehicles = Some(vehicles);
    }

    /// Populate stops. Returns `false` when stops were already loaded this
    /// session; the existing collection is kept.
    pub fn load_stops(&mut self, stops: Vec<Stop>) -> bool {
        if self.stops.is_some() {
            warn!("stops already loaded, ignoring");
            return false;
        }
        self.stops = Some(stops.into());
        true
    }

    /// Populate bike stations. Returns `false` when they were already loaded.
    pub fn load_bikes(&mut self, bikes: Vec<BikeStation>) -> bool {
        if self.bikes.is_some() {
            warn!("bike stations already loaded, ignoring");
            return false;
        }
        self.bikes = Some(bikes.into());
        true
    }

    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        self.vehicles.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        self.stops.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn bikes(&self) -> &[BikeStation] {
        self.bikes.as_deref().unwrap_or_default()
    }

    /// True until the first vehicle snapshot arrives.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.vehicles.is_none()
    }
}
