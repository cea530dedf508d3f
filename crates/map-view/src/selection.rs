//! # Selection Synchronizer
//!
//! Resolves the selection encoded in the URL query against the entity store.
//! The query is the source of truth; the resolved [`Selection`] is re-derived
//! whenever the query or the store changes.

use common::{BikeStation, GeoPoint, Stop, Vehicle, VehicleType};
use thiserror::Error;
use tracing::{debug, info};

use crate::store::EntityStore;

const VEHICLE: &str = "vehicle";
const STOP: &str = "stop";
const BIKE: &str = "bike";

/// Identity of a vehicle: its numeric type and feed id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VehicleKey {
    pub kind: VehicleType,
    pub id: String,
}

impl VehicleKey {
    #[must_use]
    pub fn new(kind: VehicleType, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    /// Ids travel with whitespace written as `+`, so both spellings match.
    #[must_use]
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        vehicle.kind == self.kind
            && (vehicle.id == self.id || vehicle.id == self.id.replace(char::is_whitespace, "+"))
    }
}

impl From<&Vehicle> for VehicleKey {
    fn from(vehicle: &Vehicle) -> Self {
        Self::new(vehicle.kind, vehicle.id.clone())
    }
}

/// Selection as encoded in the URL query. At most one entity is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionQuery {
    #[default]
    None,
    Vehicle(VehicleKey),
    Stop(String),
    Bike(String),

    /// A `vehicle` parameter that is not `<type>/<id>`.
    Malformed(String),
}

impl SelectionQuery {
    /// Decode a URL query string (with or without the leading `?`).
    ///
    /// When several selection parameters are present `vehicle` wins over
    /// `stop`, which wins over `bike`. Empty values count as absent.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let (mut vehicle, mut stop, mut bike) = (None, None, None);

        for pair in query.trim_start_matches('?').split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let slot = match name {
                VEHICLE => &mut vehicle,
                STOP => &mut stop,
                BIKE => &mut bike,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(form_decode(value));
            }
        }

        if let Some(vehicle) = vehicle {
            return Self::parse_vehicle(vehicle);
        }
        stop.map(Self::Stop).or_else(|| bike.map(Self::Bike)).unwrap_or_default()
    }

    fn parse_vehicle(value: String) -> Self {
        let Some((kind, id)) = value.split_once('/') else {
            return Self::Malformed(value);
        };
        match kind.parse::<VehicleType>() {
            Ok(kind) if !id.is_empty() => Self::Vehicle(VehicleKey::new(kind, id)),
            _ => Self::Malformed(value),
        }
    }

    /// Encode as a query string without the leading `?`. Empty for `None`.
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Vehicle(key) => format!("{VEHICLE}={}/{}", key.kind, form_encode(&key.id)),
            Self::Stop(id) => format!("{STOP}={}", form_encode(id)),
            Self::Bike(id) => format!("{BIKE}={}", form_encode(id)),
            Self::Malformed(raw) => format!("{VEHICLE}={}", form_encode(raw)),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

fn form_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

fn form_encode(value: &str) -> String {
    value.split(' ').map(urlencoding::encode).collect::<Vec<_>>().join("+")
}

/// The entity the current query resolves to.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
    #[default]
    None,
    Vehicle(Vehicle),
    Stop(Stop),
    Bike(BikeStation),
}

impl Selection {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Why a selection could not be resolved. Displays as the user-facing
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The selected vehicle dropped out of the feed.
    #[error("Lost connection to vehicle.")]
    VehicleLost,

    #[error("Vehicle not found.")]
    VehicleNotFound,

    #[error("Stop not found.")]
    StopNotFound,

    #[error("Station not found.")]
    StationNotFound,
}

/// Side effect requested by [`SelectionSync::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Remove the selection from the URL, replacing the history entry.
    ClearQuery,

    /// Jump the map to a point without animation.
    Recenter(GeoPoint),

    Report(SelectionError),
}

/// Keeps the resolved selection consistent with the query and the store.
#[derive(Debug, Clone, Default)]
pub struct SelectionSync {
    selection: Selection,

    // last vehicle query that resolved, survives empty snapshots
    resolved: Option<VehicleKey>,
}

impl SelectionSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Re-resolve `query` against `store`, returning the effects the caller
    /// must apply.
    ///
    /// A query whose entity class has nothing loaded resolves to no selection
    /// without reporting. A query naming an entity missing from a loaded
    /// class clears the query and reports the failure.
    pub fn reconcile(&mut self, query: &SelectionQuery, store: &EntityStore) -> Vec<Effect> {
        let previous = std::mem::take(&mut self.selection);
        if !matches!(query, SelectionQuery::Vehicle(_)) {
            self.resolved = None;
        }

        match query {
            SelectionQuery::None => Vec::new(),
            SelectionQuery::Malformed(raw) => {
                info!(query = %raw, "malformed vehicle selection");
                vec![Effect::ClearQuery, Effect::Report(SelectionError::VehicleNotFound)]
            }
            SelectionQuery::Vehicle(key) => {
                let vehicles = store.vehicles();
                if vehicles.is_empty() {
                    return Vec::new();
                }
                if let Some(vehicle) = vehicles.iter().find(|v| key.matches(v)) {
                    self.selection = Selection::Vehicle(vehicle.clone());
                    self.resolved = Some(key.clone());
                    return Vec::new();
                }

                let lost = self.resolved.take().as_ref() == Some(key);
                info!(kind = %key.kind, id = %key.id, lost, "selected vehicle not in snapshot");
                let error =
                    if lost { SelectionError::VehicleLost } else { SelectionError::VehicleNotFound };
                vec![Effect::ClearQuery, Effect::Report(error)]
            }
            SelectionQuery::Stop(id) => {
                let stops = store.stops();
                if stops.is_empty() {
                    return Vec::new();
                }
                let Some(stop) = stops.iter().find(|s| s.id == *id) else {
                    info!(id = %id, "selected stop not found");
                    return vec![Effect::ClearQuery, Effect::Report(SelectionError::StopNotFound)];
                };
                self.selection = Selection::Stop(stop.clone());
                Vec::new()
            }
            SelectionQuery::Bike(id) => {
                let bikes = store.bikes();
                if bikes.is_empty() {
                    return Vec::new();
                }
                let Some(station) = bikes.iter().find(|b| b.id == *id) else {
                    info!(id = %id, "selected bike station not found");
                    return vec![Effect::ClearQuery, Effect::Report(SelectionError::StationNotFound)];
                };

                let mut effects = Vec::new();
                let already = matches!(&previous, Selection::Bike(b) if b.id == station.id);
                if !already && let Some(location) = station.location {
                    debug!(id = %id, "recentering on bike station");
                    effects.push(Effect::Recenter(location));
                }
                self.selection = Selection::Bike(station.clone());
                effects
            }
        }
    }
}
