//! # Viewport Filter Engine
//!
//! Derives which entities should be drawn for the current viewport, filter
//! and selection. Re-run on every change to any of them.

use common::{BikeStation, Bounds, Located, Stop, Vehicle};
use serde::{Deserialize, Serialize};

use crate::criteria::FilterCriteria;
use crate::selection::Selection;
use crate::store::EntityStore;

/// Map camera as reported by the map widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// `None` until the map has laid out.
    pub bounds: Option<Bounds>,
    pub zoom: f64,
    pub bearing: f64,
}

impl ViewportState {
    #[must_use]
    pub const fn new(bounds: Bounds, zoom: f64, bearing: f64) -> Self {
        Self { bounds: Some(bounds), zoom, bearing }
    }
}

/// Density limits for each entity class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Vehicles are drawn from this zoom level up.
    pub vehicle_min_zoom: f64,

    /// Stops and bike stations are drawn from this zoom level up.
    pub stop_min_zoom: f64,

    /// A filtered vehicle set this small is drawn at any zoom.
    pub filter_override_limit: usize,

    /// Largest filter match the viewport is fitted to.
    pub fit_limit: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { vehicle_min_zoom: 14.0, stop_min_zoom: 15.0, filter_override_limit: 100, fit_limit: 100 }
    }
}

/// Entities to draw, borrowed from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visible<'a> {
    pub vehicles: Vec<&'a Vehicle>,
    pub stops: Vec<&'a Stop>,
    pub bikes: Vec<&'a BikeStation>,

    /// Map bearing for orienting vehicle markers.
    pub bearing: f64,
}

impl Visible<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.stops.is_empty() && self.bikes.is_empty()
    }
}

/// Compute the visible subset of every entity class.
///
/// Any selection hides all ambient markers. Otherwise an entity is visible
/// when it lies inside the viewport, passes the filter (vehicles and stops
/// only) and its class is open at the current zoom. Vehicles are also shown
/// below their zoom threshold when an enabled filter narrows them to at most
/// `filter_override_limit` on screen.
#[must_use]
pub fn visible<'a>(
    store: &'a EntityStore, viewport: &ViewportState, criteria: &FilterCriteria,
    selection: &Selection, thresholds: &Thresholds,
) -> Visible<'a> {
    let mut visible = Visible { bearing: viewport.bearing, ..Visible::default() };

    if !selection.is_none() {
        return visible;
    }
    let Some(bounds) = viewport.bounds else {
        return visible;
    };

    let vehicles: Vec<&Vehicle> = store
        .vehicles()
        .iter()
        .filter(|v| criteria.matches_vehicle(v) && within(&bounds, *v))
        .collect();
    let overridden = criteria.is_enabled() && vehicles.len() <= thresholds.filter_override_limit;
    if viewport.zoom >= thresholds.vehicle_min_zoom || overridden {
        visible.vehicles = vehicles;
    }

    if viewport.zoom >= thresholds.stop_min_zoom {
        visible.stops = store
            .stops()
            .iter()
            .filter(|s| criteria.matches_stop(s) && within(&bounds, *s))
            .collect();
        visible.bikes = store.bikes().iter().filter(|b| within(&bounds, *b)).collect();
    }

    visible
}

fn within(bounds: &Bounds, entity: &impl Located) -> bool {
    entity.location().is_some_and(|point| bounds.contains(point))
}
