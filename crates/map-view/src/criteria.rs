use std::collections::BTreeSet;

use common::{Bounds, Located, Stop, Vehicle, VehicleType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Route and vehicle type filter. An empty set leaves its dimension
/// unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub routes: BTreeSet<String>,
    pub types: BTreeSet<VehicleType>,
}

impl FilterCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes.extend(routes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn types(mut self, types: impl IntoIterator<Item = VehicleType>) -> Self {
        self.types.extend(types);
        self
    }

    /// True when either dimension restricts anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.routes.is_empty() || !self.types.is_empty()
    }

    #[must_use]
    pub fn matches_vehicle(&self, vehicle: &Vehicle) -> bool {
        (self.routes.is_empty() || self.routes.contains(&vehicle.route))
            && (self.types.is_empty() || self.types.contains(&vehicle.kind))
    }

    /// A stop matches when it serves any selected type. Routes do not apply.
    #[must_use]
    pub fn matches_stop(&self, stop: &Stop) -> bool {
        self.types.is_empty() || !self.types.is_disjoint(&stop.types)
    }

    /// Count the vehicles these criteria select and, when there are at most
    /// `limit` of them, the box enclosing the ones with a known location.
    #[must_use]
    pub fn fit(&self, vehicles: &[Vehicle], limit: usize) -> FitOutcome {
        if !self.is_enabled() {
            return FitOutcome::Disabled;
        }

        let matched: Vec<&Vehicle> = vehicles.iter().filter(|v| self.matches_vehicle(v)).collect();
        let count = matched.len();
        if count == 0 {
            return FitOutcome::NoResults;
        }

        let fit = if count <= limit {
            Bounds::from_points(matched.iter().filter_map(|v| v.location()))
        } else {
            None
        };
        debug!(count, limit, fit = fit.is_some(), "filter matched");

        FitOutcome::Matched { count, fit }
    }
}

/// Result of applying filter criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    /// The criteria restrict nothing.
    Disabled,
    NoResults,
    Matched {
        count: usize,

        /// Box to fit the viewport to. `None` above the fit limit.
        fit: Option<Bounds>,
    },
}

/// What [`FilterState::toggle`] asks the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterToggle {
    Cleared,
    OpenEditor,
}

/// The active filter, shared by the filter editor and the viewport engine.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    criteria: FilterCriteria,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replace the active criteria, reporting what they match in `vehicles`.
    pub fn apply(&mut self, criteria: FilterCriteria, vehicles: &[Vehicle], limit: usize) -> FitOutcome {
        let outcome = criteria.fit(vehicles, limit);
        self.criteria = criteria;
        outcome
    }

    pub fn clear(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    /// Clear an active filter, otherwise ask for the editor.
    pub fn toggle(&mut self) -> FilterToggle {
        if self.criteria.is_enabled() {
            self.clear();
            FilterToggle::Cleared
        } else {
            FilterToggle::OpenEditor
        }
    }
}
