//! # Provider
//!
//! Host interfaces the map session drives its side effects through.

use common::{Bounds, GeoPoint};
use realtime::{Config, HttpRequest, Notifier};

/// Provider entry point implemented by the host application.
pub trait Provider: HttpRequest + Config + Notifier + Navigator + MapControl {}

/// The `Navigator` trait owns the URL query string.
pub trait Navigator: Send + Sync {
    /// Add a history entry with `query` (without the leading `?`).
    fn push(&self, query: &str);

    /// Overwrite the current history entry's query.
    fn replace(&self, query: &str);
}

/// The `MapControl` trait moves the map camera.
pub trait MapControl: Send + Sync {
    /// Center on `center` without animating.
    fn jump_to(&self, center: GeoPoint);

    /// Fit the camera to `bounds` without animating.
    fn fit_bounds(&self, bounds: Bounds);
}
