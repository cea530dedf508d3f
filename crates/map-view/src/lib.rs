//! # Map View
//!
//! Synchronous core of the live map: the entity store, filter criteria, the
//! viewport filter engine and the selection synchronizer. Nothing here
//! performs I/O; callers apply the returned effects.

mod criteria;
mod selection;
mod store;
mod viewport;

pub use self::criteria::{FilterCriteria, FilterState, FilterToggle, FitOutcome};
pub use self::selection::{Effect, Selection, SelectionError, SelectionQuery, SelectionSync, VehicleKey};
pub use self::store::EntityStore;
pub use self::viewport::{Thresholds, ViewportState, Visible, visible};
