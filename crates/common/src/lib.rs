//! # Common
//!
//! Entity model, geographic primitives and static data access shared by the
//! live map crates.

pub mod api;
pub mod city;
pub mod geo;
pub mod model;

pub use self::city::{City, CityApi};
pub use self::geo::{Bounds, GeoPoint};
pub use self::model::*;
