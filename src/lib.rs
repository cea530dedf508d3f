//! # Transit Map
//!
//! Live map session for a single city. Connects the vehicle feed, loads
//! static stops and bike stations, and keeps the visible markers and the URL
//! selection consistent with every snapshot, viewport change and filter edit.

mod city_map;
mod config;
mod provider;

pub use self::city_map::CityMap;
pub use self::config::Settings;
pub use self::provider::*;
