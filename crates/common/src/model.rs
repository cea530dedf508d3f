//! Entity model for vehicles, stops and bike-share stations.

use std::collections::BTreeSet;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::GeoPoint;

/// An immutable, complete replacement of an entity collection.
pub type Snapshot<T> = Arc<[T]>;

/// Numeric vehicle type as published by the feed (GTFS route type codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleType(pub u16);

impl VehicleType {
    pub const BUS: Self = Self(3);
    pub const FERRY: Self = Self(4);
    pub const RAIL: Self = Self(2);
    pub const SUBWAY: Self = Self(1);
    pub const TRAM: Self = Self(0);
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VehicleType {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Anything that may carry a position on the map.
pub trait Located {
    fn location(&self) -> Option<GeoPoint>;
}

/// A live vehicle. Identity is the `(kind, id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VehicleType,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Type-specific attributes (heading, brigade, trip, headsign, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Vehicle {
    #[must_use]
    pub fn new(kind: VehicleType, id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            route: route.into(),
            location: None,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub const fn at(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

impl Located for Vehicle {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Vehicle types serving this stop.
    #[serde(rename = "type", default)]
    pub types: BTreeSet<VehicleType>,
}

impl Stop {
    /// Name followed by the short code, when there is one.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => format!("{} {code}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl Located for Stop {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

/// A bike-share station. Travels as `[id, name, [lat, lon], ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "(String, String, Option<GeoPoint>)")]
pub struct BikeStation {
    pub id: String,
    pub name: String,
    pub location: Option<GeoPoint>,
}

impl TryFrom<Vec<Value>> for BikeStation {
    type Error = String;

    fn try_from(values: Vec<Value>) -> Result<Self, Self::Error> {
        let id = match values.first() {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            other => return Err(format!("invalid bike station id: {other:?}")),
        };
        let name = values.get(1).and_then(Value::as_str).unwrap_or_default().to_string();
        let location =
            values.get(2).and_then(|value| serde_json::from_value(value.clone()).ok());

        Ok(Self { id, name, location })
    }
}

impl From<BikeStation> for (String, String, Option<GeoPoint>) {
    fn from(station: BikeStation) -> Self {
        (station.id, station.name, station.location)
    }
}

impl Located for BikeStation {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}
