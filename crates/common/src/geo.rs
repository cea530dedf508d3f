//! Geographic primitives.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate. Travels on the wire as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lat, point.lon]
    }
}

/// An axis-aligned bounding box.
///
/// When `west > east` the box spans the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self { south: south_west.lat, west: south_west.lon, north: north_east.lat, east: north_east.lon }
    }

    /// Smallest box enclosing every point, or `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            let bounds = acc.map_or(
                Self { south: p.lat, west: p.lon, north: p.lat, east: p.lon },
                |b: Self| Self {
                    south: b.south.min(p.lat),
                    west: b.west.min(p.lon),
                    north: b.north.max(p.lat),
                    east: b.east.max(p.lon),
                },
            );
            Some(bounds)
        })
    }

    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        let in_lat = self.south <= point.lat && point.lat <= self.north;
        let in_lon = if self.west <= self.east {
            self.west <= point.lon && point.lon <= self.east
        } else {
            self.west <= point.lon || point.lon <= self.east
        };
        in_lat && in_lon
    }

    #[must_use]
    pub const fn south_west(&self) -> GeoPoint {
        GeoPoint::new(self.south, self.west)
    }

    #[must_use]
    pub const fn north_east(&self) -> GeoPoint {
        GeoPoint::new(self.north, self.east)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn warsaw() -> Bounds {
        Bounds::new(GeoPoint::new(52.1, 20.8), GeoPoint::new(52.4, 21.2))
    }

    #[test]
    fn contains_inclusive() {
        let bounds = warsaw();
        assert!(bounds.contains(GeoPoint::new(52.23, 21.01)));
        assert!(bounds.contains(GeoPoint::new(52.1, 20.8)));
        assert!(!bounds.contains(GeoPoint::new(52.5, 21.0)));
        assert!(!bounds.contains(GeoPoint::new(52.2, 21.3)));
    }

    #[test]
    fn antimeridian() {
        let bounds = Bounds::new(GeoPoint::new(-20.0, 170.0), GeoPoint::new(-10.0, -170.0));
        assert!(bounds.contains(GeoPoint::new(-15.0, 179.0)));
        assert!(bounds.contains(GeoPoint::new(-15.0, -175.0)));
        assert!(!bounds.contains(GeoPoint::new(-15.0, 0.0)));
    }

    #[test]
    fn from_points() {
        let points =
            [GeoPoint::new(52.2, 21.0), GeoPoint::new(52.3, 20.9), GeoPoint::new(52.25, 21.1)];
        let bounds = Bounds::from_points(points).expect("bounds");

        assert_eq!(bounds.south_west(), GeoPoint::new(52.2, 20.9));
        assert_eq!(bounds.north_east(), GeoPoint::new(52.3, 21.1));
        assert!(Bounds::from_points(Vec::<GeoPoint>::new()).is_none());
    }

    #[test]
    fn wire_format() {
        let point: GeoPoint = serde_json::from_str("[52.23, 21.01]").expect("point");
        assert_eq!(point, GeoPoint::new(52.23, 21.01));
        assert_eq!(serde_json::to_string(&point).expect("json"), "[52.23,21.01]");
    }
}
