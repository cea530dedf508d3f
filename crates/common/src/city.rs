use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use realtime::{Result, not_found};
use serde::{Deserialize, Serialize};

/// A city with a live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    #[serde(default)]
    pub api: CityApi,
}

/// Static data sets the city's API offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityApi {
    pub stops: bool,
    pub bikes: bool,
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    api: CityApi,
}

impl City {
    #[must_use]
    pub fn new(id: impl Into<String>, api: CityApi) -> Self {
        Self { id: id.into(), api }
    }

    /// Look up a city in a catalog document keyed by city id.
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog cannot be decoded or does not list
    /// the city.
    pub fn from_catalog(catalog: &[u8], id: &str) -> Result<Self> {
        let mut entries: HashMap<String, CatalogEntry> =
            serde_json::from_slice(catalog).context("decoding city catalog")?;
        let Some(entry) = entries.remove(id) else {
            return Err(not_found!("city {} is not in the catalog", id));
        };
        Ok(Self::new(id, entry.api))
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use realtime::Error;

    use super::*;

    const CATALOG: &str = r#"{
        "warsaw": { "name": "Warszawa", "api": { "stops": true, "bikes": true } },
        "gdansk": { "name": "Gdańsk", "api": { "stops": true } },
        "lodz": { "name": "Łódź" }
    }"#;

    #[test]
    fn catalog_lookup() {
        let city = City::from_catalog(CATALOG.as_bytes(), "gdansk").expect("city");
        assert_eq!(city.api, CityApi { stops: true, bikes: false });

        let city = City::from_catalog(CATALOG.as_bytes(), "lodz").expect("city");
        assert_eq!(city.api, CityApi::default());
    }

    #[test]
    fn unknown_city() {
        let err = City::from_catalog(CATALOG.as_bytes(), "krakow").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn bad_catalog() {
        let err = City::from_catalog(b"[]", "warsaw").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
