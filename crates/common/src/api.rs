//! One-shot static data requests (stops and bike stations).

use std::fmt;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::Method;
use http::header::ACCEPT;
use http_body_util::Empty;
use realtime::{Config, HttpRequest, bad_gateway, bad_request};
use serde::de::DeserializeOwned;

use crate::city::City;
use crate::model::{BikeStation, Stop};

/// Static data sets fetched once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Stops,
    Bikes,
}

impl Resource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stops => "stops",
            Self::Bikes => "bikes",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieves every stop in the city.
///
/// # Errors
///
/// Returns an error when the request fails, the API answers with a
/// non-success status, or the response cannot be deserialized.
pub async fn stops<P>(city: &City, provider: &P) -> realtime::Result<Vec<Stop>>
where
    P: Config + HttpRequest,
{
    Ok(fetch(Resource::Stops, city, provider).await?)
}

/// Retrieves every bike-share station in the city.
///
/// # Errors
///
/// Returns an error when the request fails, the API answers with a
/// non-success status, or the response cannot be deserialized.
pub async fn bikes<P>(city: &City, provider: &P) -> realtime::Result<Vec<BikeStation>>
where
    P: Config + HttpRequest,
{
    Ok(fetch(Resource::Bikes, city, provider).await?)
}

async fn fetch<P, T>(resource: Resource, city: &City, provider: &P) -> Result<Vec<T>>
where
    P: Config + HttpRequest,
    T: DeserializeOwned,
{
    if city.id.trim().is_empty() {
        return Err(bad_request!("{} requested without a city", resource)).context("fetching static data");
    }

    let api_url = Config::get(provider, "API_URL").await.context("getting `API_URL`")?;
    let url = format!(
        "{}/{resource}?city={}",
        api_url.trim_end_matches('/'),
        urlencoding::encode(&city.id)
    );

    let request = http::Request::builder()
        .method(Method::GET)
        .uri(url)
        .header(ACCEPT, "application/json")
        .body(Empty::<Bytes>::new())
        .with_context(|| format!("building {resource} request"))?;

    let response = HttpRequest::fetch(provider, request)
        .await
        .with_context(|| format!("failed to fetch {resource} for {city}"))?;

    if !response.status().is_success() {
        return Err(bad_gateway!("{} request for {} returned {}", resource, city, response.status()))
            .context("fetching static data");
    }

    let body = response.into_body();
    let records: Vec<T> = serde_json::from_slice(&body)
        .map_err(realtime::Error::from)
        .with_context(|| format!("failed to decode {resource} response"))?;

    tracing::debug!(resource = %resource, city = %city, count = records.len(), "static data loaded");
    Ok(records)
}
