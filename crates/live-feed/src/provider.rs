//! # Provider
//!
//! Transport interfaces implemented by the host (socket.io, websocket, test
//! doubles, ...).

use anyhow::Result;
use bytes::Bytes;

/// Connection parameters for one city's feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub url: String,
    pub city: String,
}

impl FeedRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, city: impl Into<String>) -> Self {
        Self { url: url.into(), city: city.into() }
    }

    /// Feed URL with the city query parameter applied.
    #[must_use]
    pub fn uri(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}city={}", self.url, urlencoding::encode(&self.city))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A named event and its JSON payload.
    Message { event: String, payload: Bytes },

    /// A transport error that did not end the connection.
    Error(String),

    /// The connection dropped.
    Closed { reason: String },
}

/// The `FeedTransport` trait opens streaming connections.
pub trait FeedTransport: Send + Sync + 'static {
    type Connection: FeedConnection;

    /// Open a connection to the feed described by `request`.
    fn connect(
        &self, request: &FeedRequest,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// An open streaming connection.
pub trait FeedConnection: Send + 'static {
    /// Wait for the next event. `None` means the stream has ended.
    fn next_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Close the connection and release its resources.
    fn close(self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::FeedRequest;

    #[test]
    fn city_query() {
        let request = FeedRequest::new("https://transitapi.me/", "warsaw");
        assert_eq!(request.uri(), "https://transitapi.me/?city=warsaw");

        let request = FeedRequest::new("https://transitapi.me/?v=2", "zielona góra");
        assert_eq!(request.uri(), "https://transitapi.me/?v=2&city=zielona%20g%C3%B3ra");
    }
}
