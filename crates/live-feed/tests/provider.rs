#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use bytes::Bytes;
use live_feed::{FeedConnection, FeedRequest, FeedTransport, POSITIONS, TransportEvent};
use serde_json::Value;

/// Scripted outcome of one connect call.
pub enum Step {
    /// Connect and replay `events`. With `hold` the connection then stays
    /// open, otherwise the stream ends.
    Connect { events: Vec<TransportEvent>, hold: bool },
    Fail,

    /// Never completes; only the connect timeout ends it.
    Hang,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicUsize,
    closes: AtomicUsize,
    releases: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    uris: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
}

impl MockTransport {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self { steps: Arc::new(Mutex::new(steps.into_iter().collect())), ..Self::default() }
    }

    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().expect("lock").clone()
    }
}

impl FeedTransport for MockTransport {
    type Connection = MockConnection;

    async fn connect(&self, request: &FeedRequest) -> Result<MockConnection> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        self.uris.lock().expect("lock").push(request.uri());

        let step = self.steps.lock().expect("lock").pop_front().unwrap_or(Step::Fail);
        match step {
            Step::Connect { events, hold } => Ok(MockConnection {
                events: events.into(),
                hold,
                counters: Arc::clone(&self.counters),
            }),
            Step::Fail => Err(anyhow!("connection refused")),
            Step::Hang => std::future::pending().await,
        }
    }
}

pub struct MockConnection {
    events: VecDeque<TransportEvent>,
    hold: bool,
    counters: Arc<Counters>,
}

impl FeedConnection for MockConnection {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.hold {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn close(self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// A `positions` event carrying `vehicles`.
#[must_use]
pub fn positions(vehicles: &Value) -> TransportEvent {
    TransportEvent::Message {
        event: POSITIONS.to_string(),
        payload: Bytes::from(serde_json::to_vec(vehicles).expect("serialize positions")),
    }
}
