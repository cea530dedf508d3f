//! Connection lifecycle for a single city's feed.

use common::Vehicle;
use realtime::{Action, Error, Notification, NotificationKey, Notifier, Result};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::policy::ReconnectPolicy;
use crate::provider::{FeedConnection, FeedRequest, FeedTransport, TransportEvent};
use crate::state::{ConnectionState, VehicleSnapshot};

/// Event carrying the full vehicle collection.
pub const POSITIONS: &str = "positions";

/// Connect to a city's feed.
///
/// The connection is driven by a spawned task that lives until the returned
/// handle is disconnected or dropped. Must be called within a Tokio runtime.
pub fn connect<T, N>(
    transport: T, request: FeedRequest, policy: ReconnectPolicy, notifier: N,
) -> FeedHandle
where
    T: FeedTransport,
    N: Notifier + 'static,
{
    let (snapshot_tx, snapshots) = watch::channel(None);
    let (state_tx, state) = watch::channel(ConnectionState::Connecting);
    let (shutdown, shutdown_rx) = oneshot::channel();

    info!(city = %request.city, uri = %request.uri(), "connecting to live feed");

    let driver = Driver {
        transport,
        request,
        policy,
        notifier,
        snapshots: snapshot_tx,
        state: state_tx,
        connection: None,
        slot: None,
    };
    let task = tokio::spawn(driver.run(shutdown_rx));

    FeedHandle { snapshots, state, shutdown: Some(shutdown), task: Some(task) }
}

/// What changed on the feed since the last call to [`FeedHandle::changed`].
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    Snapshot(VehicleSnapshot),
    State(ConnectionState),

    /// Reconnect attempts are exhausted. Only a full reload recovers.
    Failed(Error),

    /// The feed task has finished; no further updates will arrive.
    Ended,
}

/// Owner's side of a live feed. Dropping the handle tears the connection down.
#[derive(Debug)]
pub struct FeedHandle {
    snapshots: watch::Receiver<Option<VehicleSnapshot>>,
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl FeedHandle {
    /// The most recent snapshot, if any has arrived.
    #[must_use]
    pub fn latest(&self) -> Option<VehicleSnapshot> {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Option<VehicleSnapshot>> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn states(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait for the next snapshot or connection state change.
    pub async fn changed(&mut self) -> FeedUpdate {
        tokio::select! {
            biased;
            result = self.state.changed() => match result {
                Ok(()) => {
                    let state = *self.state.borrow_and_update();
                    if state == ConnectionState::Failed {
                        FeedUpdate::Failed(self.failure().await)
                    } else {
                        FeedUpdate::State(state)
                    }
                }
                Err(_) => FeedUpdate::Ended,
            },
            result = self.snapshots.changed() => match result {
                Ok(()) => match self.snapshots.borrow_and_update().clone() {
                    Some(snapshot) => FeedUpdate::Snapshot(snapshot),
                    None => FeedUpdate::State(*self.state.borrow()),
                },
                Err(_) => FeedUpdate::Ended,
            },
        }
    }

    // The error the feed task stopped with.
    async fn failure(&mut self) -> Error {
        let Some(task) = self.task.as_mut() else {
            return Error::ConnectionFailed("live feed already stopped".to_string());
        };
        let result = task.await;
        self.task = None;

        match result {
            Ok(Err(err)) => err,
            Ok(Ok(())) => Error::ConnectionFailed("live feed stopped".to_string()),
            Err(err) => Error::Internal(format!("live feed task failed: {err}")),
        }
    }

    /// Close the connection and wait for the feed task to finish.
    pub async fn disconnect(mut self) {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            debug!("live feed task already finished");
        }
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "live feed had already failed"),
            Err(err) => warn!(error = %err, "live feed task did not shut down cleanly"),
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver<T: FeedTransport, N> {
    transport: T,
    request: FeedRequest,
    policy: ReconnectPolicy,
    notifier: N,
    snapshots: watch::Sender<Option<VehicleSnapshot>>,
    state: watch::Sender<ConnectionState>,
    connection: Option<T::Connection>,

    // notification slot shared by reconnect progress, success and failure
    slot: Option<NotificationKey>,
}

impl<T: FeedTransport, N: Notifier> Driver<T, N> {
    async fn run(mut self, shutdown: oneshot::Receiver<()>) -> Result<()> {
        tokio::select! {
            result = self.drive() => result,
            _ = shutdown => {
                if let Some(slot) = self.slot.take() {
                    self.notifier.dismiss(slot);
                }
                if let Some(connection) = self.connection.take() {
                    connection.close().await;
                }
                self.state.send_replace(ConnectionState::Closed);
                info!(city = %self.request.city, "live feed closed");
                Ok(())
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        self.connection = open(&self.transport, &self.request, &self.policy).await;

        loop {
            if self.connection.is_none() {
                let Some(connection) = self.reconnect().await else {
                    return Err(self.fail());
                };
                self.connection = Some(connection);
            }

            self.state.send_replace(ConnectionState::Connected);
            self.listen().await;
        }
    }

    // Consume events until the connection drops.
    async fn listen(&mut self) {
        let Self { request, snapshots, connection, .. } = self;
        let Some(live) = connection.as_mut() else {
            return;
        };

        loop {
            match live.next_event().await {
                Some(TransportEvent::Message { event, payload }) if event == POSITIONS => {
                    publish(snapshots, &request.city, &payload);
                }
                Some(TransportEvent::Message { event, .. }) => {
                    debug!(city = %request.city, event = %event, "ignoring feed event");
                }
                Some(TransportEvent::Error(err)) => {
                    warn!(monotonic_counter.transport_errors = 1, city = %request.city, error = %err, "live feed transport error");
                }
                Some(TransportEvent::Closed { reason }) => {
                    warn!(city = %request.city, reason = %reason, "live feed disconnected");
                    break;
                }
                None => {
                    warn!(city = %request.city, "live feed stream ended");
                    break;
                }
            }
        }

        if let Some(dropped) = connection.take() {
            dropped.close().await;
        }
    }

    async fn reconnect(&mut self) -> Option<T::Connection> {
        let attempts = self.policy.attempts;

        for attempt in 1..=attempts {
            tokio::time::sleep(self.policy.delay).await;

            self.state.send_replace(ConnectionState::Reconnecting { attempt });
            let slot = *self.slot.get_or_insert_with(NotificationKey::new);
            self.notifier.notify(
                Notification::loading(format!("Reconnecting to server... ({attempt}/{attempts})"))
                    .key(slot),
            );
            info!(monotonic_counter.reconnect_attempts = 1, city = %self.request.city, attempt, "reconnecting to live feed");

            if let Some(connection) = open(&self.transport, &self.request, &self.policy).await {
                self.notifier.notify(Notification::success("Connection to server restored.").key(slot));
                self.slot = None;
                info!(city = %self.request.city, attempt, "live feed connection restored");
                return Some(connection);
            }
        }

        None
    }

    fn fail(&mut self) -> Error {
        let slot = self.slot.take().unwrap_or_default();
        let err =
            Error::ConnectionFailed(format!("{} reconnect attempts exhausted", self.policy.attempts));
        error!(monotonic_counter.reconnect_failures = 1, city = %self.request.city, error = %err, "giving up on live feed");
        self.notifier.notify(
            Notification::blank("Could not restore connection to server.")
                .key(slot)
                .action(Action::Reload)
                .persistent(),
        );
        self.state.send_replace(ConnectionState::Failed);
        err
    }
}

async fn open<T: FeedTransport>(
    transport: &T, request: &FeedRequest, policy: &ReconnectPolicy,
) -> Option<T::Connection> {
    match tokio::time::timeout(policy.timeout, transport.connect(request)).await {
        Ok(Ok(connection)) => Some(connection),
        Ok(Err(err)) => {
            warn!(city = %request.city, error = ?err, "live feed connection failed");
            None
        }
        Err(elapsed) => {
            warn!(city = %request.city, timeout = ?policy.timeout, error = %elapsed, "live feed connection timed out");
            None
        }
    }
}

// Replace the published snapshot. Undecodable payloads leave the previous
// snapshot in place.
fn publish(snapshots: &watch::Sender<Option<VehicleSnapshot>>, city: &str, payload: &[u8]) {
    match serde_json::from_slice::<Vec<Vehicle>>(payload) {
        Ok(vehicles) => {
            debug!(city, count = vehicles.len(), "positions received");
            snapshots.send_replace(Some(VehicleSnapshot::new(vehicles)));
        }
        Err(err) => {
            warn!(monotonic_counter.invalid_positions = 1, city, error = %err, "discarding undecodable positions");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::watch;

    use super::publish;

    #[test]
    fn publish_replaces() {
        let (tx, rx) = watch::channel(None);

        publish(&tx, "warsaw", br#"[{"id":"1","type":3,"route":"175"},{"id":"2","type":0,"route":"9"}]"#);
        assert_eq!(rx.borrow().as_ref().map(|s| s.vehicles.len()), Some(2));

        publish(&tx, "warsaw", br#"[{"id":"3","type":3,"route":"180"}]"#);
        let latest = rx.borrow().clone().expect("snapshot");
        assert_eq!(latest.vehicles.len(), 1);
        assert_eq!(latest.vehicles[0].id, "3");
    }

    #[test]
    fn publish_keeps_previous_on_garbage() {
        let (tx, rx) = watch::channel(None);

        publish(&tx, "warsaw", br#"[{"id":"1","type":3,"route":"175"}]"#);
        publish(&tx, "warsaw", b"not json");
        publish(&tx, "warsaw", br#"{"id":"1"}"#);

        assert_eq!(rx.borrow().as_ref().map(|s| s.vehicles[0].id.clone()), Some("1".to_string()));
    }
}
