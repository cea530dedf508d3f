//! Connection lifecycle against a scripted transport.

mod provider;

use std::time::Duration;

use live_feed::{
    ConnectionState, FeedRequest, FeedUpdate, ReconnectPolicy, TransportEvent, connect,
};
use pretty_assertions::assert_eq;
use realtime::{Action, Error, Level, NotificationCenter};
use serde_json::json;
use tokio::time::Instant;

use self::provider::{MockTransport, Step, positions};

fn request() -> FeedRequest {
    FeedRequest::new("https://transitapi.me/", "warsaw")
}

// Positions replace the whole collection and disconnecting closes the
// connection exactly once.
#[tokio::test(start_paused = true)]
async fn positions_replace_snapshot() {
    let transport = MockTransport::new([Step::Connect {
        events: vec![
            positions(&json!([
                {"id": "1", "type": 3, "route": "175", "location": [52.23, 21.01]},
                {"id": "2", "type": 0, "route": "9", "location": [52.24, 21.02]}
            ])),
            positions(&json!([{"id": "3", "type": 3, "route": "180"}])),
        ],
        hold: true,
    }]);
    let center = NotificationCenter::new();

    let mut handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut states = handle.states();

    let snapshot = loop {
        match handle.changed().await {
            FeedUpdate::Snapshot(snapshot) if snapshot.vehicles.len() == 1 => break snapshot,
            FeedUpdate::Ended => panic!("feed ended early"),
            _ => {}
        }
    };
    assert_eq!(snapshot.vehicles[0].id, "3");
    assert_eq!(handle.latest().map(|s| s.vehicles.len()), Some(1));
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(transport.uris(), vec!["https://transitapi.me/?city=warsaw".to_string()]);

    handle.disconnect().await;

    assert_eq!(*states.borrow_and_update(), ConnectionState::Closed);
    assert_eq!(transport.closes(), 1);
    assert_eq!(transport.releases(), 1);
    assert!(center.active().is_empty());
}

// An initial failure plus five failed reconnects ends in a single terminal
// notification and no further attempts.
#[tokio::test(start_paused = true)]
async fn gives_up_after_attempts() {
    let transport = MockTransport::new([Step::Fail]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut states = handle.states();
    states.wait_for(|state| *state == ConnectionState::Failed).await.expect("final state");

    assert_eq!(transport.attempts(), 6);

    let active = center.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, Level::Blank);
    assert_eq!(active[0].message, "Could not restore connection to server.");
    assert_eq!(active[0].action, Some(Action::Reload));
    assert!(active[0].persistent);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.attempts(), 6);
    assert_eq!(handle.state(), ConnectionState::Failed);
}

// The owner learns why the feed stopped, then sees the feed end.
#[tokio::test(start_paused = true)]
async fn failure_reaches_owner() {
    let transport = MockTransport::new([Step::Fail]);
    let center = NotificationCenter::new();

    let mut handle = connect(transport, request(), ReconnectPolicy::default(), center);
    let err = loop {
        match handle.changed().await {
            FeedUpdate::Failed(err) => break err,
            FeedUpdate::Ended => panic!("feed ended without a failure"),
            _ => {}
        }
    };

    assert_eq!(err, Error::ConnectionFailed("5 reconnect attempts exhausted".to_string()));
    assert_eq!(err.code().as_u16(), 503);
    assert!(matches!(handle.changed().await, FeedUpdate::Ended));
}

// Closing the feed mid-reconnect removes the progress notification.
#[tokio::test(start_paused = true)]
async fn disconnect_dismisses_progress() {
    let transport = MockTransport::new([Step::Fail]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut states = handle.states();
    states.wait_for(|state| *state == ConnectionState::Reconnecting { attempt: 1 }).await.expect("state");
    tokio::task::yield_now().await;
    assert_eq!(center.active()[0].level, Level::Loading);

    handle.disconnect().await;

    assert!(center.active().is_empty());
    assert_eq!(*states.borrow(), ConnectionState::Closed);
}

// A dropped stream is retried; success replaces the progress notification in
// the same slot.
#[tokio::test(start_paused = true)]
async fn recovers_after_failure() {
    let transport = MockTransport::new([
        Step::Connect { events: vec![], hold: false },
        Step::Fail,
        Step::Connect {
            events: vec![positions(&json!([{"id": "1", "type": 3, "route": "175"}]))],
            hold: true,
        },
    ]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut snapshots = handle.snapshots();
    snapshots.wait_for(Option::is_some).await.expect("snapshot");

    assert_eq!(transport.attempts(), 3);
    assert_eq!(transport.closes(), 1);
    assert_eq!(handle.state(), ConnectionState::Connected);

    let active = center.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, Level::Success);
    assert_eq!(active[0].message, "Connection to server restored.");
}

// A connect that never completes is cut off by the timeout and counts as a
// failed attempt.
#[tokio::test(start_paused = true)]
async fn timeout_counts_as_attempt() {
    let transport = MockTransport::new([
        Step::Hang,
        Step::Connect {
            events: vec![positions(&json!([{"id": "1", "type": 3, "route": "175"}]))],
            hold: true,
        },
    ]);
    let center = NotificationCenter::new();
    let start = Instant::now();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut snapshots = handle.snapshots();
    snapshots.wait_for(Option::is_some).await.expect("snapshot");

    assert_eq!(transport.attempts(), 2);
    assert!(start.elapsed() >= Duration::from_secs(16));
    assert_eq!(center.active()[0].level, Level::Success);
}

// Reconnect progress is reported in one slot, counting up to the limit.
#[tokio::test(start_paused = true)]
async fn progress_shares_slot() {
    let transport = MockTransport::new([Step::Fail, Step::Fail]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut states = handle.states();
    states.wait_for(|state| *state == ConnectionState::Reconnecting { attempt: 2 }).await.expect("state");
    tokio::task::yield_now().await;

    let active = center.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, Level::Loading);
    assert_eq!(active[0].message, "Reconnecting to server... (2/5)");
}

// Non-fatal transport errors are logged, not surfaced.
#[tokio::test(start_paused = true)]
async fn transport_errors_are_quiet() {
    let transport = MockTransport::new([Step::Connect {
        events: vec![
            TransportEvent::Error("ping timeout".to_string()),
            TransportEvent::Message { event: "hello".to_string(), payload: "{}".into() },
            positions(&json!([{"id": "1", "type": 3, "route": "175"}])),
        ],
        hold: true,
    }]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center.clone());
    let mut snapshots = handle.snapshots();
    snapshots.wait_for(Option::is_some).await.expect("snapshot");

    assert_eq!(transport.attempts(), 1);
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert!(center.active().is_empty());
}

// Dropping the handle stops the feed and releases the connection.
#[tokio::test(start_paused = true)]
async fn drop_releases_connection() {
    let transport = MockTransport::new([Step::Connect { events: vec![], hold: true }]);
    let center = NotificationCenter::new();

    let handle = connect(transport.clone(), request(), ReconnectPolicy::default(), center);
    let mut states = handle.states();
    states.wait_for(|state| *state == ConnectionState::Connected).await.expect("connected");

    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(transport.releases(), 1);
    assert!(states.changed().await.is_err());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.attempts(), 1);
}
