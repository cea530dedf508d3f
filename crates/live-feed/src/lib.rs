//! # Live Feed
//!
//! Owns the streaming subscription for a city: connects, reconnects under a
//! bounded policy, and publishes every `positions` payload as a complete
//! vehicle snapshot.

mod manager;
mod policy;
mod provider;
mod state;

pub use self::manager::{FeedHandle, FeedUpdate, POSITIONS, connect};
pub use self::policy::ReconnectPolicy;
pub use self::provider::*;
pub use self::state::{ConnectionState, VehicleSnapshot};
