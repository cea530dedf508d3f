use common::{Snapshot, Vehicle};

/// Health of the live feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },

    /// Reconnect attempts exhausted. Only a full reload recovers.
    Failed,

    /// Torn down by its owner.
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

/// The full vehicle collection as of one `positions` event.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub vehicles: Snapshot<Vehicle>,
}

impl VehicleSnapshot {
    #[must_use]
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles: vehicles.into() }
    }
}
