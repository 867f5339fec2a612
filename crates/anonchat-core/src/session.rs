use crate::room::RoomId;

/// Connection lifecycle state. Set only by connection open/close events;
/// there are no intermediate states and no recovery path from Disconnected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Health of the message poll loop. A failed poll is visible but non-fatal:
/// the loop keeps running and flips back to Healthy on the next good tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PollHealth {
    /// No room yet, so no polling.
    #[default]
    Idle,
    Healthy,
    Failing {
        reason: String,
    },
}

impl PollHealth {
    pub fn is_failing(&self) -> bool {
        matches!(self, Self::Failing { .. })
    }
}

/// The observable session state tuple. Published to subscribers on every
/// change; an update that leaves the snapshot equal is not re-published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    /// Unset until the backend assigns a room; never reverts to unset.
    pub room_id: Option<RoomId>,
    /// Display text of the room's messages, replaced wholesale on every
    /// successful poll tick.
    pub messages: Vec<String>,
    pub poll_health: PollHealth,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            room_id: None,
            messages: Vec::new(),
            poll_health: PollHealth::Idle,
        }
    }
}
