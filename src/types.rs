//! Core types shared by the chain and the reconciliation service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Logical source lane for events.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct ChannelId(pub u8);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-channel event counter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    /// The following sequence, or `None` at `u64::MAX`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Sequence)
    }
}

/// Identifies an event by its origin channel and its order on that channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EventId {
    pub channel: ChannelId,
    pub sequence: Sequence,
}

impl EventId {
    pub fn new(channel: ChannelId, sequence: u64) -> Self {
        Self {
            channel,
            sequence: Sequence(sequence),
        }
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({}:{})", self.channel.0, self.sequence.0)
    }
}

/// A per-entity diff sent by a participant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Game-clock time the update takes effect.
    pub timestamp: f32,
    pub id: EventId,
    pub diff_x: f32,
    pub diff_y: f32,
}

/// An authoritative snapshot sent by the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncEvent<T> {
    pub id: EventId,
    pub timestamp: f32,
    /// Absolute state at `timestamp`.
    pub current_state: T,
    /// Highest sequence the server had incorporated per channel.
    /// Channels absent from the map have had nothing seen.
    pub last_seen: HashMap<ChannelId, Sequence>,
}
