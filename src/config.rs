//! Reconciler configuration.

use crate::error::{ChainError, Result};
use crate::types::ChannelId;
use serde::{Deserialize, Serialize};

/// Default number of link slots in a chain, root included.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Largest accepted capacity. Storage is reserved up front.
pub const MAX_CAPACITY: usize = 1 << 20;

/// The fixed set of channels a session knows about.
///
/// Participant order matters: a participant's position is the entity slot
/// its diffs address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRegistry {
    /// Reserved for the authority.
    pub server: ChannelId,
    pub participants: Vec<ChannelId>,
}

impl ChannelRegistry {
    pub fn new(server: ChannelId, participants: Vec<ChannelId>) -> Self {
        Self {
            server,
            participants,
        }
    }

    /// Server on channel 0, participants on `1..=count`.
    pub fn with_participants(count: u8) -> Self {
        Self {
            server: ChannelId(0),
            participants: (1..=count).map(ChannelId).collect(),
        }
    }

    /// Entity slot for a participant channel.
    pub fn entity_of(&self, channel: ChannelId) -> Option<usize> {
        self.participants.iter().position(|c| *c == channel)
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        channel == self.server || self.participants.contains(&channel)
    }

    /// All channels, server first.
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        std::iter::once(self.server).chain(self.participants.iter().copied())
    }

}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::with_participants(2)
    }
}

/// How per-channel sequence liveness is tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LivenessPolicy {
    /// Drop anything at or below the last accepted sequence.
    #[default]
    DropStale,

    /// Also remember skipped sequences as missing. A missing sequence is
    /// accepted when it finally arrives.
    TrackGaps,
}

/// Configuration for a [`ReconciliationService`](crate::ReconciliationService).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Link slots available between syncs, root included.
    pub capacity: usize,

    pub registry: ChannelRegistry,

    /// The participant this session predicts for.
    pub owner: ChannelId,

    pub liveness: LivenessPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            registry: ChannelRegistry::default(),
            owner: ChannelId(1),
            liveness: LivenessPolicy::DropStale,
        }
    }
}

impl ReconcilerConfig {
    pub fn for_owner(owner: ChannelId) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_capacity(self.capacity)?;

        let participants = &self.registry.participants;
        if participants.contains(&self.registry.server) {
            return Err(ChainError::InvalidConfig(format!(
                "server channel {} listed as a participant",
                self.registry.server
            )));
        }

        for (i, channel) in participants.iter().enumerate() {
            if participants[..i].contains(channel) {
                return Err(ChainError::InvalidConfig(format!(
                    "duplicate participant channel {}",
                    channel
                )));
            }
        }

        if self.registry.entity_of(self.owner).is_none() {
            return Err(ChainError::InvalidConfig(format!(
                "owner channel {} is not a participant",
                self.owner
            )));
        }

        Ok(())
    }
}

/// Reject capacities that cannot hold the root or are too large to reserve.
pub(crate) fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(ChainError::InvalidConfig(
            "capacity must hold at least the root link".to_string(),
        ));
    }
    if capacity > MAX_CAPACITY {
        return Err(ChainError::InvalidConfig(format!(
            "capacity {} exceeds maximum {}",
            capacity, MAX_CAPACITY
        )));
    }
    Ok(())
}
