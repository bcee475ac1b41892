//! Drives a state chain from participant updates and server snapshots.

use super::tracker::{Admission, SequenceTracker};
use crate::chain::StateChain;
use crate::config::ReconcilerConfig;
use crate::error::{ChainError, Result};
use crate::integrator::{EntityDiff, Integrator};
use crate::types::{ChannelId, EventId, Sequence, SyncEvent, UpdateEvent};
use tracing::{debug, info};

/// Result of handling a server snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The chain was rebased; `replayed` local diffs were carried over.
    Rebased { replayed: usize },
    /// An older or repeated snapshot; nothing changed.
    Stale,
}

/// Keeps a locally predicted state consistent with authoritative syncs.
///
/// Owns its chain exclusively. All calls are synchronous and expected to
/// run on a single session's update loop.
pub struct ReconciliationService<T, I> {
    chain: StateChain<T, I>,
    config: ReconcilerConfig,
    tracker: SequenceTracker,
    /// Latest sequence accepted on the owner's own channel.
    last_owned: Option<Sequence>,
}

impl<T, I> ReconciliationService<T, I>
where
    T: Clone + Default + EntityDiff,
    I: Integrator<T>,
{
    /// Create a service with a fresh chain sized by `config.capacity`.
    pub fn new(
        config: ReconcilerConfig,
        initial_state: T,
        timestamp: f32,
        integrator: I,
    ) -> Result<Self> {
        config.validate()?;
        let chain =
            StateChain::with_capacity(initial_state, timestamp, config.capacity, integrator)?;
        Ok(Self::assemble(chain, config))
    }

    /// Wrap an existing chain. The chain keeps its own capacity.
    pub fn from_chain(chain: StateChain<T, I>, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(chain, config))
    }

    fn assemble(chain: StateChain<T, I>, config: ReconcilerConfig) -> Self {
        let tracker = SequenceTracker::new(config.registry.channels(), config.liveness);
        Self {
            chain,
            config,
            tracker,
            last_owned: None,
        }
    }

    /// Apply a participant's update.
    ///
    /// Stale and duplicate events are dropped and reported as
    /// [`Admission::Stale`]. Sequence progress is only committed once the
    /// diff is in the chain.
    pub fn handle_update_event(&mut self, event: &UpdateEvent) -> Result<Admission> {
        let channel = event.id.channel;
        if channel == self.config.registry.server {
            return Err(ChainError::InvalidServerOrigin);
        }
        let entity = self
            .config
            .registry
            .entity_of(channel)
            .ok_or(ChainError::UnknownChannel(channel))?;

        let admission = self.tracker.admit(event.id)?;
        if admission == Admission::Stale {
            debug!(id = ?event.id, "dropping stale update");
            return Ok(admission);
        }

        let diff = T::entity_diff(entity, event.diff_x, event.diff_y);
        self.chain.add(diff, event.timestamp, event.id)?;
        self.tracker.record(event.id, admission);

        if channel == self.config.owner {
            self.last_owned = self.last_owned.max(Some(event.id.sequence));
        }
        Ok(admission)
    }

    /// Rebase onto a server snapshot.
    ///
    /// Owner diffs the server had not yet seen are replayed on top of the
    /// snapshot; every channel's progress is then raised to at least what
    /// the server reports.
    pub fn handle_server_sync_event(&mut self, event: SyncEvent<T>) -> Result<SyncOutcome> {
        let registry = &self.config.registry;
        if event.id.channel != registry.server {
            return Err(ChainError::UnexpectedSyncOrigin(event.id.channel));
        }
        if let Some(unknown) = event.last_seen.keys().find(|c| !registry.contains(**c)) {
            return Err(ChainError::UnknownChannel(*unknown));
        }

        if let Some(progress) = self.tracker.last_accepted(registry.server) {
            if event.id.sequence <= progress {
                debug!(id = ?event.id, "dropping stale sync");
                return Ok(SyncOutcome::Stale);
            }
        }

        // Nothing acknowledged means every owner diff is replayed.
        let owner = self.config.owner;
        let acknowledged = event.last_seen.get(&owner).copied();
        let include_from = match acknowledged {
            Some(seen) => seen.next().ok_or(ChainError::SequenceOverflow(owner))?,
            None => Sequence(0),
        };

        let replayed = self.chain.reset(
            event.current_state,
            event.timestamp,
            event.id,
            EventId {
                channel: owner,
                sequence: include_from,
            },
        )?;

        for channel in self.config.registry.channels() {
            if let Some(seen) = event.last_seen.get(&channel) {
                self.tracker.merge(channel, *seen);
            }
        }
        self.tracker.merge(self.config.registry.server, event.id.sequence);

        info!(
            id = ?event.id,
            timestamp = event.timestamp,
            acknowledged = ?acknowledged,
            replayed,
            "applied server sync"
        );
        Ok(SyncOutcome::Rebased { replayed })
    }

    /// Predicted state at `timestamp`; must not precede the last sync.
    pub fn get_state_at(&self, timestamp: f32) -> Result<T> {
        self.chain.current_state_at(timestamp)
    }
}

impl<T, I> ReconciliationService<T, I> {
    pub fn chain(&self) -> &StateChain<T, I> {
        &self.chain
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn owner(&self) -> ChannelId {
        self.config.owner
    }

    pub fn last_accepted(&self, channel: ChannelId) -> Option<Sequence> {
        self.tracker.last_accepted(channel)
    }

    /// `None` until the owner's channel has an accepted update.
    pub fn last_owned_sequence(&self) -> Option<Sequence> {
        self.last_owned
    }

    /// Sequences recorded as missing on a channel. Always empty under
    /// [`LivenessPolicy::DropStale`](crate::LivenessPolicy::DropStale).
    pub fn missing(&self, channel: ChannelId) -> Vec<Sequence> {
        self.tracker.missing(channel)
    }
}
