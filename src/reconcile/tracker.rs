//! Per-channel sequence liveness.

use crate::config::LivenessPolicy;
use crate::error::{ChainError, Result};
use crate::types::{ChannelId, EventId, Sequence};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Upper bound on remembered gaps per channel; the oldest are forgotten first.
const MAX_MISSING_PER_CHANNEL: usize = 1024;

/// What to do with an incoming event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Newer than anything accepted on its channel.
    Accepted,
    /// A sequence previously recorded as missing.
    Filled,
    /// Duplicate or superseded; drop it.
    Stale,
}

#[derive(Debug, Default)]
struct ChannelProgress {
    /// `None` until something is accepted or merged.
    last_accepted: Option<Sequence>,
    missing: BTreeSet<Sequence>,
}

/// Tracks the highest accepted sequence on each registered channel.
///
/// The last accepted sequence only ever grows, through
/// [`record`](Self::record) or [`merge`](Self::merge).
#[derive(Debug)]
pub struct SequenceTracker {
    policy: LivenessPolicy,
    channels: HashMap<ChannelId, ChannelProgress>,
}

impl SequenceTracker {
    pub fn new(channels: impl IntoIterator<Item = ChannelId>, policy: LivenessPolicy) -> Self {
        Self {
            policy,
            channels: channels
                .into_iter()
                .map(|c| (c, ChannelProgress::default()))
                .collect(),
        }
    }

    /// Classify an event without changing any state.
    pub fn admit(&self, id: EventId) -> Result<Admission> {
        let progress = self
            .channels
            .get(&id.channel)
            .ok_or(ChainError::UnknownChannel(id.channel))?;

        if progress.last_accepted.map_or(true, |last| id.sequence > last) {
            Ok(Admission::Accepted)
        } else if progress.missing.contains(&id.sequence) {
            Ok(Admission::Filled)
        } else {
            Ok(Admission::Stale)
        }
    }

    /// Commit an admission returned by [`admit`](Self::admit).
    pub fn record(&mut self, id: EventId, admission: Admission) {
        let policy = self.policy;
        let Some(progress) = self.channels.get_mut(&id.channel) else {
            return;
        };

        match admission {
            Admission::Accepted => {
                // Gaps are only known between two accepted sequences.
                if let (LivenessPolicy::TrackGaps, Some(last)) = (policy, progress.last_accepted) {
                    let window = id.sequence.0.saturating_sub(MAX_MISSING_PER_CHANNEL as u64);
                    let first = (last.0 + 1).max(window);
                    if first < id.sequence.0 {
                        warn!(
                            channel = %id.channel,
                            from = first,
                            to = id.sequence.0 - 1,
                            "sequence gap on channel"
                        );
                    }

                    for gap in first..id.sequence.0 {
                        progress.missing.insert(Sequence(gap));
                        if progress.missing.len() > MAX_MISSING_PER_CHANNEL {
                            progress.missing.pop_first();
                        }
                    }
                }
                progress.last_accepted = Some(id.sequence);
            }
            Admission::Filled => {
                progress.missing.remove(&id.sequence);
            }
            Admission::Stale => {}
        }
    }

    /// Raise a channel's progress to what the authority has seen.
    ///
    /// Never lowers it. Gaps at or below `seen` are forgotten since the
    /// authority already accounted for them.
    pub fn merge(&mut self, channel: ChannelId, seen: Sequence) {
        if let Some(progress) = self.channels.get_mut(&channel) {
            progress.last_accepted = progress.last_accepted.max(Some(seen));
            progress.missing = match seen.next() {
                Some(above) => progress.missing.split_off(&above),
                None => BTreeSet::new(),
            };
        }
    }

    /// `None` for unregistered channels and channels with nothing accepted.
    pub fn last_accepted(&self, channel: ChannelId) -> Option<Sequence> {
        self.channels.get(&channel).and_then(|p| p.last_accepted)
    }

    /// Sequences known to be missing on a channel, ascending.
    pub fn missing(&self, channel: ChannelId) -> Vec<Sequence> {
        self.channels
            .get(&channel)
            .map(|p| p.missing.iter().copied().collect())
            .unwrap_or_default()
    }
}
