//! Fixed-capacity state chain.

use super::link::{ChainLink, Links, States};
use crate::config::{check_capacity, DEFAULT_CAPACITY};
use crate::error::{ChainError, Result};
use crate::integrator::Integrator;
use crate::types::EventId;
use tracing::{debug, trace, warn};

/// Slot of the baseline link. Rebasing rewrites it in place.
const ROOT: usize = 0;

fn check_finite(timestamp: f32) -> Result<()> {
    if timestamp.is_finite() {
        Ok(())
    } else {
        Err(ChainError::InvalidTimestamp(timestamp))
    }
}

/// Statistics about the current chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainStats {
    /// Links reachable from the root, root included.
    pub links: usize,
    pub capacity: usize,
    pub root_timestamp: f32,
    /// Timestamp of the last link (the root's if no diffs are stored).
    pub tail_timestamp: f32,
}

/// A timeline of diffs anchored at an absolute baseline state.
///
/// The arena never reclaims single slots; only [`reset`](Self::reset)
/// rewinds it. Insertion and reconstruction do not allocate.
pub struct StateChain<T, I> {
    /// Arena of links; the root is slot 0. Spare capacity is never touched.
    slots: Vec<ChainLink<T>>,
    capacity: usize,
    integrator: I,
}

impl<T, I> StateChain<T, I>
where
    T: Clone + Default,
    I: Integrator<T>,
{
    /// Create a chain with [`DEFAULT_CAPACITY`] slots.
    pub fn new(initial_state: T, timestamp: f32, integrator: I) -> Result<Self> {
        Self::with_capacity(initial_state, timestamp, DEFAULT_CAPACITY, integrator)
    }

    /// Create a chain holding at most `capacity` links, root included.
    pub fn with_capacity(
        initial_state: T,
        timestamp: f32,
        capacity: usize,
        integrator: I,
    ) -> Result<Self> {
        check_capacity(capacity)?;
        check_finite(timestamp)?;

        let mut slots = Vec::with_capacity(capacity);
        slots.push(ChainLink::new(EventId::default(), timestamp, initial_state));
        Ok(Self {
            slots,
            capacity,
            integrator,
        })
    }

    /// Insert a diff in timestamp order.
    ///
    /// A diff older than the baseline cannot be placed before it, so it is
    /// folded straight into the root instead; this does not use a slot.
    pub fn add(&mut self, diff: T, timestamp: f32, id: EventId) -> Result<()> {
        check_finite(timestamp)?;
        let root_timestamp = self.slots[ROOT].timestamp;
        if timestamp < root_timestamp {
            let elapsed = root_timestamp - timestamp;
            debug!(?id, timestamp, elapsed, "folding late diff into baseline");
            self.integrator
                .fold(&mut self.slots[ROOT].item, &diff, elapsed);
            return Ok(());
        }

        if self.slots.len() >= self.capacity {
            warn!(capacity = self.capacity, ?id, "state chain capacity exhausted");
            return Err(ChainError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let (prev, next) = self.surrounding(timestamp);
        let slot = self.slots.len();
        let mut link = ChainLink::new(id, timestamp, diff);
        link.next = next;
        self.slots.push(link);
        self.slots[prev].next = Some(slot);

        trace!(?id, timestamp, slot, after = prev, "linked diff");
        Ok(())
    }

    /// Reconstruct the state at `timestamp`.
    ///
    /// Diffs up to and including `timestamp` are integrated in order, then
    /// the result is extrapolated to the exact instant with a neutral diff.
    pub fn current_state_at(&self, timestamp: f32) -> Result<T> {
        check_finite(timestamp)?;
        let root = &self.slots[ROOT];
        if timestamp < root.timestamp {
            return Err(ChainError::PastQuery {
                requested: timestamp,
                baseline: root.timestamp,
            });
        }

        let mut state = root.item.clone();
        let mut last = root.timestamp;
        for link in self.links().skip(1).take_while(|l| l.timestamp <= timestamp) {
            self.integrator
                .integrate(&mut state, &link.item, link.timestamp - last);
            last = link.timestamp;
        }
        self.integrator
            .integrate(&mut state, &T::default(), timestamp - last);

        Ok(state)
    }

    /// Rebase onto an authoritative snapshot.
    ///
    /// Stored diffs from `include_from`'s channel with a sequence at or past
    /// `include_from` were not part of the snapshot; they are folded into
    /// `new_root` before the chain is cut back to a single link.
    /// Returns the number of diffs folded.
    pub fn reset(
        &mut self,
        new_root: T,
        timestamp: f32,
        new_id: EventId,
        include_from: EventId,
    ) -> Result<usize> {
        check_finite(timestamp)?;
        let mut root = new_root;
        let mut replayed = 0;
        for link in Links::new(&self.slots, ROOT).skip(1) {
            if link.id.channel == include_from.channel
                && link.id.sequence >= include_from.sequence
            {
                self.integrator
                    .fold(&mut root, &link.item, timestamp - link.timestamp);
                replayed += 1;
            }
        }

        let dropped = self.slots.len() - 1;
        self.slots.truncate(1);
        self.slots[ROOT] = ChainLink::new(new_id, timestamp, root);

        debug!(?new_id, timestamp, dropped, replayed, "rebased state chain");
        Ok(replayed)
    }
}

impl<T, I> StateChain<T, I> {
    /// Links from root to tail.
    pub fn links(&self) -> Links<'_, T> {
        Links::new(&self.slots, ROOT)
    }

    /// Stored items from root to tail: the baseline first, then diffs.
    pub fn states(&self) -> States<'_, T> {
        States::new(self.links())
    }

    /// Number of stored links, root included. Never zero.
    pub fn link_count(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn root_timestamp(&self) -> f32 {
        self.slots[ROOT].timestamp
    }

    pub fn root_id(&self) -> EventId {
        self.slots[ROOT].id
    }

    /// The baseline's absolute state.
    pub fn root_state(&self) -> &T {
        &self.slots[ROOT].item
    }

    pub fn stats(&self) -> ChainStats {
        let root_timestamp = self.root_timestamp();
        ChainStats {
            links: self.slots.len(),
            capacity: self.capacity,
            root_timestamp,
            tail_timestamp: self.links().last().map_or(root_timestamp, |l| l.timestamp),
        }
    }

    /// Find the link to insert after and the link that will follow.
    fn surrounding(&self, timestamp: f32) -> (usize, Option<usize>) {
        let mut prev = ROOT;
        let mut cursor = self.slots[ROOT].next;
        while let Some(slot) = cursor {
            let link = &self.slots[slot];
            if link.timestamp > timestamp {
                return (prev, Some(slot));
            }
            prev = slot;
            cursor = link.next;
        }
        (prev, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelId;

    type Axis = (f32, f32);

    /// (position, velocity) on a single axis.
    fn axis(state: &mut Axis, diff: &Axis, elapsed: f32) {
        state.0 += diff.0 + state.1 * elapsed;
        state.1 += diff.1;
    }

    fn id(channel: u8, sequence: u64) -> EventId {
        EventId::new(ChannelId(channel), sequence)
    }

    fn timestamps<T, I>(chain: &StateChain<T, I>) -> Vec<f32> {
        chain.links().map(|l| l.timestamp).collect()
    }

    fn assert_close(expected: f32, actual: f32) {
        assert!(
            (expected - actual).abs() < 1e-4,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_later_event_at_end_of_chain() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        chain.add((0.0, 0.0), 2.0, id(1, 1)).unwrap();

        assert_eq!(chain.states().count(), 2);
        assert_eq!(timestamps(&chain), vec![1.0, 2.0]);
    }

    #[test]
    fn test_earlier_event_inserted_within_chain() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        for (i, ts) in [3.0, 4.0, 2.0].into_iter().enumerate() {
            chain.add((0.0, 0.0), ts, id(1, i as u64 + 1)).unwrap();
        }

        assert_eq!(chain.states().count(), 4);
        assert_eq!(timestamps(&chain), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        chain.add((0.0, 0.0), 2.0, id(1, 1)).unwrap();
        chain.add((0.0, 0.0), 2.0, id(2, 1)).unwrap();
        chain.add((0.0, 0.0), 1.0, id(1, 2)).unwrap();

        let ids: Vec<EventId> = chain.links().skip(1).map(|l| l.id).collect();
        assert_eq!(ids, vec![id(1, 2), id(1, 1), id(2, 1)]);
    }

    #[test]
    fn test_add_many_scrambled_events() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        let mut seed: u64 = 0x2545_f491;
        for i in 0..999u64 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let ts = 2.0 + (seed >> 40) as f32;
            chain.add((0.0, 0.0), ts, id(1, i + 1)).unwrap();
        }

        assert_eq!(chain.states().count(), 1000);
        let ts = timestamps(&chain);
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_root_only_extrapolates() {
        let chain = StateChain::new((0.0, 1.0), 1.0, axis).unwrap();
        let state = chain.current_state_at(3.0).unwrap();
        assert_close(2.0, state.0);
        assert_close(1.0, state.1);
    }

    #[test]
    fn test_state_with_diffs() {
        let mut chain = StateChain::new((0.0, 1.0), 1.0, axis).unwrap();
        chain.add((0.0, 2.0), 3.0, id(1, 1)).unwrap();
        chain.add((0.0, -3.0), 4.0, id(1, 2)).unwrap();
        chain.add((0.0, 0.5), 2.0, id(1, 3)).unwrap();

        // 1..2 at v=1, 2..3 at v=1.5, 3..4 at v=3.5, 4..5 at v=0.5.
        let state = chain.current_state_at(5.0).unwrap();
        assert_close(6.5, state.0);
        assert_close(0.5, state.1);
    }

    #[test]
    fn test_query_between_links_ignores_later_diffs() {
        let mut chain = StateChain::new((0.0, 1.0), 0.0, axis).unwrap();
        chain.add((0.0, 10.0), 4.0, id(1, 1)).unwrap();

        let state = chain.current_state_at(2.5).unwrap();
        assert_close(2.5, state.0);
        assert_close(1.0, state.1);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let mut chain = StateChain::new((0.0, 1.0), 0.0, axis).unwrap();
        chain.add((0.0, 1.0), 1.0, id(1, 1)).unwrap();

        let first = chain.current_state_at(3.0).unwrap();
        let second = chain.current_state_at(3.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.link_count(), 2);
    }

    #[test]
    fn test_past_query_rejected() {
        let chain = StateChain::new((0.0, 0.0), 5.0, axis).unwrap();
        let result = chain.current_state_at(4.0);
        assert!(matches!(result, Err(ChainError::PastQuery { .. })));
    }

    #[test]
    fn test_late_diff_folds_into_root() {
        let mut chain = StateChain::new((2.0, 1.0), 5.0, axis).unwrap();
        chain.add((0.0, 2.0), 4.0, id(2, 2)).unwrap();

        assert_eq!(chain.link_count(), 1);
        assert_eq!(chain.root_timestamp(), 5.0);
        assert_close(4.0, chain.root_state().0);
        assert_close(3.0, chain.root_state().1);
    }

    #[test]
    fn test_reset_leaves_one_link() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        for (i, ts) in [3.0, 4.0, 2.0].into_iter().enumerate() {
            chain.add((0.0, 0.0), ts, id(1, i as u64 + 1)).unwrap();
        }
        let state = chain.current_state_at(5.0).unwrap();
        chain.reset(state, 5.0, id(0, 1), id(1, 5)).unwrap();

        assert_eq!(chain.states().count(), 1);
        assert_eq!(chain.root_id(), id(0, 1));
        assert_eq!(chain.root_timestamp(), 5.0);
    }

    #[test]
    fn test_reset_replays_only_unacknowledged_owner_diffs() {
        let mut chain = StateChain::new((0.0, 0.0), 0.0, axis).unwrap();
        chain.add((0.0, 1.0), 1.0, id(1, 1)).unwrap();
        chain.add((0.0, 1.0), 2.0, id(2, 1)).unwrap();
        chain.add((0.0, 1.0), 3.0, id(1, 2)).unwrap();

        let replayed = chain.reset((4.0, 1.0), 5.0, id(0, 1), id(1, 2)).unwrap();

        assert_eq!(replayed, 1);
        assert_close(6.0, chain.root_state().0);
        assert_close(2.0, chain.root_state().1);
    }

    #[test]
    fn test_reset_rewinds_arena() {
        let mut chain = StateChain::with_capacity((0.0, 0.0), 0.0, 3, axis).unwrap();
        chain.add((0.0, 0.0), 1.0, id(1, 1)).unwrap();
        chain.add((0.0, 0.0), 2.0, id(1, 2)).unwrap();
        chain.reset((0.0, 0.0), 3.0, id(0, 1), id(1, 3)).unwrap();

        chain.add((0.0, 0.0), 4.0, id(1, 3)).unwrap();
        chain.add((0.0, 0.0), 5.0, id(1, 4)).unwrap();
        assert_eq!(timestamps(&chain), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_capacity_exceeded_on_extra_link() {
        let mut chain = StateChain::with_capacity((0.0, 0.0), 0.0, 4, axis).unwrap();
        for i in 1..=3u64 {
            chain.add((0.0, 0.0), i as f32, id(1, i)).unwrap();
        }

        let result = chain.add((0.0, 0.0), 10.0, id(1, 4));
        assert_eq!(result, Err(ChainError::CapacityExceeded { capacity: 4 }));
        assert_eq!(chain.link_count(), 4);

        // Late diffs never need a slot.
        chain.add((0.0, 1.0), -1.0, id(2, 1)).unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = StateChain::with_capacity((0.0, 0.0), 0.0, 0, axis);
        assert!(matches!(result, Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let result = StateChain::with_capacity((0.0, 0.0), 0.0, usize::MAX / 2, axis);
        assert!(matches!(result, Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_finite_timestamps_rejected() {
        assert!(matches!(
            StateChain::new((0.0, 0.0), f32::NAN, axis),
            Err(ChainError::InvalidTimestamp(_))
        ));

        let mut chain = StateChain::new((0.0, 0.0), 0.0, axis).unwrap();
        chain.add((0.0, 1.0), 2.0, id(1, 1)).unwrap();

        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let added = chain.add((0.0, 1.0), bad, id(1, 2));
            assert!(matches!(added, Err(ChainError::InvalidTimestamp(_))));
            let queried = chain.current_state_at(bad);
            assert!(matches!(queried, Err(ChainError::InvalidTimestamp(_))));
            let rebased = chain.reset((9.0, 9.0), bad, id(0, 1), id(1, 1));
            assert!(matches!(rebased, Err(ChainError::InvalidTimestamp(_))));
        }

        assert_eq!(timestamps(&chain), vec![0.0, 2.0]);
        assert_eq!(chain.root_state(), &(0.0, 0.0));
        assert_close(1.0, chain.current_state_at(3.0).unwrap().0);
    }

    #[test]
    fn test_reset_carries_diff_motion_not_snapshot_motion() {
        let mut chain = StateChain::new((0.0, 0.0), 0.0, axis).unwrap();
        chain.add((0.0, 2.0), 3.0, id(1, 1)).unwrap();

        // Snapshot moves at 1; the diff adds 2 and has been in effect for 2.
        chain.reset((4.0, 1.0), 5.0, id(0, 1), id(1, 1)).unwrap();

        assert_close(8.0, chain.root_state().0);
        assert_close(3.0, chain.root_state().1);
        assert_close(14.0, chain.current_state_at(7.0).unwrap().0);
    }

    #[test]
    fn test_reset_folds_diff_stamped_after_snapshot() {
        let mut chain = StateChain::new((0.0, 0.0), 0.0, axis).unwrap();
        chain.add((0.0, 1.0), 6.0, id(1, 1)).unwrap();

        let replayed = chain.reset((0.0, 0.0), 5.0, id(0, 1), id(1, 1)).unwrap();

        assert_eq!(replayed, 1);
        assert_close(-1.0, chain.root_state().0);
        assert_close(1.0, chain.root_state().1);
        assert_close(0.0, chain.current_state_at(6.0).unwrap().0);
        assert_close(1.0, chain.current_state_at(7.0).unwrap().0);
    }

    #[test]
    fn test_reset_discards_other_channels() {
        let mut chain = StateChain::new((0.0, 0.0), 0.0, axis).unwrap();
        chain.add((0.0, 5.0), 3.0, id(2, 1)).unwrap();
        chain.add((0.0, 5.0), 6.0, id(2, 2)).unwrap();

        let replayed = chain.reset((4.0, 1.0), 5.0, id(0, 1), id(1, 1)).unwrap();

        assert_eq!(replayed, 0);
        assert_eq!(chain.root_state(), &(4.0, 1.0));
        assert_close(6.0, chain.current_state_at(7.0).unwrap().0);
    }

    #[test]
    fn test_stats() {
        let mut chain = StateChain::new((0.0, 0.0), 1.0, axis).unwrap();
        assert_eq!(chain.stats().tail_timestamp, 1.0);

        chain.add((0.0, 0.0), 7.0, id(1, 1)).unwrap();
        chain.add((0.0, 0.0), 3.0, id(1, 2)).unwrap();

        let stats = chain.stats();
        assert_eq!(stats.links, 3);
        assert_eq!(stats.capacity, DEFAULT_CAPACITY);
        assert_eq!(stats.root_timestamp, 1.0);
        assert_eq!(stats.tail_timestamp, 7.0);
    }
}
