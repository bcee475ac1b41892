//! The merge contract between a state and a diff.
//!
//! The chain never inspects its payload. It only asks an [`Integrator`] to
//! advance a state by a diff over an elapsed interval, and uses
//! `T::default()` as the neutral diff.

/// Combines a diff into a state over an elapsed interval.
///
/// Applying diffs in timestamp order, each with the time elapsed since the
/// previous one, must reproduce the integrated state.
pub trait Integrator<T> {
    fn integrate(&self, state: &mut T, diff: &T, elapsed: f32);

    /// Merge a diff that took effect `elapsed` before `state`'s instant.
    ///
    /// `state` already contains its own motion over that interval, so only
    /// the diff is advanced (against a neutral diff) before being merged
    /// with zero elapsed time.
    fn fold(&self, state: &mut T, diff: &T, elapsed: f32)
    where
        T: Clone + Default,
    {
        let mut carried = diff.clone();
        self.integrate(&mut carried, &T::default(), elapsed);
        self.integrate(state, &carried, 0.0);
    }
}

impl<T, F> Integrator<T> for F
where
    F: Fn(&mut T, &T, f32),
{
    fn integrate(&self, state: &mut T, diff: &T, elapsed: f32) {
        self(state, diff, elapsed)
    }
}

/// Payloads that can express a per-entity diff from an update event.
///
/// `entity` is the slot the channel registry assigns to the originating
/// participant.
pub trait EntityDiff: Sized {
    fn entity_diff(entity: usize, diff_x: f32, diff_y: f32) -> Self;
}
