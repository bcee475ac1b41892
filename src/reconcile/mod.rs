//! Reconciliation of predicted state with authoritative snapshots.
//!
//! Participant updates become diffs in the chain after a per-channel
//! liveness check. A server snapshot rebases the chain and replays the
//! owner's updates the server had not seen yet.

mod service;
mod tracker;

pub use service::{ReconciliationService, SyncOutcome};
pub use tracker::{Admission, SequenceTracker};
