//! # State Chain
//!
//! A speculative state timeline that keeps a locally predicted simulation
//! consistent with periodic authoritative snapshots arriving out of order.
//!
//! ## Core Concepts
//!
//! - **Chain**: a fixed-capacity, timestamp-ordered list of diffs anchored at
//!   an absolute baseline
//! - **Integrator**: caller-supplied merge of a diff into a state over time
//! - **Rebase**: replacing the baseline with a server snapshot while
//!   carrying over local diffs the server had not seen
//! - **Liveness**: per-channel sequence tracking that drops stale events
//!
//! ## Example
//!
//! ```
//! use statechain::kinematics::{KinematicIntegrator, WorldState};
//! use statechain::{ChannelId, EventId, ReconcilerConfig, ReconciliationService, UpdateEvent};
//!
//! let mut service = ReconciliationService::new(
//!     ReconcilerConfig::for_owner(ChannelId(1)),
//!     WorldState::default(),
//!     0.0,
//!     KinematicIntegrator,
//! )?;
//!
//! service.handle_update_event(&UpdateEvent {
//!     timestamp: 1.0,
//!     id: EventId::new(ChannelId(1), 1),
//!     diff_x: 1.0,
//!     diff_y: 0.0,
//! })?;
//!
//! let state = service.get_state_at(3.0)?;
//! assert_eq!(state.body(0).x_pos, 2.0);
//! # Ok::<(), statechain::ChainError>(())
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod integrator;
pub mod kinematics;
pub mod reconcile;
pub mod types;

// Re-exports
pub use chain::{ChainLink, ChainStats, Links, StateChain, States};
pub use config::{
    ChannelRegistry, LivenessPolicy, ReconcilerConfig, DEFAULT_CAPACITY, MAX_CAPACITY,
};
pub use error::{ChainError, Result};
pub use integrator::{EntityDiff, Integrator};
pub use reconcile::{Admission, ReconciliationService, SequenceTracker, SyncOutcome};
pub use types::*;
