//! Error types for the state chain.

use crate::types::ChannelId;
use thiserror::Error;

/// Main error type for chain and reconciliation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("State chain capacity exhausted ({capacity} links); a resync is required")]
    CapacityExceeded { capacity: usize },

    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelId),

    #[error("Update event claims the server channel")]
    InvalidServerOrigin,

    #[error("Sync event from non-server channel: {0}")]
    UnexpectedSyncOrigin(ChannelId),

    #[error("Sequence on channel {0} is at its maximum")]
    SequenceOverflow(ChannelId),

    #[error("Timestamp is not finite: {0}")]
    InvalidTimestamp(f32),

    #[error("Cannot query state at {requested} before baseline at {baseline}")]
    PastQuery { requested: f32, baseline: f32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
