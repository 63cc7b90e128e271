//! Error taxonomy and the crate-wide result alias.

use std::io;
use thiserror::Error;

use crate::model::NodeId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SampleError>;

/// Error taxonomy for the sampling pipeline.
///
/// The recoverable variants are consumed by the sampling session's retry
/// budget; only `SamplingExhausted` ever reaches the batch driver, which
/// counts the miss and moves on. Store failures are fatal and abort the
/// whole batch.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Seed outside the accepted open interval (0, 1).
    #[error("invalid seed {0}: must lie in the open interval (0, 1)")]
    InvalidSeed(f64),
    /// Exploration found no incident edges at the frontier.
    #[error("no incident edges found at the exploration frontier")]
    EmptyNeighborhood,
    /// Edge-prediction extraction found no eligible non-self-loop edge.
    #[error("no extractable non-self-loop edge in subgraph")]
    NoExtractableEdge,
    /// Freshly sampled subgraph hashes to one already emitted this session.
    #[error("sampled subgraph duplicates a previously emitted one")]
    DuplicateGraph,
    /// Retry budget spent without a successful emission for this root.
    #[error("sampling exhausted retries for root {root:?}")]
    SamplingExhausted {
        /// Root the attempts were pinned to, if any.
        root: Option<NodeId>,
    },
    /// Backing store failure; fatal for the current batch.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed TSV input.
    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),
    /// Archive (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Caller-supplied argument out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SampleError {
    /// Whether the session retry loop may absorb this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SampleError::EmptyNeighborhood
                | SampleError::NoExtractableEdge
                | SampleError::DuplicateGraph
        )
    }
}

impl From<serde_json::Error> for SampleError {
    fn from(err: serde_json::Error) -> Self {
        SampleError::Serialization(err.to_string())
    }
}
