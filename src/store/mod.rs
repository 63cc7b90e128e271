//! Queryable node/edge store the sampling pipeline draws from.

mod sqlite;

pub use sqlite::{EdgeRow, NodeRow, SqliteStore, StoreStats};

use rand::RngCore;

use crate::error::Result;
use crate::model::{Edge, EdgeId, Node, NodeId};

/// Collaborator interface of the sampling subsystem.
///
/// Every call is a blocking round trip to the backing store; callers own
/// any caching or memoization (the random sampler memoizes `edge_count`
/// per session).
pub trait GraphStore {
    /// Draws `count` nodes uniformly at random, resolving ids against the
    /// store and skipping gaps. Draws are independent; duplicates are
    /// possible. The caller supplies the randomness so that unrelated
    /// concerns never share a generator.
    fn sample_nodes(&self, count: usize, rng: &mut dyn RngCore) -> Result<Vec<Node>>;

    /// Edges where `node` is source or target, capped at `limit` rows.
    /// When `exclude_pair` is set, edges connecting `node` with that
    /// counterpart (in either direction) are left out; exploration uses
    /// this to avoid immediately re-crossing the edge it arrived on.
    fn incident_edges(
        &self,
        node: NodeId,
        limit: usize,
        exclude_pair: Option<NodeId>,
    ) -> Result<Vec<Edge>>;

    /// Total number of edges in the store.
    fn edge_count(&self) -> Result<u64>;

    /// Resolves an edge id; `None` for gaps left by skipped source rows.
    fn edge_by_id(&self, id: EdgeId) -> Result<Option<Edge>>;

    /// Resolves a node id; `None` for gaps.
    fn node_by_id(&self, id: NodeId) -> Result<Option<Node>>;
}
