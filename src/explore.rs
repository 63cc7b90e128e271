//! Breadth-limited neighborhood exploration.
//!
//! The explorer grows an edge set outward from a root node, one store
//! round trip per frontier node. Work is bounded by the edge budget (or the
//! node budget for the count-bounded variant), never by the size of the
//! backing store, and an optional deadline caps wall-clock cost in dense
//! neighborhoods. Traversal is an explicit worklist, so depth is limited by
//! the hop budget rather than the call stack.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::Result;
use crate::model::{Edge, NodeId};
use crate::store::GraphStore;

/// Tunables for neighborhood exploration.
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    /// Cap on incident edges fetched per store round trip; keeps a single
    /// hub node from dominating the edge budget.
    pub fetch_limit: usize,
    /// Probability of descending into a newly discovered neighbor.
    /// Bounds combinatorial growth in dense neighborhoods.
    pub branch_probability: f64,
    /// Wall-clock budget for one exploration call. Exceeding it returns
    /// whatever was collected so far.
    pub deadline: Option<Duration>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 128,
            branch_probability: 0.25,
            deadline: None,
        }
    }
}

/// Traverses the store outward from root nodes.
pub struct NeighborExplorer<'a, S: GraphStore> {
    store: &'a S,
    rng: ChaCha8Rng,
    config: ExploreConfig,
}

impl<'a, S: GraphStore> NeighborExplorer<'a, S> {
    /// Creates an explorer with its own branch-pruning generator, seeded
    /// independently of every other random concern.
    pub fn new(store: &'a S, seed: u64, config: ExploreConfig) -> Self {
        Self {
            store,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    /// Collects edges reachable from `root` within `hops` hops, capped at
    /// `max_edges` distinct edges.
    ///
    /// `ignore_pair` excludes edges pairing `root` with that counterpart;
    /// recursion levels set it to the node just departed so traversal never
    /// immediately re-crosses the arriving edge. Returns an empty list when
    /// the root has no incident edges — that signals "cannot grow from
    /// here", not an error.
    pub fn get_neighbors(
        &mut self,
        root: NodeId,
        hops: u32,
        max_edges: usize,
        ignore_pair: Option<NodeId>,
    ) -> Result<Vec<Edge>> {
        if hops == 0 || max_edges == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mut edges: FxHashSet<Edge> = FxHashSet::default();
        let mut queue: VecDeque<(NodeId, u32, Option<NodeId>)> = VecDeque::new();
        queue.push_back((root, hops, ignore_pair));

        while let Some((node, remaining, ignore)) = queue.pop_front() {
            if edges.len() >= max_edges || self.deadline_exceeded(started) {
                break;
            }
            let budget = max_edges - edges.len();
            let fetch = budget.min(self.config.fetch_limit);
            let incident = self.store.incident_edges(node, fetch, ignore)?;

            for edge in incident {
                if edges.len() >= max_edges {
                    break;
                }
                let next = edge.counterpart(node);
                if !edges.insert(edge) {
                    continue;
                }
                if remaining > 1 && next != node && self.admit_branch() {
                    queue.push_back((next, remaining - 1, Some(node)));
                }
            }
        }

        trace!(
            root,
            hops,
            collected = edges.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "neighborhood exploration finished"
        );
        Ok(edges.into_iter().collect())
    }

    /// Grows an edge set from `root` until the distinct-node count reaches
    /// `node_count`.
    ///
    /// Edges whose admission would push the node count past the budget are
    /// skipped rather than truncated, so parallel edges between nodes
    /// already inside the budget keep accumulating even once the budget is
    /// reached.
    pub fn get_neighbors_count(&mut self, root: NodeId, node_count: usize) -> Result<Vec<Edge>> {
        if node_count == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mut nodes: FxHashSet<NodeId> = FxHashSet::default();
        let mut edges: FxHashSet<Edge> = FxHashSet::default();
        let mut expanded: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            if self.deadline_exceeded(started) {
                break;
            }
            if !expanded.insert(node) {
                continue;
            }
            let incident = self
                .store
                .incident_edges(node, self.config.fetch_limit, None)?;

            for edge in incident {
                let src = edge.source.id;
                let dst = edge.target.id;
                let mut admits = 0;
                if !nodes.contains(&src) {
                    admits += 1;
                }
                if dst != src && !nodes.contains(&dst) {
                    admits += 1;
                }
                if nodes.len() + admits > node_count {
                    continue;
                }

                nodes.insert(src);
                nodes.insert(dst);
                edges.insert(edge);

                if nodes.len() < node_count {
                    for endpoint in [src, dst] {
                        if !expanded.contains(&endpoint) {
                            queue.push_back(endpoint);
                        }
                    }
                }
            }
        }

        trace!(
            root,
            node_count,
            nodes = nodes.len(),
            edges = edges.len(),
            "count-bounded exploration finished"
        );
        Ok(edges.into_iter().collect())
    }

    fn admit_branch(&mut self) -> bool {
        self.rng.gen::<f64>() < self.config.branch_probability
    }

    fn deadline_exceeded(&self, started: Instant) -> bool {
        self.config
            .deadline
            .is_some_and(|limit| started.elapsed() >= limit)
    }
}
