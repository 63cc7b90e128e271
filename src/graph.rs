//! In-memory subgraph with degree bookkeeping.
//!
//! A [`Subgraph`] is created per sampling attempt from a freshly fetched
//! edge list, possibly mutated once by [`Subgraph::pop_edge`] in
//! edge-prediction mode, componentized, and discarded. It is never
//! persisted itself.
//!
//! Standing invariant: no node may exist in a subgraph with zero incident
//! edges. All mutating operations uphold it and check it in debug builds.

use rustc_hash::{FxHashMap, FxHashSet};
use xxhash_rust::xxh64::Xxh64;

use crate::model::{Edge, Node, NodeId};

/// Per-node degree counters within one subgraph.
///
/// Self-loops are tracked separately: `in_degree + out_degree` excludes
/// them, so degree-based decisions (such as edge removability) never count
/// a node's loop back to itself as connectivity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    /// Count of edges arriving at this node.
    pub in_degree: u32,
    /// Count of edges leaving this node.
    pub out_degree: u32,
    /// Count of self-loop edges on this node.
    pub self_loops: u32,
}

impl Degree {
    /// Total directed degree, excluding self-loops.
    pub fn degree(&self) -> u32 {
        self.in_degree + self.out_degree
    }
}

/// Degree counters for every node referenced by an edge set.
///
/// Pure bookkeeping; no operation is fallible and no referenced node is
/// ever absent from the ledger.
#[derive(Debug, Clone, Default)]
pub struct DegreeLedger {
    degrees: FxHashMap<Node, Degree>,
}

impl DegreeLedger {
    /// Increments the counters for both endpoints of `edge`.
    pub fn update(&mut self, edge: &Edge) {
        if edge.is_self_loop() {
            self.degrees.entry(edge.source.clone()).or_default().self_loops += 1;
            return;
        }
        self.degrees.entry(edge.source.clone()).or_default().out_degree += 1;
        self.degrees.entry(edge.target.clone()).or_default().in_degree += 1;
    }

    /// Clears the ledger and replays `update` for every edge.
    pub fn rebuild<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) {
        self.degrees.clear();
        for edge in edges {
            self.update(edge);
        }
    }

    /// Degree counters of `node`, if it is referenced by any edge.
    pub fn get(&self, node: &Node) -> Option<Degree> {
        self.degrees.get(node).copied()
    }

    /// Number of distinct nodes tracked.
    pub fn node_count(&self) -> usize {
        self.degrees.len()
    }

    /// Iterates over tracked nodes and their counters.
    pub fn iter(&self) -> impl Iterator<Item = (&Node, &Degree)> {
        self.degrees.iter()
    }
}

/// An edge set plus its exclusively owned degree ledger.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    edges: FxHashSet<Edge>,
    ledger: DegreeLedger,
}

impl Subgraph {
    /// Builds a subgraph from an edge list, deduplicating by content.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        let edges: FxHashSet<Edge> = edges.into_iter().collect();
        let mut ledger = DegreeLedger::default();
        ledger.rebuild(edges.iter());
        let graph = Self { edges, ledger };
        graph.debug_check_no_isolated_node();
        graph
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct nodes.
    pub fn node_count(&self) -> usize {
        self.ledger.node_count()
    }

    /// Whether the subgraph holds no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterates over the edge set. Iteration order is not specified.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// The degree ledger for this edge set.
    pub fn ledger(&self) -> &DegreeLedger {
        &self.ledger
    }

    /// Removes and returns one non-self-loop edge such that both endpoints
    /// keep degree >= 1 afterwards, i.e. an edge is removable only if each
    /// endpoint currently has degree > 1.
    ///
    /// Which eligible edge is chosen follows the set's iteration order and
    /// is therefore unspecified; the result is correct for any choice.
    /// Returns `None` and leaves the subgraph unchanged when no edge
    /// qualifies.
    pub fn pop_edge(&mut self) -> Option<Edge> {
        let candidate = self
            .edges
            .iter()
            .find(|edge| {
                if edge.is_self_loop() {
                    return false;
                }
                let source_ok = self
                    .ledger
                    .get(&edge.source)
                    .is_some_and(|d| d.degree() > 1);
                let target_ok = self
                    .ledger
                    .get(&edge.target)
                    .is_some_and(|d| d.degree() > 1);
                source_ok && target_ok
            })?
            .clone();

        self.edges.remove(&candidate);
        self.ledger.rebuild(self.edges.iter());
        self.debug_check_no_isolated_node();
        Some(candidate)
    }

    /// Canonical edge list, sorted by `(source id, target id, feature
    /// bits)`. Identical edge sets produce identical sequences regardless
    /// of set iteration order.
    pub fn canonical_edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().collect();
        edges.sort_by_key(|e| e.canonical_key());
        edges
    }

    /// Content hash over the canonical form of this subgraph, used for
    /// session-level deduplication.
    ///
    /// Store-assigned identifiers do not enter the hash: nodes are renamed
    /// to dense indices in canonical-order first encounter, so two
    /// subgraphs with the same shape and features collide even when drawn
    /// from different regions of the store.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        let mut node_index: FxHashMap<NodeId, u64> = FxHashMap::default();

        for edge in self.canonical_edges() {
            let next = node_index.len() as u64;
            let src = *node_index.entry(edge.source.id).or_insert(next);
            let next = node_index.len() as u64;
            let dst = *node_index.entry(edge.target.id).or_insert(next);

            hasher.update(&src.to_le_bytes());
            hasher.update(&dst.to_le_bytes());
            for f in &edge.source.features {
                hasher.update(&f.to_bits().to_le_bytes());
            }
            for f in &edge.target.features {
                hasher.update(&f.to_bits().to_le_bytes());
            }
            for f in &edge.features {
                hasher.update(&f.to_bits().to_le_bytes());
            }
        }
        hasher.digest()
    }

    fn debug_check_no_isolated_node(&self) {
        #[cfg(debug_assertions)]
        for (node, degree) in self.ledger.iter() {
            debug_assert!(
                degree.degree() + degree.self_loops > 0,
                "node {} has zero incident edges",
                node.id
            );
        }
    }
}
