//! Graph value types shared across the pipeline.

use std::hash::{Hash, Hasher};

/// Store-assigned stable node identifier.
pub type NodeId = i64;

/// Store-assigned stable edge identifier.
pub type EdgeId = i64;

/// Width of the node feature vector (script-type category code).
pub const NODE_FEATURE_WIDTH: usize = 1;

/// Width of the edge feature vector: value, edge type, time offset,
/// block height.
pub const EDGE_FEATURE_WIDTH: usize = 4;

/// A node of the transaction graph.
///
/// Equality and hashing are defined over content (identifier plus feature
/// bits), never over object identity: two nodes fetched separately from the
/// store with the same generated id are the same node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Generated identifier assigned by the store.
    pub id: NodeId,
    /// Fixed-width feature vector.
    pub features: Vec<f64>,
}

impl Node {
    /// Creates a node from its store row.
    pub fn new(id: NodeId, features: Vec<f64>) -> Self {
        Self { id, features }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && feature_bits_eq(&self.features, &other.features)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        for f in &self.features {
            f.to_bits().hash(state);
        }
    }
}

/// A directed edge of the transaction graph.
///
/// Multi-edges between the same ordered pair are permitted and distinct as
/// long as any feature differs; the full content participates in equality
/// and hashing. Self-loops (source == target) are permitted.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Source endpoint.
    pub source: Node,
    /// Target endpoint.
    pub target: Node,
    /// Fixed-width feature vector.
    pub features: [f64; EDGE_FEATURE_WIDTH],
}

impl Edge {
    /// Creates an edge between two nodes.
    pub fn new(source: Node, target: Node, features: [f64; EDGE_FEATURE_WIDTH]) -> Self {
        Self {
            source,
            target,
            features,
        }
    }

    /// Whether both endpoints are the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source.id == self.target.id
    }

    /// Given one endpoint id, returns the other endpoint id.
    ///
    /// For self-loops both endpoints coincide, so the same id comes back.
    pub fn counterpart(&self, node: NodeId) -> NodeId {
        if self.source.id == node {
            self.target.id
        } else {
            self.source.id
        }
    }

    /// Whether this edge connects `a` and `b` in either direction.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source.id == a && self.target.id == b)
            || (self.source.id == b && self.target.id == a)
    }

    /// Total order key used wherever a deterministic edge ordering is
    /// needed (canonical hashing, componentization). Floats are compared by
    /// bit pattern, which is stable for the normalized feature values the
    /// store holds.
    pub fn canonical_key(&self) -> (NodeId, NodeId, [u64; EDGE_FEATURE_WIDTH]) {
        let mut bits = [0u64; EDGE_FEATURE_WIDTH];
        for (slot, f) in bits.iter_mut().zip(self.features.iter()) {
            *slot = f.to_bits();
        }
        (self.source.id, self.target.id, bits)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self
                .features
                .iter()
                .zip(other.features.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.target.hash(state);
        for f in &self.features {
            f.to_bits().hash(state);
        }
    }
}

fn feature_bits_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}
