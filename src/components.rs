//! Canonical tensor-ready encoding of a subgraph.
//!
//! The downstream message-passing model aggregates edge-level values per
//! node with a segment reduction keyed by row index. A node that only ever
//! appears as an edge target would be missed by that reduction, so every
//! node gets a synthetic self-loop row with all-zero edge features the
//! moment its row is assigned. The final `(source_row, target_row)`
//! ascending sort is a hard contract of the consumer and must be identical
//! across runs for identical edge sets.

use crate::graph::Subgraph;
use crate::model::EDGE_FEATURE_WIDTH;

/// Row-aligned tensor components of one subgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphComponents {
    /// One feature row per distinct node, indexed by assigned row.
    pub node_features: Vec<Vec<f64>>,
    /// One feature row per edge row (synthetic self-loops included).
    pub edge_features: Vec<Vec<f64>>,
    /// `(source_row, target_row)` per edge row, aligned with
    /// `edge_features`.
    pub pair_indices: Vec<[i64; 2]>,
}

impl GraphComponents {
    /// Number of edge rows; `edge_features` and `pair_indices` always
    /// agree on it.
    pub fn edge_row_count(&self) -> usize {
        self.edge_features.len()
    }
}

/// Encodes `graph` into its canonical tensor components.
///
/// Node rows are assigned in first-encounter order over the canonical edge
/// ordering, so identical edge sets componentize identically no matter how
/// the underlying set happens to iterate.
pub fn componentize(graph: &Subgraph) -> GraphComponents {
    let mut node_features: Vec<Vec<f64>> = Vec::new();
    let mut rows: Vec<(usize, usize, Vec<f64>)> = Vec::new();
    let mut node_row: rustc_hash::FxHashMap<i64, usize> = rustc_hash::FxHashMap::default();

    let mut assign_row = |node: &crate::model::Node,
                          node_features: &mut Vec<Vec<f64>>,
                          rows: &mut Vec<(usize, usize, Vec<f64>)>| {
        *node_row.entry(node.id).or_insert_with(|| {
            let row = node_features.len();
            node_features.push(node.features.clone());
            rows.push((row, row, vec![0.0; EDGE_FEATURE_WIDTH]));
            row
        })
    };

    for edge in graph.canonical_edges() {
        let source_row = assign_row(&edge.source, &mut node_features, &mut rows);
        let target_row = assign_row(&edge.target, &mut node_features, &mut rows);
        rows.push((source_row, target_row, edge.features.to_vec()));
    }

    rows.sort_by_key(|(source, target, _)| (*source, *target));

    let mut edge_features = Vec::with_capacity(rows.len());
    let mut pair_indices = Vec::with_capacity(rows.len());
    for (source, target, features) in rows {
        edge_features.push(features);
        pair_indices.push([source as i64, target as i64]);
    }

    GraphComponents {
        node_features,
        edge_features,
        pair_indices,
    }
}
