//! Persisted artifact container for emitted samples.
//!
//! Samples are keyed by a zero-padded index; each sample holds named
//! groups ("graph", "random_edges"), and each group carries the four
//! row-aligned arrays the downstream training pipeline consumes. The
//! archive is serialized as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SampleError};
use crate::session::Sample;

/// Arrays of one named group within a sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupArrays {
    /// 2D node feature matrix, one row per node.
    pub node_features: Vec<Vec<f64>>,
    /// 2D edge feature matrix, one row per edge row.
    pub edge_features: Vec<Vec<f64>>,
    /// Two-column row index pairs, aligned with `edge_features`.
    pub pair_indices: Vec<[i64; 2]>,
    /// Scalar class tag or withheld-edge feature vector.
    pub labels: Vec<f64>,
}

/// Per-group aggregate counters for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// Number of graphs in this group across all samples.
    pub graphs: u64,
    /// Sum of node rows.
    pub total_nodes: u64,
    /// Sum of edge rows.
    pub total_edges: u64,
}

/// Collection of emitted samples, keyed by sample index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleArchive {
    samples: BTreeMap<String, BTreeMap<String, GroupArrays>>,
}

impl SampleArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the archive holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Appends a sample under the next index key.
    ///
    /// Rejects groups whose edge-feature and pair-index row counts
    /// disagree; that alignment is a hard contract of the consumer.
    pub fn push_sample(&mut self, sample: &Sample) -> Result<()> {
        let key = format!("{:06}", self.samples.len());
        let mut groups = BTreeMap::new();
        for (name, group) in &sample.groups {
            let arrays = GroupArrays {
                node_features: group.components.node_features.clone(),
                edge_features: group.components.edge_features.clone(),
                pair_indices: group.components.pair_indices.clone(),
                labels: group.labels.clone(),
            };
            if arrays.edge_features.len() != arrays.pair_indices.len() {
                return Err(SampleError::InvalidArgument(format!(
                    "group {name}: {} edge feature rows vs {} pair index rows",
                    arrays.edge_features.len(),
                    arrays.pair_indices.len()
                )));
            }
            groups.insert(name.clone(), arrays);
        }
        self.samples.insert(key, groups);
        Ok(())
    }

    /// The groups stored under `key`, if present.
    pub fn get(&self, key: &str) -> Option<&BTreeMap<String, GroupArrays>> {
        self.samples.get(key)
    }

    /// Iterates over `(key, groups)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, GroupArrays>)> {
        self.samples.iter()
    }

    /// Aggregate counters per group name.
    pub fn group_stats(&self) -> BTreeMap<String, GroupStats> {
        let mut stats: BTreeMap<String, GroupStats> = BTreeMap::new();
        for groups in self.samples.values() {
            for (name, arrays) in groups {
                let entry = stats.entry(name.clone()).or_default();
                entry.graphs += 1;
                entry.total_nodes += arrays.node_features.len() as u64;
                entry.total_edges += arrays.pair_indices.len() as u64;
            }
        }
        stats
    }

    /// Serializes the archive to `path` as JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads an archive previously written by [`Self::write_json`].
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
