//! Sampling orchestration: retries, deduplication, pair assembly.
//!
//! One session owns the dedup hash set and the batch loop. Each attempt
//! owns its subgraph exclusively; the only state shared across attempts is
//! the set of already-emitted content hashes and the sampler's memoized
//! edge count. Everything here is single-threaded and blocking.

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::components::{componentize, GraphComponents};
use crate::error::{Result, SampleError};
use crate::explore::{ExploreConfig, NeighborExplorer};
use crate::graph::Subgraph;
use crate::model::NodeId;
use crate::random::RandomSampler;
use crate::store::GraphStore;

/// Group name for the explored (positive) subgraph.
pub const GRAPH_GROUP: &str = "graph";
/// Group name for the randomly sampled contrastive subgraph.
pub const RANDOM_EDGES_GROUP: &str = "random_edges";

/// What each emitted sample pairs the explored subgraph with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Pair with a random contrastive subgraph; labels are class tags
    /// (0 for the explored graph, 1 for the random one).
    Contrast,
    /// Withhold one edge from the explored subgraph as the supervised
    /// label; no contrastive pair.
    EdgePrediction,
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Pairing mode for emitted samples.
    pub mode: SampleMode,
    /// Base seed in the open interval (0, 1); node/edge draws and branch
    /// pruning derive independent generators from it.
    pub seed: f64,
    /// Hop budget for contrast-mode exploration.
    pub hops: u32,
    /// Edge budget for contrast-mode exploration.
    pub max_edges: usize,
    /// Distinct-node target for edge-prediction exploration.
    pub nodes_per_graph: usize,
    /// Accepted `[min, max]` window on the explored subgraph's edge count;
    /// results outside it are retried.
    pub edge_window: (usize, usize),
    /// Attempts per sample request before reporting a miss.
    pub retries: u32,
    /// Relative tolerance on the contrastive subgraph's edge count versus
    /// the explored one. Policy knob, not a hard law.
    pub contrast_tolerance: f64,
    /// Exploration tunables (fetch limit, branch pruning, deadline).
    pub explore: ExploreConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: SampleMode::Contrast,
            seed: 0.5,
            hops: 2,
            max_edges: 64,
            nodes_per_graph: 3,
            edge_window: (1, 64),
            retries: 3,
            contrast_tolerance: 0.5,
            explore: ExploreConfig::default(),
        }
    }
}

/// One named group of an emitted sample.
#[derive(Debug, Clone)]
pub struct SampleGroup {
    /// Tensor components of the group's subgraph.
    pub components: GraphComponents,
    /// Class tag (single element) or withheld-edge feature vector.
    pub labels: Vec<f64>,
}

/// One emitted training example.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Named groups in emission order ("graph", then "random_edges" in
    /// contrast mode).
    pub groups: Vec<(String, SampleGroup)>,
}

/// Outcome accounting for a batch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Samples asked for.
    pub requested: usize,
    /// Samples emitted.
    pub achieved: usize,
    /// Roots whose retry budget ran out.
    pub misses: usize,
}

/// Drives sampling attempts against one store.
pub struct SamplingSession<'a, S: GraphStore> {
    config: SamplerConfig,
    explorer: NeighborExplorer<'a, S>,
    sampler: RandomSampler<'a, S>,
    seen: FxHashSet<u64>,
}

impl<'a, S: GraphStore> SamplingSession<'a, S> {
    /// Creates a session, validating the configured seed.
    pub fn new(store: &'a S, config: SamplerConfig) -> Result<Self> {
        let sampler = RandomSampler::with_seed(store, config.seed)?;
        // Branch pruning gets its own generator so node/edge draws stay
        // reproducible no matter how far exploration advances it.
        let explore_seed = config.seed.to_bits() ^ 0x9e37_79b9_7f4a_7c15;
        let explorer = NeighborExplorer::new(store, explore_seed, config.explore.clone());
        Ok(Self {
            config,
            explorer,
            sampler,
            seen: FxHashSet::default(),
        })
    }

    /// Produces one sample, retrying recoverable misses up to the
    /// configured budget.
    ///
    /// With `pinned` set, every attempt starts from that root; otherwise
    /// each attempt draws a fresh random root. A duplicate subgraph
    /// consumes a retry like any other recoverable miss (the source
    /// history was inconsistent here; one policy, applied uniformly).
    pub fn sample_one(&mut self, pinned: Option<NodeId>) -> Result<Sample> {
        let mut attempts = self.config.retries;
        while attempts > 0 {
            attempts -= 1;
            match self.attempt(pinned) {
                Ok(sample) => return Ok(sample),
                Err(err) if err.is_recoverable() => {
                    debug!(%err, remaining = attempts, "sampling attempt missed");
                }
                Err(err) => return Err(err),
            }
        }
        Err(SampleError::SamplingExhausted { root: pinned })
    }

    /// Produces up to `count` samples, counting per-root misses instead of
    /// failing the batch. Store errors abort immediately.
    pub fn sample_batch(&mut self, count: usize) -> Result<(Vec<Sample>, BatchSummary)> {
        let mut samples = Vec::with_capacity(count);
        let mut misses = 0usize;

        for index in 0..count {
            match self.sample_one(None) {
                Ok(sample) => samples.push(sample),
                Err(SampleError::SamplingExhausted { root }) => {
                    warn!(index, ?root, "no valid neighborhood found, skipping");
                    misses += 1;
                }
                Err(err) => return Err(err),
            }
        }

        let summary = BatchSummary {
            requested: count,
            achieved: samples.len(),
            misses,
        };
        info!(
            requested = summary.requested,
            achieved = summary.achieved,
            misses = summary.misses,
            "sampling batch finished"
        );
        Ok((samples, summary))
    }

    /// Content hashes emitted so far this session.
    pub fn emitted_count(&self) -> usize {
        self.seen.len()
    }

    fn attempt(&mut self, pinned: Option<NodeId>) -> Result<Sample> {
        let root = match pinned {
            Some(id) => id,
            None => self
                .sampler
                .sample_nodes(1)?
                .pop()
                .ok_or(SampleError::EmptyNeighborhood)?
                .id,
        };

        let edges = match self.config.mode {
            SampleMode::EdgePrediction => self
                .explorer
                .get_neighbors_count(root, self.config.nodes_per_graph)?,
            SampleMode::Contrast => self.explorer.get_neighbors(
                root,
                self.config.hops,
                self.config.max_edges,
                None,
            )?,
        };
        if edges.is_empty() {
            return Err(SampleError::EmptyNeighborhood);
        }

        let mut graph = Subgraph::from_edges(edges);
        let (min_edges, max_edges) = self.config.edge_window;
        if graph.edge_count() < min_edges || graph.edge_count() > max_edges {
            debug!(
                root,
                edges = graph.edge_count(),
                "explored subgraph outside accepted edge window"
            );
            return Err(SampleError::EmptyNeighborhood);
        }

        match self.config.mode {
            SampleMode::EdgePrediction => {
                let extracted = graph.pop_edge().ok_or(SampleError::NoExtractableEdge)?;
                if graph.is_empty() {
                    return Err(SampleError::NoExtractableEdge);
                }
                self.check_and_record(&graph)?;
                Ok(Sample {
                    groups: vec![(
                        GRAPH_GROUP.to_string(),
                        SampleGroup {
                            components: componentize(&graph),
                            labels: extracted.features.to_vec(),
                        },
                    )],
                })
            }
            SampleMode::Contrast => {
                let hash = self.check_seen(&graph)?;

                let random_edges = self.sampler.get_random_edges(graph.edge_count())?;
                let contrast = Subgraph::from_edges(random_edges);
                if contrast.is_empty() {
                    return Err(SampleError::EmptyNeighborhood);
                }
                let deviation = (contrast.edge_count() as f64 - graph.edge_count() as f64).abs()
                    / graph.edge_count() as f64;
                if deviation > self.config.contrast_tolerance {
                    debug!(
                        positive = graph.edge_count(),
                        contrast = contrast.edge_count(),
                        "contrastive subgraph outside tolerance band"
                    );
                    return Err(SampleError::EmptyNeighborhood);
                }

                self.seen.insert(hash);
                Ok(Sample {
                    groups: vec![
                        (
                            GRAPH_GROUP.to_string(),
                            SampleGroup {
                                components: componentize(&graph),
                                labels: vec![0.0],
                            },
                        ),
                        (
                            RANDOM_EDGES_GROUP.to_string(),
                            SampleGroup {
                                components: componentize(&contrast),
                                labels: vec![1.0],
                            },
                        ),
                    ],
                })
            }
        }
    }

    fn check_seen(&self, graph: &Subgraph) -> Result<u64> {
        let hash = graph.content_hash();
        if self.seen.contains(&hash) {
            return Err(SampleError::DuplicateGraph);
        }
        Ok(hash)
    }

    fn check_and_record(&mut self, graph: &Subgraph) -> Result<()> {
        let hash = self.check_seen(graph)?;
        self.seen.insert(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EdgeRow, NodeRow, SqliteStore};

    fn node_rows(count: i64) -> Vec<NodeRow> {
        (1..=count)
            .map(|id| NodeRow {
                id,
                script_type: id as f64,
            })
            .collect()
    }

    fn plain_edge(source: i64, target: i64) -> EdgeRow {
        EdgeRow {
            source,
            target,
            features: [source as f64, target as f64, 0.0, 0.0],
        }
    }

    /// A triangle 1-2-3 plus a dense cluster around node 4 so random roots
    /// land on something connected.
    fn connected_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        store.bulk_insert_nodes(&node_rows(8)).expect("nodes");
        store
            .bulk_insert_edges(&[
                plain_edge(1, 2),
                plain_edge(2, 3),
                plain_edge(1, 3),
                plain_edge(4, 5),
                plain_edge(5, 6),
                plain_edge(4, 6),
                plain_edge(6, 7),
                plain_edge(7, 8),
                plain_edge(8, 4),
            ])
            .expect("edges");
        store
    }

    fn deterministic_config(mode: SampleMode) -> SamplerConfig {
        SamplerConfig {
            mode,
            seed: 0.25,
            // Tiny fixture stores collect few distinct random edges, so
            // keep the band wide enough for a one-edge contrast graph.
            contrast_tolerance: 1.0,
            explore: ExploreConfig {
                branch_probability: 1.0,
                ..ExploreConfig::default()
            },
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn contrast_sample_pairs_graph_with_random_edges() {
        let store = connected_store();
        let mut session =
            SamplingSession::new(&store, deterministic_config(SampleMode::Contrast))
                .expect("session");
        let sample = session.sample_one(Some(1)).expect("sample");

        assert_eq!(sample.groups.len(), 2);
        assert_eq!(sample.groups[0].0, GRAPH_GROUP);
        assert_eq!(sample.groups[1].0, RANDOM_EDGES_GROUP);
        assert_eq!(sample.groups[0].1.labels, vec![0.0]);
        assert_eq!(sample.groups[1].1.labels, vec![1.0]);
        for (_, group) in &sample.groups {
            assert_eq!(
                group.components.edge_features.len(),
                group.components.pair_indices.len()
            );
            assert!(!group.components.node_features.is_empty());
        }
    }

    #[test]
    fn edge_prediction_sample_labels_with_extracted_features() {
        let store = connected_store();
        let mut session =
            SamplingSession::new(&store, deterministic_config(SampleMode::EdgePrediction))
                .expect("session");
        let sample = session.sample_one(Some(1)).expect("sample");

        assert_eq!(sample.groups.len(), 1);
        let (name, group) = &sample.groups[0];
        assert_eq!(name, GRAPH_GROUP);
        assert_eq!(group.labels.len(), 4, "labels carry edge features");
    }

    #[test]
    fn resampling_the_same_root_trips_the_dedup_check() {
        let store = connected_store();
        let mut session =
            SamplingSession::new(&store, deterministic_config(SampleMode::Contrast))
                .expect("session");

        session.sample_one(Some(1)).expect("first sample");
        let second = session.sample_one(Some(1));
        assert!(
            matches!(
                second,
                Err(SampleError::SamplingExhausted { root: Some(1) })
            ),
            "identical neighborhood must be rejected as a duplicate"
        );
    }

    #[test]
    fn exhausted_roots_become_batch_misses_not_errors() {
        // Store with nodes but no edges: every attempt finds an empty
        // neighborhood.
        let mut store = SqliteStore::open_in_memory().expect("open store");
        store.bulk_insert_nodes(&node_rows(4)).expect("nodes");

        let mut session =
            SamplingSession::new(&store, deterministic_config(SampleMode::Contrast))
                .expect("session");
        let (samples, summary) = session.sample_batch(3).expect("batch");
        assert!(samples.is_empty());
        assert_eq!(
            summary,
            BatchSummary {
                requested: 3,
                achieved: 0,
                misses: 3
            }
        );
    }

    #[test]
    fn batch_on_connected_store_emits_samples() {
        let store = connected_store();
        let mut session =
            SamplingSession::new(&store, deterministic_config(SampleMode::Contrast))
                .expect("session");
        let (samples, summary) = session.sample_batch(2).expect("batch");
        assert_eq!(summary.requested, 2);
        assert_eq!(samples.len() + summary.misses, 2);
    }

    #[test]
    fn invalid_seed_is_rejected_at_session_creation() {
        let store = connected_store();
        let config = SamplerConfig {
            seed: 1.5,
            ..SamplerConfig::default()
        };
        assert!(matches!(
            SamplingSession::new(&store, config),
            Err(SampleError::InvalidSeed(_))
        ));
    }
}
