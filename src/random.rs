//! Seeded random draws of nodes and edges from the store.
//!
//! Used to assemble the contrastive subgraph paired with each explored
//! neighborhood. True uniform `ORDER BY random()` sampling is prohibitive
//! at the store sizes this targets, so edges are drawn by id against a
//! memoized total count, tolerating gaps.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{Result, SampleError};
use crate::model::{Edge, Node};
use crate::store::GraphStore;

/// How many retry rounds `get_random_edges` makes before settling for a
/// short result.
const EDGE_COLLECTION_RETRIES: u32 = 3;

/// Draws nodes and edges approximately uniformly at random.
///
/// Owns its generator, independently seeded from every other random
/// concern, so node draws stay reproducible regardless of how much the
/// explorer's pruning generator advanced.
pub struct RandomSampler<'a, S: GraphStore> {
    store: &'a S,
    rng: ChaCha8Rng,
    cached_edge_count: Option<u64>,
}

impl<'a, S: GraphStore> RandomSampler<'a, S> {
    /// Creates a sampler from a seed in the open interval (0, 1).
    ///
    /// The range matches what the store engines this feeds accept for
    /// their own seeding primitives; anything else fails fast with
    /// [`SampleError::InvalidSeed`].
    pub fn with_seed(store: &'a S, seed: f64) -> Result<Self> {
        if !seed.is_finite() || seed <= 0.0 || seed >= 1.0 {
            return Err(SampleError::InvalidSeed(seed));
        }
        Ok(Self {
            store,
            rng: ChaCha8Rng::seed_from_u64(seed.to_bits()),
            cached_edge_count: None,
        })
    }

    /// Draws `count` nodes independently at random.
    pub fn sample_nodes(&mut self, count: usize) -> Result<Vec<Node>> {
        self.store.sample_nodes(count, &mut self.rng)
    }

    /// Draws up to `count` distinct edges approximately uniformly: random
    /// ids against the memoized total count, resolved individually,
    /// skipping ids the store no longer holds.
    pub fn sample_edges(&mut self, count: usize) -> Result<Vec<Edge>> {
        let total = self.edge_count()?;
        if total == 0 || count == 0 {
            return Ok(Vec::new());
        }

        let draw = count.min(total as usize);
        let mut chosen: FxHashSet<u64> = FxHashSet::default();
        while chosen.len() < draw {
            chosen.insert(self.rng.gen_range(0..total));
        }

        let mut edges = Vec::with_capacity(draw);
        for index in chosen {
            // Edge ids are assigned from 1 in insertion order; gaps are
            // tolerated, not fatal.
            if let Some(edge) = self.store.edge_by_id(index as i64 + 1)? {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Builds an edge set of roughly `target` edges by sampling nodes and
    /// taking one incident edge per node, retrying a bounded number of
    /// rounds. May return fewer edges than requested; never fails for
    /// falling short.
    pub fn get_random_edges(&mut self, target: usize) -> Result<Vec<Edge>> {
        let mut edges: Vec<Edge> = Vec::new();
        let mut retries = EDGE_COLLECTION_RETRIES;

        while edges.len() < target && retries > 0 {
            retries -= 1;
            let nodes = self.sample_nodes((target / 2).max(1))?;
            for node in nodes {
                let incident = self.store.incident_edges(node.id, 1, None)?;
                if let Some(edge) = incident.into_iter().next() {
                    edges.push(edge);
                }
                if edges.len() >= target {
                    break;
                }
            }
        }

        if edges.len() < target {
            debug!(
                collected = edges.len(),
                target, "random edge collection fell short of target"
            );
        }
        Ok(edges)
    }

    /// Total edge count, fetched once per sampler and memoized.
    pub fn edge_count(&mut self) -> Result<u64> {
        if let Some(count) = self.cached_edge_count {
            return Ok(count);
        }
        let count = self.store.edge_count()?;
        self.cached_edge_count = Some(count);
        Ok(count)
    }
}
