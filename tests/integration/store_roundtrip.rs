//! Store-level round trips: ingestion, normalization, queries.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use graphsample::store::{EdgeRow, GraphStore, NodeRow, SqliteStore};

fn seeded_store(path: &std::path::Path) -> SqliteStore {
    let mut store = SqliteStore::open(path).expect("open store");
    let nodes: Vec<NodeRow> = (1..=10)
        .map(|id| NodeRow {
            id,
            script_type: (id % 3) as f64,
        })
        .collect();
    store.bulk_insert_nodes(&nodes).expect("insert nodes");

    let edges: Vec<EdgeRow> = (1..10)
        .map(|id| EdgeRow {
            source: id,
            target: id + 1,
            features: [id as f64 * 10.0, (id % 2) as f64, id as f64, 700_000.0 + id as f64],
        })
        .collect();
    store.bulk_insert_edges(&edges).expect("insert edges");
    store
}

#[test]
fn reopening_a_store_file_preserves_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.db");

    {
        let _store = seeded_store(&path);
    }

    let store = SqliteStore::open(&path).expect("reopen");
    let stats = store.stats().expect("stats");
    assert_eq!(stats.nodes, 10);
    assert_eq!(stats.edges, 9);
    assert_eq!(stats.self_loops, 0);
}

#[test]
fn incident_edges_carry_node_features_from_both_endpoints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(&dir.path().join("graph.db"));

    let incident = store.incident_edges(5, 16, None).expect("incident");
    assert_eq!(incident.len(), 2, "node 5 sits on a path");
    for edge in &incident {
        assert!(edge.source.id == 5 || edge.target.id == 5);
        assert_eq!(edge.source.features.len(), 1);
        assert_eq!(edge.target.features.len(), 1);
    }
}

#[test]
fn pair_exclusion_drops_the_departed_edge() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(&dir.path().join("graph.db"));

    let all = store.incident_edges(5, 16, None).expect("incident");
    let filtered = store.incident_edges(5, 16, Some(4)).expect("incident");
    assert_eq!(filtered.len(), all.len() - 1);
    assert!(filtered.iter().all(|e| !e.connects(5, 4)));
}

#[test]
fn normalization_rescales_features_into_the_unit_interval() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(&dir.path().join("graph.db"));

    store.normalize_nodes().expect("normalize nodes");
    store.normalize_edges().expect("normalize edges");

    let edge = store.edge_by_id(1).expect("query").expect("edge exists");
    for value in edge.features {
        assert!((0.0..=1.0).contains(&value), "feature {value} out of range");
    }
    let node = store.node_by_id(1).expect("query").expect("node exists");
    assert!((0.0..=1.0).contains(&node.features[0]));
}

#[test]
fn normalizing_an_empty_store_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(dir.path().join("empty.db")).expect("open");
    store.normalize_nodes().expect("normalize nodes");
    store.normalize_edges().expect("normalize edges");
}

#[test]
fn node_sampling_is_reproducible_under_one_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(&dir.path().join("graph.db"));

    let mut rng_a = ChaCha8Rng::seed_from_u64(7);
    let mut rng_b = ChaCha8Rng::seed_from_u64(7);
    let a: Vec<_> = store
        .sample_nodes(6, &mut rng_a)
        .expect("sample")
        .iter()
        .map(|n| n.id)
        .collect();
    let b: Vec<_> = store
        .sample_nodes(6, &mut rng_b)
        .expect("sample")
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(a, b);
    assert_eq!(a.len(), 6);
}
