//! End-to-end CLI runs against a scratch store.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;

fn write_fixture_tsvs(dir: &Path) -> (PathBuf, PathBuf) {
    let nodes = dir.join("nodes.tsv");
    let mut node_body = String::from("node\tscript_type\n");
    for id in 1..=8 {
        node_body.push_str(&format!("{id}\t{}\n", id % 3));
    }
    fs::write(&nodes, node_body).expect("write nodes");

    let edges = dir.join("edges.tsv");
    let mut edge_body =
        String::from("source\ttarget\tvalue\tedge_type\ttime_offset\tblock_height\n");
    for i in 1..=8i64 {
        for j in (i + 1)..=8 {
            edge_body.push_str(&format!(
                "{i}\t{j}\t{}\t0\t{i}\t{}\n",
                i * 10 + j,
                700_000 + i
            ));
        }
    }
    fs::write(&edges, edge_body).expect("write edges");
    (nodes, edges)
}

fn import_fixture(db: &Path, nodes: &Path, edges: &Path) -> String {
    let output = cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(db)
        .arg("import")
        .arg("--nodes")
        .arg(nodes)
        .arg("--edges")
        .arg(edges)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8_lossy(&output).into_owned()
}

#[test]
fn import_normalize_sample_stats_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("graph.db");
    let out = dir.path().join("samples.json");
    let (nodes, edges) = write_fixture_tsvs(dir.path());

    let import_out = import_fixture(&db, &nodes, &edges);
    assert!(import_out.contains("nodes: 8 imported"), "{import_out}");
    assert!(import_out.contains("edges: 28 imported"), "{import_out}");

    cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(&db)
        .arg("normalize")
        .assert()
        .success();

    let sample_out = cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(&db)
        .arg("sample")
        .arg("--out")
        .arg(&out)
        .args(["--count", "5", "--seed", "0.4", "--max-edges", "10"])
        .args(["--branch-probability", "1.0"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&sample_out).contains("samples written"));
    assert!(out.exists(), "sample run must write the archive");

    let stats_out = cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(&db)
        .arg("stats")
        .arg("--archive")
        .arg(&out)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stats_out = String::from_utf8_lossy(&stats_out);
    assert!(stats_out.contains("store: 8 nodes"), "{stats_out}");
    assert!(stats_out.contains("archive:"), "{stats_out}");
}

#[test]
fn sample_rejects_out_of_range_seeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("graph.db");
    let (nodes, edges) = write_fixture_tsvs(dir.path());
    import_fixture(&db, &nodes, &edges);

    let output = cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(&db)
        .arg("sample")
        .args(["--seed", "1.5"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("seed"));
}

#[test]
fn stats_on_a_fresh_store_reports_zero_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("empty.db");

    let output = cargo_bin_cmd!("graphsample")
        .arg("--db")
        .arg(&db)
        .arg("stats")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("store: 0 nodes, 0 edges"));
}
