//! Bulk TSV ingestion into the SQLite store.
//!
//! Node files carry `node_id <TAB> script_type`; edge files carry
//! `source <TAB> target <TAB> value <TAB> edge_type <TAB> time_offset
//! <TAB> block_height`, both with a header row. Malformed rows are logged
//! and skipped so one bad export line never aborts a multi-hour import.

use std::path::Path;

use csv::ReaderBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::EDGE_FEATURE_WIDTH;
use crate::store::{EdgeRow, NodeRow, SqliteStore};

const NODE_BATCH_SIZE: usize = 256;
const EDGE_BATCH_SIZE: usize = 512;

/// Counters from one import run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSummary {
    /// Node rows inserted.
    pub nodes_imported: u64,
    /// Edge rows inserted.
    pub edges_imported: u64,
    /// Rows skipped as malformed.
    pub rows_skipped: u64,
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}: {pos} rows")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar
}

/// Imports a node TSV file, ignoring ids already present.
pub fn import_nodes(store: &mut SqliteStore, path: impl AsRef<Path>) -> Result<ImportSummary> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path.as_ref())?;

    let bar = spinner("importing nodes");
    let mut summary = ImportSummary::default();
    let mut batch: Vec<NodeRow> = Vec::with_capacity(NODE_BATCH_SIZE);

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let parsed = record
            .get(0)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .zip(record.get(1).and_then(|s| s.trim().parse::<f64>().ok()));
        match parsed {
            Some((id, script_type)) => batch.push(NodeRow { id, script_type }),
            None => {
                warn!(line = line + 2, "skipping malformed node row");
                summary.rows_skipped += 1;
                continue;
            }
        }
        if batch.len() >= NODE_BATCH_SIZE {
            summary.nodes_imported += store.bulk_insert_nodes(&batch)?;
            bar.inc(batch.len() as u64);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        summary.nodes_imported += store.bulk_insert_nodes(&batch)?;
        bar.inc(batch.len() as u64);
    }

    bar.finish_and_clear();
    info!(
        imported = summary.nodes_imported,
        skipped = summary.rows_skipped,
        "node import finished"
    );
    Ok(summary)
}

/// Imports an edge TSV file.
pub fn import_edges(store: &mut SqliteStore, path: impl AsRef<Path>) -> Result<ImportSummary> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path.as_ref())?;

    let bar = spinner("importing edges");
    let mut summary = ImportSummary::default();
    let mut batch: Vec<EdgeRow> = Vec::with_capacity(EDGE_BATCH_SIZE);

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match parse_edge_row(&record) {
            Some(row) => batch.push(row),
            None => {
                warn!(line = line + 2, "skipping malformed edge row");
                summary.rows_skipped += 1;
                continue;
            }
        }
        if batch.len() >= EDGE_BATCH_SIZE {
            summary.edges_imported += store.bulk_insert_edges(&batch)?;
            bar.inc(batch.len() as u64);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        summary.edges_imported += store.bulk_insert_edges(&batch)?;
        bar.inc(batch.len() as u64);
    }

    bar.finish_and_clear();
    info!(
        imported = summary.edges_imported,
        skipped = summary.rows_skipped,
        "edge import finished"
    );
    Ok(summary)
}

fn parse_edge_row(record: &csv::StringRecord) -> Option<EdgeRow> {
    let source = record.get(0)?.trim().parse::<i64>().ok()?;
    let target = record.get(1)?.trim().parse::<i64>().ok()?;
    let mut features = [0.0; EDGE_FEATURE_WIDTH];
    for (slot, index) in features.iter_mut().zip(2..2 + EDGE_FEATURE_WIDTH) {
        *slot = record.get(index)?.trim().parse::<f64>().ok()?;
    }
    Some(EdgeRow {
        source,
        target,
        features,
    })
}
