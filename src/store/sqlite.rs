//! SQLite-backed graph store.
//!
//! Schema mirrors the relational layout the graphs are exported into:
//! a `nodes` table carrying the generated node id and its script-type
//! feature, and an `edges` table carrying the ordered endpoint pair plus
//! the four edge features, indexed on both endpoints.

use std::path::Path;

use rand::{Rng, RngCore};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{Edge, EdgeId, Node, NodeId, EDGE_FEATURE_WIDTH};
use crate::store::GraphStore;

/// One row of the `nodes` table.
#[derive(Debug, Clone, Copy)]
pub struct NodeRow {
    /// Generated node identifier.
    pub id: NodeId,
    /// Script-type category code (the node feature).
    pub script_type: f64,
}

/// One row of the `edges` table.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRow {
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// value, edge type, time offset, block height.
    pub features: [f64; EDGE_FEATURE_WIDTH],
}

/// Store-level counters for the `stats` report.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    /// Total nodes.
    pub nodes: u64,
    /// Total edges.
    pub edges: u64,
    /// Edges whose endpoints coincide.
    pub self_loops: u64,
}

/// Blocking SQLite store implementing [`GraphStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if missing) a store at `path` and ensures the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store; used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nodes (
                 id          INTEGER PRIMARY KEY,
                 script_type REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS edges (
                 id           INTEGER PRIMARY KEY,
                 source_id    INTEGER NOT NULL REFERENCES nodes (id),
                 target_id    INTEGER NOT NULL REFERENCES nodes (id),
                 value        REAL NOT NULL,
                 edge_type    REAL NOT NULL,
                 time_offset  REAL NOT NULL,
                 block_height REAL NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_edges_source ON edges (source_id);
             CREATE INDEX IF NOT EXISTS idx_edges_target ON edges (target_id);",
        )?;
        Ok(())
    }

    /// Inserts a batch of node rows inside one transaction. Rows whose id
    /// already exists are ignored, matching the idempotent TSV ingestion
    /// the pipeline expects.
    pub fn bulk_insert_nodes(&mut self, rows: &[NodeRow]) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0u64;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO nodes (id, script_type) VALUES (?1, ?2)",
            )?;
            for row in rows {
                inserted += stmt.execute(params![row.id, row.script_type])? as u64;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Inserts a batch of edge rows inside one transaction. Edge ids are
    /// assigned by the store in insertion order.
    pub fn bulk_insert_edges(&mut self, rows: &[EdgeRow]) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0u64;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO edges (source_id, target_id, value, edge_type, time_offset, block_height)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.source,
                    row.target,
                    row.features[0],
                    row.features[1],
                    row.features[2],
                    row.features[3],
                ])? as u64;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Min/max normalizes the node feature column into [0, 1] in place.
    /// A constant column is left untouched.
    pub fn normalize_nodes(&self) -> Result<()> {
        let (min, max): (Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT MIN(script_type), MAX(script_type) FROM nodes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (Some(min), Some(max)) = (min, max) else {
            return Ok(());
        };
        let span = max - min;
        if span == 0.0 {
            debug!("node feature column is constant, skipping normalization");
            return Ok(());
        }
        self.conn.execute(
            "UPDATE nodes SET script_type = (script_type - ?1) / ?2",
            params![min, span],
        )?;
        info!(min, max, "normalized node features");
        Ok(())
    }

    /// Min/max normalizes all four edge feature columns into [0, 1].
    pub fn normalize_edges(&self) -> Result<()> {
        for column in ["value", "edge_type", "time_offset", "block_height"] {
            let (min, max): (Option<f64>, Option<f64>) = self.conn.query_row(
                &format!("SELECT MIN({column}), MAX({column}) FROM edges"),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let (Some(min), Some(max)) = (min, max) else {
                continue;
            };
            let span = max - min;
            if span == 0.0 {
                debug!(column, "edge feature column is constant, skipping");
                continue;
            }
            self.conn.execute(
                &format!("UPDATE edges SET {column} = ({column} - ?1) / ?2"),
                params![min, span],
            )?;
            info!(column, min, max, "normalized edge features");
        }
        Ok(())
    }

    /// Store-level counters for reporting.
    pub fn stats(&self) -> Result<StoreStats> {
        let nodes: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        let edges: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        let self_loops: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE source_id = target_id",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreStats {
            nodes,
            edges,
            self_loops,
        })
    }

    fn max_node_id(&self) -> Result<Option<NodeId>> {
        let max: Option<NodeId> = self
            .conn
            .query_row("SELECT MAX(id) FROM nodes", [], |row| row.get(0))?;
        Ok(max)
    }

    fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
        let source = Node::new(row.get(0)?, vec![row.get(1)?]);
        let target = Node::new(row.get(2)?, vec![row.get(3)?]);
        let features = [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?];
        Ok(Edge::new(source, target, features))
    }
}

const EDGE_COLUMNS: &str = "e.source_id, ns.script_type, e.target_id, nt.script_type,
                            e.value, e.edge_type, e.time_offset, e.block_height";

impl GraphStore for SqliteStore {
    fn sample_nodes(&self, count: usize, rng: &mut dyn RngCore) -> Result<Vec<Node>> {
        let Some(max_id) = self.max_node_id()? else {
            return Ok(Vec::new());
        };
        let mut nodes = Vec::with_capacity(count);
        // Id draws tolerate gaps, so allow a few misses per requested node
        // before giving up on reaching the exact count.
        let mut attempts = count.saturating_mul(8);
        while nodes.len() < count && attempts > 0 {
            attempts -= 1;
            let id = rng.gen_range(1..=max_id);
            if let Some(node) = self.node_by_id(id)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn incident_edges(
        &self,
        node: NodeId,
        limit: usize,
        exclude_pair: Option<NodeId>,
    ) -> Result<Vec<Edge>> {
        let mut edges = Vec::new();
        match exclude_pair {
            None => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {EDGE_COLUMNS}
                     FROM edges e
                     JOIN nodes ns ON ns.id = e.source_id
                     JOIN nodes nt ON nt.id = e.target_id
                     WHERE e.source_id = ?1 OR e.target_id = ?1
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![node, limit as i64], Self::edge_from_row)?;
                for row in rows {
                    edges.push(row?);
                }
            }
            Some(pair) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {EDGE_COLUMNS}
                     FROM edges e
                     JOIN nodes ns ON ns.id = e.source_id
                     JOIN nodes nt ON nt.id = e.target_id
                     WHERE (e.source_id = ?1 OR e.target_id = ?1)
                       AND NOT (e.source_id = ?1 AND e.target_id = ?3)
                       AND NOT (e.source_id = ?3 AND e.target_id = ?1)
                     LIMIT ?2"
                ))?;
                let rows =
                    stmt.query_map(params![node, limit as i64, pair], Self::edge_from_row)?;
                for row in rows {
                    edges.push(row?);
                }
            }
        }
        Ok(edges)
    }

    fn edge_count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count)
    }

    fn edge_by_id(&self, id: EdgeId) -> Result<Option<Edge>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {EDGE_COLUMNS}
             FROM edges e
             JOIN nodes ns ON ns.id = e.source_id
             JOIN nodes nt ON nt.id = e.target_id
             WHERE e.id = ?1"
        ))?;
        let edge = stmt.query_row(params![id], Self::edge_from_row).optional()?;
        Ok(edge)
    }

    fn node_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, script_type FROM nodes WHERE id = ?1")?;
        let node = stmt
            .query_row(params![id], |row| {
                Ok(Node::new(row.get(0)?, vec![row.get(1)?]))
            })
            .optional()?;
        Ok(node)
    }
}
