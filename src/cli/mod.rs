//! Command-line surface: import, normalize, sample, stats.

pub mod ingest;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::error::Result;
use crate::explore::ExploreConfig;
use crate::output::SampleArchive;
use crate::session::{SampleMode, SamplerConfig, SamplingSession};
use crate::store::SqliteStore;

/// Sampling toolkit for graph neural network training data.
#[derive(Parser, Debug)]
#[command(name = "graphsample", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Path to the SQLite graph store.
    #[arg(long, global = true, value_name = "DB", default_value = "graph.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import node and edge TSV files into the store.
    Import(ImportCmd),
    /// Rescale node and edge features to the unit interval in place.
    Normalize,
    /// Draw a batch of samples and write them to a JSON archive.
    Sample(SampleCmd),
    /// Print store counters and, optionally, archive group counters.
    Stats(StatsCmd),
}

#[derive(Args, Debug)]
pub struct ImportCmd {
    /// TSV file of `node_id <TAB> script_type` rows.
    #[arg(long, value_name = "FILE")]
    pub nodes: Option<PathBuf>,

    /// TSV file of `source target value edge_type time_offset block_height`
    /// rows.
    #[arg(long, value_name = "FILE")]
    pub edges: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModeArg {
    /// Pair each explored subgraph with a random contrastive one.
    Contrast,
    /// Withhold one edge per subgraph as the supervised label.
    EdgePrediction,
}

impl From<ModeArg> for SampleMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Contrast => SampleMode::Contrast,
            ModeArg::EdgePrediction => SampleMode::EdgePrediction,
        }
    }
}

#[derive(Args, Debug)]
pub struct SampleCmd {
    /// Output archive path.
    #[arg(long, value_name = "FILE", default_value = "samples.json")]
    pub out: PathBuf,

    /// Number of samples to draw.
    #[arg(long, default_value_t = 100)]
    pub count: usize,

    /// Pairing mode.
    #[arg(long, value_enum, default_value_t = ModeArg::Contrast)]
    pub mode: ModeArg,

    /// Base seed, strictly between 0 and 1.
    #[arg(long, default_value_t = 0.5)]
    pub seed: f64,

    /// Hop budget per explored subgraph (contrast mode).
    #[arg(long, default_value_t = 2)]
    pub hops: u32,

    /// Edge budget per explored subgraph (contrast mode).
    #[arg(long, default_value_t = 64)]
    pub max_edges: usize,

    /// Distinct-node target per subgraph (edge-prediction mode).
    #[arg(long, default_value_t = 3)]
    pub nodes_per_graph: usize,

    /// Attempts per sample before it counts as a miss.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Probability of following each additional branch during exploration.
    #[arg(long, default_value_t = 0.25)]
    pub branch_probability: f64,

    /// Per-exploration deadline in milliseconds.
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct StatsCmd {
    /// Also report per-group counters of this archive.
    #[arg(long, value_name = "FILE")]
    pub archive: Option<PathBuf>,
}

impl SampleCmd {
    fn to_config(&self) -> SamplerConfig {
        SamplerConfig {
            mode: self.mode.into(),
            seed: self.seed,
            hops: self.hops,
            max_edges: self.max_edges,
            nodes_per_graph: self.nodes_per_graph,
            retries: self.retries,
            explore: ExploreConfig {
                branch_probability: self.branch_probability,
                deadline: self.deadline_ms.map(std::time::Duration::from_millis),
                ..ExploreConfig::default()
            },
            ..SamplerConfig::default()
        }
    }
}

/// Executes a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import(cmd) => {
            let mut store = SqliteStore::open(&cli.db)?;
            if let Some(path) = &cmd.nodes {
                let summary = ingest::import_nodes(&mut store, path)?;
                println!(
                    "nodes: {} imported, {} skipped",
                    summary.nodes_imported, summary.rows_skipped
                );
            }
            if let Some(path) = &cmd.edges {
                let summary = ingest::import_edges(&mut store, path)?;
                println!(
                    "edges: {} imported, {} skipped",
                    summary.edges_imported, summary.rows_skipped
                );
            }
            Ok(())
        }
        Command::Normalize => {
            let store = SqliteStore::open(&cli.db)?;
            store.normalize_nodes()?;
            store.normalize_edges()?;
            info!("feature columns rescaled to the unit interval");
            println!("normalized");
            Ok(())
        }
        Command::Sample(cmd) => {
            let store = SqliteStore::open(&cli.db)?;
            let mut session = SamplingSession::new(&store, cmd.to_config())?;
            let (samples, summary) = session.sample_batch(cmd.count)?;

            let mut archive = SampleArchive::new();
            for sample in &samples {
                archive.push_sample(sample)?;
            }
            archive.write_json(&cmd.out)?;
            println!(
                "{} of {} samples written to {} ({} misses)",
                summary.achieved,
                summary.requested,
                cmd.out.display(),
                summary.misses
            );
            Ok(())
        }
        Command::Stats(cmd) => {
            let store = SqliteStore::open(&cli.db)?;
            let stats = store.stats()?;
            println!(
                "store: {} nodes, {} edges ({} self-loops)",
                stats.nodes, stats.edges, stats.self_loops
            );
            if let Some(path) = &cmd.archive {
                let archive = SampleArchive::read_json(path)?;
                println!("archive: {} samples", archive.len());
                for (name, group) in archive.group_stats() {
                    println!(
                        "  {name}: {} graphs, {} node rows, {} edge rows",
                        group.graphs, group.total_nodes, group.total_edges
                    );
                }
            }
            Ok(())
        }
    }
}
