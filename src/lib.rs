//! Subgraph sampling for graph neural network training data.
//!
//! The crate turns a large transaction graph persisted in SQLite into
//! batches of small, tensor-ready subgraph samples: explored neighborhoods
//! paired with random contrastive subgraphs, or neighborhoods with one
//! edge withheld as the supervised label.

#![warn(missing_docs)]

pub mod cli;
pub mod components;
pub mod error;
pub mod explore;
pub mod graph;
pub mod model;
pub mod output;
pub mod random;
pub mod session;
pub mod store;

pub use error::{Result, SampleError};
pub use model::{Edge, Node, NodeId};
