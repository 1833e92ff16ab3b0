//! Worklens Core Library
//!
//! Configuration, the per-screenshot classifier fan-out, and the pipeline
//! that strings acquisition, classification, aggregation, refinement and
//! publishing together.

pub mod classifier;
pub mod config;
pub mod pipeline;

pub use classifier::Classifier;
pub use config::Config;
pub use pipeline::{Pipeline, RunSummary};
