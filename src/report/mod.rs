//! Figure catalog, rendering and run summaries.
//!
//! This module turns computed metrics into PNG figures and produces the
//! Markdown/JSON summary of a run.

pub mod catalog;
pub mod figure;
pub mod renderer;
pub mod runner;
pub mod summary;
pub mod theme;

pub use catalog::Batch;
pub use runner::{required_tables, select, BatchRunner, ChartStatus, RunOptions};
pub use summary::{
    generate_json_summary, generate_markdown_summary, write_summary, RunMetadata, RunSummary,
};
