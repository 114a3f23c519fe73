//! Error types for loading datasets and producing figures.
//!
//! Errors are split by how far they propagate: a missing source or a
//! malformed row aborts the whole run, everything else is caught at the
//! figure boundary so sibling figures still get produced.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Dataset '{table}' not found (looked for {path})")]
    MissingSource { table: String, path: PathBuf },

    #[error("Column '{column}' not present in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("No records for group '{group}'")]
    EmptyGroup { group: String },

    #[error("No data to plot: {what}")]
    EmptySeries { what: String },

    #[error("Malformed row in '{table}' at line {line}: {message}")]
    Parse {
        table: String,
        line: usize,
        message: String,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Whether this error only skips the figure it happened in.
    ///
    /// Skips are expected outcomes (an optional column or an empty
    /// population); they are reported but do not fail the run.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ReportError::MissingColumn { .. }
                | ReportError::EmptyGroup { .. }
                | ReportError::EmptySeries { .. }
        )
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReportError::MissingSource { .. } | ReportError::Parse { .. }
        )
    }

    pub(crate) fn render<E: std::fmt::Display>(err: E) -> Self {
        ReportError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
