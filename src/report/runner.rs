//! Batch execution of catalog entries.
//!
//! Each figure is produced in isolation: an error in one entry becomes that
//! entry's outcome and the batch moves on.

use crate::analysis::{Metrics, Summary};
use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::models::{Dataset, TableKind};
use crate::report::catalog::{Batch, ChartEntry, FigureContext, CATALOG};
use crate::report::renderer::Renderer;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ChartStatus {
    /// PNG written.
    Rendered,
    /// Statistics computed; rendering was not requested.
    Computed,
    /// Expected absence of data; not an error.
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartOutcome {
    pub ordinal: u8,
    pub slug: &'static str,
    pub file_name: String,
    pub batch: Batch,
    #[serde(flatten)]
    pub status: ChartStatus,
    pub stats: Option<Summary>,
}

/// Catalog entries matching a batch filter and an optional ordinal list.
pub fn select(batch: Option<Batch>, only: &[u8]) -> Vec<&'static ChartEntry> {
    CATALOG
        .iter()
        .filter(|e| batch.map_or(true, |b| e.batch == b))
        .filter(|e| only.is_empty() || only.contains(&e.ordinal))
        .collect()
}

/// Tables the given entries read.
pub fn required_tables(entries: &[&ChartEntry]) -> BTreeSet<TableKind> {
    entries
        .iter()
        .flat_map(|e| e.tables.iter().copied())
        .collect()
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Compute statistics without rendering.
    pub dry_run: bool,
    pub show_progress: bool,
}

/// Produces figures for a loaded dataset.
pub struct BatchRunner<'a> {
    config: &'a Config,
    renderer: Renderer,
    options: RunOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a Config, options: RunOptions) -> Self {
        Self {
            config,
            renderer: Renderer::new(&config.render),
            options,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.options.output_dir
    }

    /// Produce every entry in order.
    ///
    /// Only failing to create the output directory aborts the run.
    pub fn run(&self, dataset: &Dataset, entries: &[&ChartEntry]) -> Result<Vec<ChartOutcome>> {
        if !self.options.dry_run {
            std::fs::create_dir_all(&self.options.output_dir)?;
        }

        let metrics = Metrics::compute(dataset);
        let ctx = FigureContext {
            dataset,
            metrics: &metrics,
            agents: &self.config.agents,
        };

        let progress = self.progress_bar(entries.len());
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            progress.set_message(entry.file_name());
            let outcome = self.produce(entry, &ctx);

            match &outcome.status {
                ChartStatus::Rendered => debug!("Saved {}", outcome.file_name),
                ChartStatus::Computed => debug!("Computed {}", outcome.file_name),
                ChartStatus::Skipped(reason) => info!("Skipped {}: {}", outcome.file_name, reason),
                ChartStatus::Failed(reason) => warn!("Failed {}: {}", outcome.file_name, reason),
            }

            outcomes.push(outcome);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(outcomes)
    }

    fn produce(&self, entry: &ChartEntry, ctx: &FigureContext<'_>) -> ChartOutcome {
        let file_name = entry.file_name();
        let mut stats = None;

        let status = match entry.build(ctx) {
            Ok(figure) => {
                stats = figure.stats;
                if self.options.dry_run {
                    ChartStatus::Computed
                } else {
                    let path = self.options.output_dir.join(&file_name);
                    match self.renderer.save(&figure, &path) {
                        Ok(()) => ChartStatus::Rendered,
                        Err(err) => classify(err),
                    }
                }
            }
            Err(err) => classify(err),
        };

        ChartOutcome {
            ordinal: entry.ordinal,
            slug: entry.slug,
            file_name,
            batch: entry.batch,
            status,
            stats,
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

fn classify(err: ReportError) -> ChartStatus {
    if err.is_skip() {
        ChartStatus::Skipped(err.to_string())
    } else {
        ChartStatus::Failed(err.to_string())
    }
}
