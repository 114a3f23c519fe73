//! Run summary documents.
//!
//! This module generates the Markdown and JSON summaries written with
//! `--summary`: run metadata, per-figure statistics, and the reasons any
//! figure was skipped or failed.

use crate::models::TableKind;
use crate::report::figure::format_thousands;
use crate::report::runner::{ChartOutcome, ChartStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Row count of one loaded table.
#[derive(Debug, Clone, Serialize)]
pub struct TableRows {
    pub table: String,
    pub rows: usize,
}

/// Where and when a run happened.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_dir: String,
    pub output_dir: String,
    pub dry_run: bool,
    pub tables: Vec<TableRows>,
    pub duration_seconds: f64,
}

impl RunMetadata {
    pub fn table_rows(counts: &[(TableKind, usize)]) -> Vec<TableRows> {
        counts
            .iter()
            .map(|(kind, rows)| TableRows {
                table: kind.to_string(),
                rows: *rows,
            })
            .collect()
    }
}

/// Outcome tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub selected: usize,
    pub rendered: usize,
    pub computed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounts {
    pub fn from_outcomes(outcomes: &[ChartOutcome]) -> Self {
        let mut counts = Self {
            selected: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.status {
                ChartStatus::Rendered => counts.rendered += 1,
                ChartStatus::Computed => counts.computed += 1,
                ChartStatus::Skipped(_) => counts.skipped += 1,
                ChartStatus::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub counts: RunCounts,
    pub charts: Vec<ChartOutcome>,
}

impl RunSummary {
    pub fn new(metadata: RunMetadata, charts: Vec<ChartOutcome>) -> Self {
        Self {
            metadata,
            counts: RunCounts::from_outcomes(&charts),
            charts,
        }
    }

    /// Process exit code: 2 when any figure failed.
    pub fn exit_code(&self) -> i32 {
        if self.counts.failed > 0 {
            2
        } else {
            0
        }
    }
}

/// Generate the Markdown summary.
pub fn generate_markdown_summary(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str("# PR Dataset Figures\n\n");
    output.push_str(&generate_metadata_section(&summary.metadata));
    output.push_str(&generate_counts_section(&summary.counts));
    output.push_str(&generate_charts_section(&summary.charts));
    output.push_str(&generate_problems_section(&summary.charts));

    output
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!("- **Output Directory:** `{}`\n", metadata.output_dir));
    if metadata.dry_run {
        section.push_str("- **Mode:** dry run (no images written)\n");
    }
    section.push_str(&format!("- **Duration:** {:.1}s\n\n", metadata.duration_seconds));

    section.push_str("| Table | Rows |\n");
    section.push_str("|:---|---:|\n");
    for table in &metadata.tables {
        section.push_str(&format!(
            "| {} | {} |\n",
            table.table,
            format_thousands(table.rows)
        ));
    }
    section.push('\n');

    section
}

fn generate_counts_section(counts: &RunCounts) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Selected | Rendered | Computed | Skipped | Failed |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        counts.selected, counts.rendered, counts.computed, counts.skipped, counts.failed
    ));

    section
}

fn generate_charts_section(charts: &[ChartOutcome]) -> String {
    let mut section = String::new();

    section.push_str("## Figures\n\n");
    section.push_str("| # | File | Status | n | Median | Mean |\n");
    section.push_str("|---:|:---|:---|---:|---:|---:|\n");

    for chart in charts {
        let (n, median, mean) = match chart.stats {
            Some(s) => (
                format_thousands(s.count),
                format!("{:.1}", s.median),
                format!("{:.1}", s.mean),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        section.push_str(&format!(
            "| {:02} | `{}` | {} | {} | {} | {} |\n",
            chart.ordinal,
            chart.file_name,
            status_label(&chart.status),
            n,
            median,
            mean
        ));
    }
    section.push('\n');

    section
}

fn generate_problems_section(charts: &[ChartOutcome]) -> String {
    let problems: Vec<(&ChartOutcome, &str)> = charts
        .iter()
        .filter_map(|c| match &c.status {
            ChartStatus::Skipped(reason) | ChartStatus::Failed(reason) => {
                Some((c, reason.as_str()))
            }
            _ => None,
        })
        .collect();

    if problems.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Skipped and Failed\n\n");
    for (chart, reason) in problems {
        section.push_str(&format!(
            "- **{:02} {}** ({}): {}\n",
            chart.ordinal,
            chart.slug,
            status_label(&chart.status),
            reason
        ));
    }
    section.push('\n');

    section
}

fn status_label(status: &ChartStatus) -> &'static str {
    match status {
        ChartStatus::Rendered => "rendered",
        ChartStatus::Computed => "computed",
        ChartStatus::Skipped(_) => "skipped",
        ChartStatus::Failed(_) => "failed",
    }
}

/// Generate the JSON summary.
pub fn generate_json_summary(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Write `content` to `path`.
pub fn write_summary(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Summary;
    use crate::report::catalog::Batch;

    fn outcome(ordinal: u8, slug: &'static str, status: ChartStatus) -> ChartOutcome {
        ChartOutcome {
            ordinal,
            slug,
            file_name: format!("{:02}_{}.png", ordinal, slug),
            batch: Batch::Distributions,
            stats: match status {
                ChartStatus::Rendered => Some(Summary {
                    count: 1234,
                    median: 5.0,
                    mean: 4.0,
                }),
                _ => None,
            },
            status,
        }
    }

    fn create_test_summary() -> RunSummary {
        let metadata = RunMetadata {
            generated_at: Utc::now(),
            data_dir: "data".to_string(),
            output_dir: "figures_individual".to_string(),
            dry_run: false,
            tables: RunMetadata::table_rows(&[
                (TableKind::PullRequests, 33596),
                (TableKind::Repositories, 2807),
            ]),
            duration_seconds: 12.5,
        };

        RunSummary::new(
            metadata,
            vec![
                outcome(1, "pr_files_changed_histogram", ChartStatus::Rendered),
                outcome(
                    22,
                    "repo_stars_histogram",
                    ChartStatus::Skipped("Column 'stars' not present".to_string()),
                ),
                outcome(
                    24,
                    "programming_languages_barplot",
                    ChartStatus::Failed("Render error: font".to_string()),
                ),
            ],
        )
    }

    #[test]
    fn test_counts_and_exit_code() {
        let summary = create_test_summary();
        assert_eq!(
            summary.counts,
            RunCounts {
                selected: 3,
                rendered: 1,
                computed: 0,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.exit_code(), 2);

        let clean = RunSummary::new(summary.metadata.clone(), summary.charts[..2].to_vec());
        assert_eq!(clean.exit_code(), 0);
    }

    #[test]
    fn test_generate_markdown_summary() {
        let markdown = generate_markdown_summary(&create_test_summary());

        assert!(markdown.contains("# PR Dataset Figures"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| pull_request | 33,596 |"));
        assert!(markdown.contains("| 01 | `01_pr_files_changed_histogram.png` | rendered | 1,234 | 5.0 | 4.0 |"));
        assert!(markdown.contains("## Skipped and Failed"));
        assert!(markdown.contains("**22 repo_stars_histogram** (skipped)"));
        assert!(markdown.contains("(failed): Render error: font"));
    }

    #[test]
    fn test_no_problems_section_when_clean() {
        let mut summary = create_test_summary();
        summary.charts.truncate(1);
        let markdown = generate_markdown_summary(&summary);
        assert!(!markdown.contains("## Skipped and Failed"));
    }

    #[test]
    fn test_generate_json_summary() {
        let json = generate_json_summary(&create_test_summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["counts"]["failed"], 1);
        assert_eq!(value["metadata"]["tables"][0]["table"], "pull_request");
        assert_eq!(value["charts"][0]["stats"]["median"], 5.0);
        assert_eq!(value["charts"][1]["status"], "skipped");
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        write_summary("# hi\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi\n");
    }
}
