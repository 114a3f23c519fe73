//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::report::Batch;
use clap::Parser;
use std::path::PathBuf;

/// prfigures - distribution charts for agent-authored pull request datasets
///
/// Loads PR, commit, review, comment, user, repository, timeline and issue
/// tables, computes descriptive statistics and writes one PNG per figure.
///
/// Examples:
///   prfigures --data-dir ./data
///   prfigures --data-dir ./data --batch agents --output-dir ./figures
///   prfigures --only 1,5,31 --summary summary.md
///   prfigures --dry-run --summary stats.json --format json
///   prfigures --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding one JSON Lines (or JSON array) file per table
    ///
    /// Defaults to the config file setting, or ./data.
    #[arg(short, long, value_name = "DIR", env = "PRFIGURES_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory figures are written to (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .prfigures.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Which figures to produce
    #[arg(long, default_value = "all", value_name = "BATCH")]
    pub batch: BatchSelection,

    /// Only produce these figure numbers (comma-separated)
    ///
    /// Example: --only 1,5,31
    #[arg(long, value_name = "NUMS", value_delimiter = ',')]
    pub only: Vec<u8>,

    /// Override the rendering resolution
    #[arg(long, value_name = "DPI")]
    pub dpi: Option<u32>,

    /// Write a run summary with per-figure statistics to this file
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Summary format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Compute statistics without rendering any images
    #[arg(long)]
    pub dry_run: bool,

    /// Print the figure catalog and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .prfigures.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which half of the catalog to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BatchSelection {
    /// Both batches (default)
    #[default]
    All,
    /// Figures 01-30
    Distributions,
    /// Figures 31-39
    Agents,
}

impl BatchSelection {
    pub fn as_batch(self) -> Option<Batch> {
        match self {
            BatchSelection::All => None,
            BatchSelection::Distributions => Some(Batch::Distributions),
            BatchSelection::Agents => Some(Batch::Agents),
        }
    }
}

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.dpi == Some(0) {
            return Err("DPI must be at least 1".to_string());
        }

        if let Some(bad) = self.only.iter().find(|n| !(1..=39).contains(*n)) {
            return Err(format!("Figure number {} is out of range (1-39)", bad));
        }

        if let Some(ref data_dir) = self.data_dir {
            if !self.list && !data_dir.is_dir() {
                return Err(format!(
                    "Data directory does not exist: {}",
                    data_dir.display()
                ));
            }
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.is_file() {
                return Err(format!(
                    "Output path is a file, not a directory: {}",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` is the config file's `general.verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            output_dir: None,
            config: None,
            batch: BatchSelection::All,
            only: Vec::new(),
            dpi: None,
            summary: None,
            format: OutputFormat::Markdown,
            dry_run: false,
            list: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "prfigures",
            "--batch",
            "agents",
            "--only",
            "31,35",
            "--dpi",
            "150",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.batch, BatchSelection::Agents);
        assert_eq!(args.only, vec![31, 35]);
        assert_eq!(args.dpi, Some(150));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.batch.as_batch(), Some(Batch::Agents));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        assert!(args.validate().is_ok());

        args.only = vec![1, 40];
        assert!(args.validate().is_err());

        args.only = vec![39];
        args.dpi = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());

        args.list = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
