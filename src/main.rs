//! prfigures - distribution charts for agent-authored pull request datasets
//!
//! Loads the PR dataset tables, computes descriptive statistics and writes
//! one PNG per figure in a fixed, numbered catalog.
//!
//! Exit codes:
//!   0 - Success (every selected figure rendered or was cleanly skipped)
//!   1 - Runtime error (missing source, malformed row, bad config, etc.)
//!   2 - One or more figures failed to render

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use error::ReportError;
use loader::{DatasetLoader, LoadConfig};
use report::{BatchRunner, ChartStatus, RunMetadata, RunOptions, RunSummary};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Handle --list early too
    if args.list {
        print_catalog(&args);
        return Ok(());
    }

    // Load configuration before logging so general.verbose applies
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("prfigures v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    config.merge_with_args(&args);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            if e.downcast_ref::<ReportError>().is_some_and(ReportError::is_fatal) {
                eprintln!(
                    "   The dataset could not be read. Check --data-dir and [data.sources] in {}.",
                    CONFIG_FILE
                );
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .prfigures.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize data sources, DPI, and agent colors.");
    Ok(())
}

/// Handle --list: print the catalog for the selected batch.
fn print_catalog(args: &Args) {
    for entry in report::select(args.batch.as_batch(), &args.only) {
        let tables: Vec<String> = entry.tables.iter().map(|t| t.to_string()).collect();
        println!(
            "{:<52} {:<13} {}",
            entry.file_name(),
            entry.batch,
            tables.join(", ")
        );
    }
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load, compute and render. Returns the exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.validate()?;

    let entries = report::select(args.batch.as_batch(), &args.only);
    if entries.is_empty() {
        anyhow::bail!("No figures match the requested batch and --only filter");
    }

    // Step 1: Load the tables the selected figures need
    let loader = DatasetLoader::new(LoadConfig::from(&config.data));
    println!("📥 Loading dataset from {}", loader.data_dir().display());

    let dataset = loader
        .load(&report::required_tables(&entries))
        .context("Failed to load dataset")?;
    let table_rows = RunMetadata::table_rows(&dataset.row_counts());
    for table in &table_rows {
        debug!("{}: {} rows", table.table, table.rows);
    }

    // Step 2: Produce the figures
    let output_dir = PathBuf::from(&config.general.output_dir);
    if args.dry_run {
        println!("\n🔍 Dry run: computing statistics for {} figures...", entries.len());
    } else {
        println!(
            "\n📊 Rendering {} figures to {} at {} DPI...",
            entries.len(),
            output_dir.display(),
            config.render.dpi
        );
    }

    let runner = BatchRunner::new(
        &config,
        RunOptions {
            output_dir: output_dir.clone(),
            dry_run: args.dry_run,
            show_progress: !args.quiet,
        },
    );
    let outcomes = runner.run(&dataset, &entries).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    // Step 3: Summarize
    let metadata = RunMetadata {
        generated_at: Utc::now(),
        data_dir: loader.data_dir().display().to_string(),
        output_dir: runner.output_dir().display().to_string(),
        dry_run: args.dry_run,
        tables: table_rows,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let summary = RunSummary::new(metadata, outcomes);

    print_completion(&summary);

    if let Some(ref path) = args.summary {
        let content = match args.format {
            OutputFormat::Json => report::generate_json_summary(&summary)?,
            OutputFormat::Markdown => report::generate_markdown_summary(&summary),
        };
        report::write_summary(&content, path)?;
        println!("   Summary saved to: {}", path.display());
    }

    let exit_code = summary.exit_code();
    if exit_code != 0 {
        eprintln!(
            "\n⛔ {} figure(s) failed. Failing (exit code {}).",
            summary.counts.failed, exit_code
        );
    }
    Ok(exit_code)
}

/// Print the completion summary.
fn print_completion(summary: &RunSummary) {
    let counts = &summary.counts;

    println!("\n📈 Figure Summary:");
    if summary.metadata.dry_run {
        println!("   Computed: {}", counts.computed);
    } else {
        println!("   Rendered: {}", counts.rendered);
    }
    println!("   Skipped: {} | Failed: {}", counts.skipped, counts.failed);
    println!("   Duration: {:.1}s", summary.metadata.duration_seconds);

    for chart in &summary.charts {
        match &chart.status {
            ChartStatus::Rendered => println!("     🖼️  {}", chart.file_name),
            ChartStatus::Computed => match chart.stats {
                Some(s) => println!(
                    "     📐 {} (n={}, median={:.1}, mean={:.1})",
                    chart.file_name, s.count, s.median, s.mean
                ),
                None => println!("     📐 {}", chart.file_name),
            },
            ChartStatus::Skipped(reason) => println!("     ⏭️  {} ({})", chart.file_name, reason),
            ChartStatus::Failed(reason) => println!("     ❌ {} ({})", chart.file_name, reason),
        }
    }

    if !summary.metadata.dry_run && counts.rendered > 0 {
        println!(
            "\n✅ Done! Figures saved to: {}",
            summary.metadata.output_dir
        );
    }
}

/// Load configuration from file or use defaults, with the file it came from.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Ok((Config::default(), None))
        }
    }
}
