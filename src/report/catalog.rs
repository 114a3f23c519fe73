//! The fixed set of figures and how each is built from the dataset.
//!
//! Ordinals and slugs are part of the output contract: file names are
//! `<NN>_<slug>.png` and must stay stable across runs. Figures 01-30 are
//! dataset-wide distributions; 31-39 break entities down by agent.

use crate::analysis::{
    counts_as_series, group_prs_by_agent, top_k, value_counts, DisplayRange, Metrics, Summary,
};
use crate::config::AgentsConfig;
use crate::error::{ReportError, Result};
use crate::models::{Dataset, PullRequest, TableKind};
use crate::report::figure::{
    display_label, stats_line, Bar, BarPlot, BoxPlot, Figure, FigureSize, HistogramPlot, Plot,
    Series, ViolinPlot,
};
use crate::report::theme::{self, Rgb};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which half of the catalog a figure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Batch {
    /// Dataset-wide distributions (01-30).
    Distributions,
    /// Per-agent entity breakdowns (31-39).
    Agents,
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Batch::Distributions => write!(f, "distributions"),
            Batch::Agents => write!(f, "agents"),
        }
    }
}

/// Everything a figure builder may read.
pub struct FigureContext<'a> {
    pub dataset: &'a Dataset,
    pub metrics: &'a Metrics,
    pub agents: &'a AgentsConfig,
}

type BuildFn = fn(&FigureContext<'_>) -> Result<Figure>;

/// One entry of the figure catalog.
pub struct ChartEntry {
    pub ordinal: u8,
    pub slug: &'static str,
    pub batch: Batch,
    /// Tables the figure reads; these must exist when it is selected.
    pub tables: &'static [TableKind],
    build: BuildFn,
}

impl ChartEntry {
    /// Output file name, e.g. `01_pr_files_changed_histogram.png`.
    pub fn file_name(&self) -> String {
        format!("{:02}_{}.png", self.ordinal, self.slug)
    }

    /// Build the figure. Errors are scoped to this entry.
    pub fn build(&self, ctx: &FigureContext<'_>) -> Result<Figure> {
        (self.build)(ctx)
    }
}

impl fmt::Debug for ChartEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartEntry")
            .field("ordinal", &self.ordinal)
            .field("slug", &self.slug)
            .field("batch", &self.batch)
            .finish()
    }
}

use TableKind::{
    Comments, CommitDetails, Commits, Issues, PullRequests, Repositories, Reviews, Timeline, Users,
};

macro_rules! entry {
    ($ordinal:expr, $slug:expr, $batch:ident, [$($table:ident),*], $build:path) => {
        ChartEntry {
            ordinal: $ordinal,
            slug: $slug,
            batch: Batch::$batch,
            tables: &[$($table),*],
            build: $build,
        }
    };
}

/// The complete figure catalog, in ordinal order.
pub static CATALOG: [ChartEntry; 39] = [
    entry!(
        1,
        "pr_files_changed_histogram",
        Distributions,
        [CommitDetails],
        files_changed_histogram
    ),
    entry!(
        2,
        "pr_files_changed_boxplot",
        Distributions,
        [CommitDetails],
        files_changed_boxplot
    ),
    entry!(
        3,
        "pr_files_changed_violinplot",
        Distributions,
        [CommitDetails],
        files_changed_violinplot
    ),
    entry!(
        4,
        "pr_lines_added_histogram",
        Distributions,
        [CommitDetails],
        lines_added_histogram
    ),
    entry!(
        5,
        "pr_lines_deleted_histogram",
        Distributions,
        [CommitDetails],
        lines_deleted_histogram
    ),
    entry!(
        6,
        "pr_total_changes_histogram",
        Distributions,
        [CommitDetails],
        total_changes_histogram
    ),
    entry!(
        7,
        "pr_title_length_histogram",
        Distributions,
        [PullRequests],
        title_length_histogram
    ),
    entry!(
        8,
        "pr_body_length_histogram",
        Distributions,
        [PullRequests],
        body_length_histogram
    ),
    entry!(
        9,
        "pr_state_distribution",
        Distributions,
        [PullRequests],
        pr_state_distribution
    ),
    entry!(
        10,
        "commits_per_pr_histogram",
        Distributions,
        [Commits],
        commits_per_pr_histogram
    ),
    entry!(
        11,
        "commits_per_pr_boxplot",
        Distributions,
        [Commits],
        commits_per_pr_boxplot
    ),
    entry!(
        12,
        "commit_message_length_histogram",
        Distributions,
        [Commits],
        commit_message_length_histogram
    ),
    entry!(
        13,
        "reviews_per_pr_histogram",
        Distributions,
        [Reviews],
        reviews_per_pr_histogram
    ),
    entry!(
        14,
        "review_body_length_histogram",
        Distributions,
        [Reviews],
        review_body_length_histogram
    ),
    entry!(
        15,
        "review_state_distribution",
        Distributions,
        [Reviews],
        review_state_distribution
    ),
    entry!(
        16,
        "comments_per_pr_histogram",
        Distributions,
        [Comments],
        comments_per_pr_histogram
    ),
    entry!(
        17,
        "comment_body_length_histogram",
        Distributions,
        [Comments],
        comment_body_length_histogram
    ),
    entry!(
        18,
        "timeline_events_per_pr_histogram",
        Distributions,
        [Timeline],
        timeline_events_histogram
    ),
    entry!(
        19,
        "prs_per_user_histogram",
        Distributions,
        [PullRequests],
        prs_per_user_histogram
    ),
    entry!(
        20,
        "prs_per_repo_histogram",
        Distributions,
        [PullRequests],
        prs_per_repo_histogram
    ),
    entry!(
        21,
        "user_followers_histogram",
        Distributions,
        [Users],
        user_followers_histogram
    ),
    entry!(
        22,
        "repo_stars_histogram",
        Distributions,
        [Repositories],
        repo_stars_histogram
    ),
    entry!(
        23,
        "repo_forks_histogram",
        Distributions,
        [Repositories],
        repo_forks_histogram
    ),
    entry!(
        24,
        "programming_languages_barplot",
        Distributions,
        [Repositories],
        languages_barplot
    ),
    entry!(
        25,
        "file_additions_histogram",
        Distributions,
        [CommitDetails],
        file_additions_histogram
    ),
    entry!(
        26,
        "file_deletions_histogram",
        Distributions,
        [CommitDetails],
        file_deletions_histogram
    ),
    entry!(
        27,
        "file_status_distribution",
        Distributions,
        [CommitDetails],
        file_status_distribution
    ),
    entry!(
        28,
        "file_additions_boxplot",
        Distributions,
        [CommitDetails],
        file_additions_boxplot
    ),
    entry!(
        29,
        "file_deletions_boxplot",
        Distributions,
        [CommitDetails],
        file_deletions_boxplot
    ),
    entry!(
        30,
        "timeline_event_types_barplot",
        Distributions,
        [Timeline],
        timeline_event_types_barplot
    ),
    entry!(
        31,
        "entity_files_changed_by_agent",
        Agents,
        [PullRequests, CommitDetails],
        files_changed_by_agent
    ),
    entry!(
        32,
        "entity_lines_added_by_agent",
        Agents,
        [PullRequests, CommitDetails],
        lines_added_by_agent
    ),
    entry!(
        33,
        "entity_pr_description_length_by_agent",
        Agents,
        [PullRequests],
        description_length_by_agent
    ),
    entry!(
        34,
        "entity_review_comment_intensity_by_agent",
        Agents,
        [PullRequests, Comments],
        comment_intensity_by_agent
    ),
    entry!(
        35,
        "entity_time_to_merge_by_agent",
        Agents,
        [PullRequests],
        time_to_merge_by_agent
    ),
    entry!(
        36,
        "entity_repository_popularity",
        Agents,
        [Repositories],
        repository_popularity
    ),
    entry!(
        37,
        "entity_commit_message_verbosity",
        Agents,
        [Commits],
        commit_message_verbosity
    ),
    entry!(
        38,
        "entity_developer_social_reach",
        Agents,
        [Users],
        developer_social_reach
    ),
    entry!(
        39,
        "entity_issue_description_detail",
        Agents,
        [Issues],
        issue_description_detail
    ),
];

// ---------------------------------------------------------------------------
// Shared builders
// ---------------------------------------------------------------------------

/// A single-series histogram whose title carries median and mean.
struct TitledHistogram {
    title: &'static str,
    x_label: &'static str,
    color: Rgb,
    range: DisplayRange,
    bins: usize,
    precision: usize,
}

impl TitledHistogram {
    fn build(self, values: Vec<f64>) -> Result<Figure> {
        let stats = summarize(&values, self.title)?;
        let plotted = self.range.apply(&values);

        Ok(Figure {
            title: self.title.to_string(),
            subtitle: Some(stats_line(&stats, self.precision)),
            x_label: self.x_label.to_string(),
            y_label: "Frequency".to_string(),
            size: FigureSize::WIDE,
            stats: Some(stats),
            plot: Plot::Histogram(HistogramPlot {
                series: vec![Series::new(self.title, self.color, plotted)],
                bins: self.bins,
                window: self.range.bounds(),
                log_x: false,
                annotation: Vec::new(),
                legend: false,
            }),
        })
    }
}

/// A single-series histogram with a median/mean box in the corner.
struct AnnotatedHistogram {
    title: &'static str,
    x_label: &'static str,
    color: Rgb,
    range: DisplayRange,
    log_x: bool,
}

impl AnnotatedHistogram {
    fn build(self, values: Vec<f64>) -> Result<Figure> {
        let stats = summarize(&values, self.title)?;
        let plotted = self.range.apply(&values);

        Ok(Figure {
            title: self.title.to_string(),
            subtitle: None,
            x_label: self.x_label.to_string(),
            y_label: "Frequency".to_string(),
            size: FigureSize::WIDE,
            stats: Some(stats),
            plot: Plot::Histogram(HistogramPlot {
                series: vec![Series::new(self.title, self.color, plotted)],
                bins: 50,
                window: self.range.bounds(),
                log_x: self.log_x,
                annotation: vec![
                    format!("Median: {:.0}", stats.median),
                    format!("Mean: {:.0}", stats.mean),
                ],
                legend: false,
            }),
        })
    }
}

/// A single box or violin over one series.
struct SingleDistribution {
    title: &'static str,
    y_label: &'static str,
    tick: &'static str,
    fill: Rgb,
    edge: Rgb,
    median: Rgb,
}

impl SingleDistribution {
    fn boxplot(self, values: Vec<f64>) -> Result<Figure> {
        let stats = summarize(&values, self.title)?;
        Ok(Figure {
            title: self.title.to_string(),
            subtitle: None,
            x_label: String::new(),
            y_label: self.y_label.to_string(),
            size: FigureSize::NARROW,
            stats: Some(stats),
            plot: Plot::Box(BoxPlot {
                slots: vec![self.tick.to_string()],
                series: vec![Series::new(self.tick, self.fill, values)],
                show_outliers: true,
                log_y: false,
                edge: self.edge,
                median: self.median,
            }),
        })
    }

    fn violin(self, values: Vec<f64>) -> Result<Figure> {
        let stats = summarize(&values, self.title)?;
        Ok(Figure {
            title: self.title.to_string(),
            subtitle: None,
            x_label: String::new(),
            y_label: self.y_label.to_string(),
            size: FigureSize::NARROW,
            stats: Some(stats),
            plot: Plot::Violin(ViolinPlot {
                slots: vec![self.tick.to_string()],
                series: vec![Series::new(self.tick, self.fill, values)],
                y_range: None,
                edge: self.edge,
            }),
        })
    }
}

fn summarize(values: &[f64], what: &str) -> Result<Summary> {
    Summary::of(values).ok_or_else(|| ReportError::EmptySeries {
        what: what.to_string(),
    })
}

/// Bar chart over value counts.
fn count_bars(
    title: &str,
    axis_label: &str,
    counts: Vec<(String, usize)>,
    colors: Vec<Rgb>,
    horizontal: bool,
) -> Result<Figure> {
    if counts.is_empty() {
        return Err(ReportError::EmptySeries {
            what: title.to_string(),
        });
    }

    let bars = counts
        .into_iter()
        .zip(colors)
        .map(|((label, value), color)| Bar {
            label,
            value,
            color,
        })
        .collect();

    let (x_label, y_label, size) = if horizontal {
        (axis_label.to_string(), String::new(), FigureSize::TALL)
    } else {
        (String::new(), axis_label.to_string(), FigureSize::WIDE)
    };

    Ok(Figure {
        title: title.to_string(),
        subtitle: None,
        x_label,
        y_label,
        size,
        stats: None,
        plot: Plot::Bar(BarPlot { bars, horizontal }),
    })
}

/// One series per configured agent, in configured order.
///
/// `value` returns `None` for PRs that do not take part in the figure.
/// Agents left without data are skipped; the remaining series keep their
/// slot index so colors and positions do not shift. Also returns the
/// pooled, unclipped values for the run summary.
fn agent_series<F>(
    ctx: &FigureContext<'_>,
    value: F,
    range: DisplayRange,
) -> (Vec<Series>, Vec<f64>)
where
    F: Fn(&PullRequest) -> Option<f64>,
{
    let groups = group_prs_by_agent(&ctx.dataset.pull_requests.rows, &ctx.agents.order);
    let mut series = Vec::new();
    let mut population = Vec::new();

    for (slot, (agent, prs)) in groups.into_iter().enumerate() {
        let values: Vec<f64> = prs.into_iter().filter_map(|pr| value(pr)).collect();

        if values.is_empty() {
            debug!("{}", ReportError::EmptyGroup { group: agent });
            continue;
        }

        population.extend_from_slice(&values);
        series.push(
            Series::new(display_label(&agent), ctx.agents.color_for(&agent), range.apply(&values))
                .at(slot),
        );
    }

    (series, population)
}

/// Agent axis labels, one per configured agent.
fn agent_slots(ctx: &FigureContext<'_>) -> Vec<String> {
    ctx.agents.order.iter().map(|a| display_label(a)).collect()
}

fn no_groups(title: &str) -> ReportError {
    ReportError::EmptySeries {
        what: format!("{} (no agent has data)", title),
    }
}

// ---------------------------------------------------------------------------
// 01-09: pull request metrics
// ---------------------------------------------------------------------------

fn files_changed_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Files Changed per Pull Request",
        x_label: "Number of Files Changed",
        color: theme::STEEL_BLUE,
        range: DisplayRange::at_most(50.0),
        bins: 50,
        precision: 1,
    }
    .build(ctx.metrics.files_per_pr())
}

fn files_changed_boxplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    SingleDistribution {
        title: "Files Changed per Pull Request - Box Plot",
        y_label: "Number of Files Changed",
        tick: "Files Changed",
        fill: theme::LIGHT_BLUE,
        edge: theme::STEEL_BLUE,
        median: theme::RED,
    }
    .boxplot(ctx.metrics.files_per_pr())
}

fn files_changed_violinplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    SingleDistribution {
        title: "Files Changed per Pull Request - Violin Plot",
        y_label: "Number of Files Changed",
        tick: "Files Changed",
        fill: theme::LIGHT_BLUE,
        edge: theme::STEEL_BLUE,
        median: theme::RED,
    }
    .violin(ctx.metrics.files_per_pr())
}

fn lines_added_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Lines Added per Pull Request",
        x_label: "Lines Added",
        color: theme::GREEN,
        range: DisplayRange::at_most(1000.0),
        bins: 50,
        precision: 0,
    }
    .build(ctx.metrics.additions_per_pr())
}

fn lines_deleted_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Lines Deleted per Pull Request",
        x_label: "Lines Deleted",
        color: theme::RED,
        range: DisplayRange::at_most(1000.0),
        bins: 50,
        precision: 0,
    }
    .build(ctx.metrics.deletions_per_pr())
}

fn total_changes_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Total Changes per Pull Request",
        x_label: "Total Lines Changed",
        color: theme::PURPLE,
        range: DisplayRange::at_most(2000.0),
        bins: 50,
        precision: 0,
    }
    .build(ctx.metrics.changes_per_pr())
}

fn title_length_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let lengths = ctx
        .dataset
        .pull_requests
        .rows
        .iter()
        .map(|pr| pr.title_length() as f64)
        .collect();

    TitledHistogram {
        title: "PR Title Length Distribution",
        x_label: "Title Length (characters)",
        color: theme::ORANGE,
        range: DisplayRange::at_most(200.0),
        bins: 50,
        precision: 0,
    }
    .build(lengths)
}

fn body_length_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let lengths = ctx
        .dataset
        .pull_requests
        .rows
        .iter()
        .map(|pr| pr.body_length() as f64)
        .collect();

    TitledHistogram {
        title: "PR Body Length Distribution",
        x_label: "Body Length (characters)",
        color: theme::BROWN,
        range: DisplayRange::at_most(5000.0),
        bins: 50,
        precision: 0,
    }
    .build(lengths)
}

fn pr_state_distribution(ctx: &FigureContext<'_>) -> Result<Figure> {
    let prs = &ctx.dataset.pull_requests;
    prs.require_column("state")?;

    let counts = value_counts(prs.rows.iter().map(|pr| pr.state.as_deref()));
    let colors = counts.iter().map(|(state, _)| theme::state_color(state)).collect();

    count_bars("PR State Distribution", "Count", counts, colors, false)
}

// ---------------------------------------------------------------------------
// 10-18: commits, reviews, comments, timeline
// ---------------------------------------------------------------------------

fn commits_per_pr_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Commits per Pull Request",
        x_label: "Number of Commits",
        color: theme::STEEL_BLUE,
        range: DisplayRange::at_most(20.0),
        bins: 20,
        precision: 1,
    }
    .build(ctx.metrics.commits_series())
}

fn commits_per_pr_boxplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    SingleDistribution {
        title: "Commits per Pull Request - Box Plot",
        y_label: "Number of Commits",
        tick: "Commits",
        fill: theme::LIGHT_BLUE,
        edge: theme::STEEL_BLUE,
        median: theme::RED,
    }
    .boxplot(ctx.metrics.commits_series())
}

fn commit_message_length_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let lengths = ctx
        .dataset
        .commits
        .rows
        .iter()
        .map(|c| c.message_length() as f64)
        .collect();

    TitledHistogram {
        title: "Commit Message Length Distribution",
        x_label: "Message Length (characters)",
        color: theme::DARK_BLUE,
        range: DisplayRange::at_most(500.0),
        bins: 50,
        precision: 0,
    }
    .build(lengths)
}

fn reviews_per_pr_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Reviews per Pull Request",
        x_label: "Number of Reviews",
        color: theme::GREEN,
        range: DisplayRange::at_most(10.0),
        bins: 10,
        precision: 1,
    }
    .build(ctx.metrics.reviews_series())
}

fn review_body_length_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let lengths = ctx
        .dataset
        .reviews
        .rows
        .iter()
        .map(|r| r.body_length() as f64)
        .collect();

    TitledHistogram {
        title: "Review Body Length Distribution",
        x_label: "Body Length (characters)",
        color: theme::DARK_GREEN,
        range: DisplayRange::at_most(2000.0),
        bins: 50,
        precision: 0,
    }
    .build(lengths)
}

fn review_state_distribution(ctx: &FigureContext<'_>) -> Result<Figure> {
    let reviews = &ctx.dataset.reviews;
    reviews.require_column("state")?;

    let counts = top_k(reviews.rows.iter().map(|r| r.state.as_deref()), 10);
    let colors = theme::sample_palette(&theme::SET3, counts.len());

    count_bars("Review State Distribution (Top 10)", "Count", counts, colors, false)
}

fn comments_per_pr_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Comments per Pull Request",
        x_label: "Number of Comments",
        color: theme::ORANGE,
        range: DisplayRange::at_most(20.0),
        bins: 20,
        precision: 1,
    }
    .build(ctx.metrics.comments_series())
}

fn comment_body_length_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let lengths = ctx
        .dataset
        .comments
        .rows
        .iter()
        .map(|c| c.body_length() as f64)
        .collect();

    TitledHistogram {
        title: "Comment Body Length Distribution",
        x_label: "Body Length (characters)",
        color: theme::DARK_ORANGE,
        range: DisplayRange::at_most(1000.0),
        bins: 50,
        precision: 0,
    }
    .build(lengths)
}

fn timeline_events_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Timeline Events per Pull Request",
        x_label: "Number of Timeline Events",
        color: theme::PURPLE,
        range: DisplayRange::at_most(30.0),
        bins: 30,
        precision: 1,
    }
    .build(ctx.metrics.timeline_series())
}

// ---------------------------------------------------------------------------
// 19-24: users and repositories
// ---------------------------------------------------------------------------

fn prs_per_user_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Pull Requests per User",
        x_label: "Number of PRs",
        color: theme::TEAL,
        range: DisplayRange::at_most(50.0),
        bins: 50,
        precision: 1,
    }
    .build(counts_as_series(&ctx.metrics.prs_per_user))
}

fn prs_per_repo_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "Pull Requests per Repository",
        x_label: "Number of PRs",
        color: theme::CORAL,
        range: DisplayRange::at_most(50.0),
        bins: 50,
        precision: 1,
    }
    .build(counts_as_series(&ctx.metrics.prs_per_repo))
}

fn user_followers_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let users = &ctx.dataset.users;
    users.require_column("followers")?;

    TitledHistogram {
        title: "User Followers Distribution",
        x_label: "Number of Followers",
        color: theme::MEDIUM_PURPLE,
        range: DisplayRange::at_most(500.0),
        bins: 50,
        precision: 0,
    }
    .build(users.rows.iter().filter_map(|u| u.followers).collect())
}

fn repo_stars_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let repos = &ctx.dataset.repositories;
    repos.require_column("stars")?;

    TitledHistogram {
        title: "Repository Stars Distribution",
        x_label: "Number of Stars",
        color: theme::GOLD,
        range: DisplayRange::at_most(10000.0),
        bins: 50,
        precision: 0,
    }
    .build(repos.rows.iter().filter_map(|r| r.stars).collect())
}

fn repo_forks_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    let repos = &ctx.dataset.repositories;
    repos.require_column("forks")?;

    TitledHistogram {
        title: "Repository Forks Distribution",
        x_label: "Number of Forks",
        color: theme::LIGHT_CORAL,
        range: DisplayRange::at_most(1000.0),
        bins: 50,
        precision: 0,
    }
    .build(repos.rows.iter().filter_map(|r| r.forks).collect())
}

fn languages_barplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    let repos = &ctx.dataset.repositories;
    repos.require_column("language")?;

    let counts = top_k(repos.rows.iter().map(|r| r.language.as_deref()), 15);
    let colors = theme::sample_palette(&theme::TAB20, counts.len());

    count_bars(
        "Top 15 Programming Languages",
        "Number of Repositories",
        counts,
        colors,
        true,
    )
}

// ---------------------------------------------------------------------------
// 25-30: file-level changes
// ---------------------------------------------------------------------------

fn file_additions(ctx: &FigureContext<'_>) -> Vec<f64> {
    ctx.dataset
        .commit_details
        .rows
        .iter()
        .filter_map(|d| d.additions)
        .collect()
}

fn file_deletions(ctx: &FigureContext<'_>) -> Vec<f64> {
    ctx.dataset
        .commit_details
        .rows
        .iter()
        .filter_map(|d| d.deletions)
        .collect()
}

fn file_additions_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "File Additions Distribution",
        x_label: "Lines Added per File",
        color: theme::GREEN,
        range: DisplayRange::at_most(500.0),
        bins: 50,
        precision: 1,
    }
    .build(file_additions(ctx))
}

fn file_deletions_histogram(ctx: &FigureContext<'_>) -> Result<Figure> {
    TitledHistogram {
        title: "File Deletions Distribution",
        x_label: "Lines Deleted per File",
        color: theme::RED,
        range: DisplayRange::at_most(500.0),
        bins: 50,
        precision: 1,
    }
    .build(file_deletions(ctx))
}

fn file_status_distribution(ctx: &FigureContext<'_>) -> Result<Figure> {
    let details = &ctx.dataset.commit_details;
    details.require_column("status")?;

    let counts = top_k(details.rows.iter().map(|d| d.status.as_deref()), 10);
    let colors = theme::cycle_palette(&theme::STATUS_COLORS, counts.len());

    count_bars("File Status Distribution (Top 10)", "Count", counts, colors, false)
}

fn file_additions_boxplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    SingleDistribution {
        title: "File Additions - Box Plot",
        y_label: "Lines Added per File",
        tick: "Additions",
        fill: theme::LIGHT_GREEN,
        edge: theme::GREEN,
        median: theme::RED,
    }
    .boxplot(file_additions(ctx))
}

fn file_deletions_boxplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    SingleDistribution {
        title: "File Deletions - Box Plot",
        y_label: "Lines Deleted per File",
        tick: "Deletions",
        fill: theme::LIGHT_CORAL,
        edge: theme::RED,
        median: theme::BLUE,
    }
    .boxplot(file_deletions(ctx))
}

fn timeline_event_types_barplot(ctx: &FigureContext<'_>) -> Result<Figure> {
    let timeline = &ctx.dataset.timeline;
    timeline.require_column("event")?;

    let counts = top_k(timeline.rows.iter().map(|t| t.event.as_deref()), 15);
    let colors = theme::sample_palette(&theme::PAIRED, counts.len());

    count_bars("Top 15 Timeline Event Types", "Count", counts, colors, true)
}

// ---------------------------------------------------------------------------
// 31-39: per-agent entity figures
// ---------------------------------------------------------------------------

fn files_changed_by_agent(ctx: &FigureContext<'_>) -> Result<Figure> {
    const TITLE: &str = "Files Changed per PR by Agent";
    // Only PRs that have file details take part.
    let (series, population) = agent_series(
        ctx,
        |pr| {
            ctx.metrics
                .change_stats
                .get(&pr.id)
                .map(|s| s.files_changed as f64)
        },
        DisplayRange::clamp_upper(50.0),
    );
    if series.is_empty() {
        return Err(no_groups(TITLE));
    }

    Ok(Figure {
        title: TITLE.to_string(),
        subtitle: None,
        x_label: String::new(),
        y_label: "Files Changed".to_string(),
        size: FigureSize::WIDE,
        stats: Summary::of(&population),
        plot: Plot::Violin(ViolinPlot {
            slots: agent_slots(ctx),
            series,
            y_range: Some((0.0, 50.0)),
            edge: theme::BLACK,
        }),
    })
}

fn lines_added_by_agent(ctx: &FigureContext<'_>) -> Result<Figure> {
    const TITLE: &str = "Code Additions Distribution by Agent";
    let (series, population) = agent_series(
        ctx,
        |pr| ctx.metrics.change_stats.get(&pr.id).map(|s| s.additions),
        DisplayRange::clamp(1.0, 10000.0),
    );
    if series.is_empty() {
        return Err(no_groups(TITLE));
    }

    Ok(Figure {
        title: TITLE.to_string(),
        subtitle: None,
        x_label: String::new(),
        y_label: "Lines Added (log scale)".to_string(),
        size: FigureSize::WIDE,
        stats: Summary::of(&population),
        plot: Plot::Box(compact_boxes(series, true)),
    })
}

fn description_length_by_agent(ctx: &FigureContext<'_>) -> Result<Figure> {
    const TITLE: &str = "PR Description Length Distribution by Agent";
    let range = DisplayRange::clamp(0.0, 5000.0);
    let (series, population) = agent_series(ctx, |pr| Some(pr.body_length() as f64), range);
    if series.is_empty() {
        return Err(no_groups(TITLE));
    }

    Ok(Figure {
        title: TITLE.to_string(),
        subtitle: None,
        x_label: "PR Description Length (characters)".to_string(),
        y_label: "Frequency".to_string(),
        size: FigureSize::WIDE,
        stats: Summary::of(&population),
        plot: Plot::Histogram(HistogramPlot {
            series,
            bins: 50,
            window: range.bounds(),
            log_x: false,
            annotation: Vec::new(),
            legend: true,
        }),
    })
}

fn comment_intensity_by_agent(ctx: &FigureContext<'_>) -> Result<Figure> {
    const TITLE: &str = "Review Comment Intensity by Agent";
    let (series, population) = agent_series(
        ctx,
        |pr| Some(ctx.metrics.comment_count(&pr.id) as f64),
        DisplayRange::clamp_upper(30.0),
    );
    if series.is_empty() {
        return Err(no_groups(TITLE));
    }

    Ok(Figure {
        title: TITLE.to_string(),
        subtitle: None,
        x_label: String::new(),
        y_label: "Comments per PR".to_string(),
        size: FigureSize::WIDE,
        stats: Summary::of(&population),
        plot: Plot::Violin(ViolinPlot {
            slots: agent_slots(ctx),
            series,
            y_range: None,
            edge: theme::BLACK,
        }),
    })
}

fn time_to_merge_by_agent(ctx: &FigureContext<'_>) -> Result<Figure> {
    const TITLE: &str = "PR Merge Latency by Agent";
    // Clamp to one week in hours, then plot in days.
    let (mut series, population) = agent_series(
        ctx,
        |pr| {
            pr.time_to_merge_hours()
                .filter(|h| pr.is_merged() && *h > 0.0)
        },
        DisplayRange::clamp(0.0, 168.0),
    );
    if series.is_empty() {
        return Err(no_groups(TITLE));
    }
    for s in &mut series {
        s.values.iter_mut().for_each(|h| *h /= 24.0);
    }
    let days: Vec<f64> = population.iter().map(|h| h / 24.0).collect();

    Ok(Figure {
        title: TITLE.to_string(),
        subtitle: None,
        x_label: String::new(),
        y_label: "Time to Merge (days)".to_string(),
        size: FigureSize::WIDE,
        stats: Summary::of(&days),
        plot: Plot::Box(compact_boxes(series, false)),
    })
}

/// Box plots drop empty groups and close the gaps.
fn compact_boxes(series: Vec<Series>, log_y: bool) -> BoxPlot {
    let slots = series.iter().map(|s| s.label.clone()).collect();
    let series = series
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.at(i))
        .collect();

    BoxPlot {
        slots,
        series,
        show_outliers: false,
        log_y,
        edge: theme::BLACK,
        median: theme::RED,
    }
}

fn repository_popularity(ctx: &FigureContext<'_>) -> Result<Figure> {
    let repos = &ctx.dataset.repositories;
    repos.require_column("stars")?;

    AnnotatedHistogram {
        title: "Repository Popularity Distribution",
        x_label: "Repository Stars (log scale)",
        color: theme::FLAT_BLUE,
        range: DisplayRange::clamp(100.0, 10000.0),
        log_x: true,
    }
    .build(repos.rows.iter().filter_map(|r| r.stars).filter(|s| *s > 0.0).collect())
}

fn commit_message_verbosity(ctx: &FigureContext<'_>) -> Result<Figure> {
    AnnotatedHistogram {
        title: "Commit Message Verbosity Distribution",
        x_label: "Commit Message Length (characters)",
        color: theme::FLAT_PURPLE,
        range: DisplayRange::clamp(0.0, 500.0),
        log_x: false,
    }
    .build(
        ctx.dataset
            .commits
            .rows
            .iter()
            .map(|c| c.message_length() as f64)
            .collect(),
    )
}

fn developer_social_reach(ctx: &FigureContext<'_>) -> Result<Figure> {
    let users = &ctx.dataset.users;
    users.require_column("followers")?;

    AnnotatedHistogram {
        title: "Developer Social Reach Distribution",
        x_label: "User Followers (log scale)",
        color: theme::FLAT_CARROT,
        range: DisplayRange::clamp(1.0, 1000.0),
        log_x: true,
    }
    .build(users.rows.iter().filter_map(|u| u.followers).filter(|f| *f > 0.0).collect())
}

fn issue_description_detail(ctx: &FigureContext<'_>) -> Result<Figure> {
    AnnotatedHistogram {
        title: "Issue Description Detail Distribution",
        x_label: "Issue Body Length (characters)",
        color: theme::FLAT_SEA,
        range: DisplayRange::clamp(0.0, 5000.0),
        log_x: false,
    }
    .build(
        ctx.dataset
            .issues
            .rows
            .iter()
            .map(|i| i.body_length() as f64)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Commit, CommitFileDetail, Issue, RecordId, Repository, Table, User};
    use std::collections::BTreeSet;

    fn find(ordinal: u8) -> Option<&'static ChartEntry> {
        CATALOG.iter().find(|e| e.ordinal == ordinal)
    }

    fn table<T>(kind: TableKind, columns: &[&str], rows: Vec<T>) -> Table<T> {
        Table::new(kind, columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn build(ordinal: u8, dataset: &Dataset) -> Result<Figure> {
        let metrics = Metrics::compute(dataset);
        let agents = AgentsConfig::default();
        let ctx = FigureContext {
            dataset,
            metrics: &metrics,
            agents: &agents,
        };
        find(ordinal).unwrap().build(&ctx)
    }

    fn agent_pr(id: i64, agent: &str) -> PullRequest {
        PullRequest {
            id: RecordId::Int(id),
            agent: Some(agent.to_string()),
            body: Some("x".repeat(id as usize)),
            ..Default::default()
        }
    }

    fn detail(pr: i64, additions: f64) -> CommitFileDetail {
        CommitFileDetail {
            pr_id: Some(RecordId::Int(pr)),
            additions: Some(additions),
            deletions: Some(0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_catalog_ordinals_are_contiguous_and_unique() {
        for (i, entry) in CATALOG.iter().enumerate() {
            assert_eq!(entry.ordinal as usize, i + 1);
            assert!(!entry.tables.is_empty());
        }
        let slugs: BTreeSet<&str> = CATALOG.iter().map(|e| e.slug).collect();
        assert_eq!(slugs.len(), CATALOG.len());

        assert!(CATALOG[..30].iter().all(|e| e.batch == Batch::Distributions));
        assert!(CATALOG[30..].iter().all(|e| e.batch == Batch::Agents));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(find(1).unwrap().file_name(), "01_pr_files_changed_histogram.png");
        assert_eq!(find(39).unwrap().file_name(), "39_entity_issue_description_detail.png");
        assert!(find(40).is_none());
    }

    #[test]
    fn test_files_changed_histogram_stats() {
        let mut dataset = Dataset::default();
        let details: Vec<CommitFileDetail> = [(1, 2), (2, 5), (3, 5)]
            .iter()
            .flat_map(|(pr, n)| (0..*n).map(move |_| detail(*pr, 1.0)))
            .collect();
        dataset.commit_details = table(CommitDetails, &["pr_id", "additions"], details);

        let figure = build(1, &dataset).unwrap();
        assert_eq!(figure.subtitle.as_deref(), Some("Median: 5.0 | Mean: 4.0"));
        let stats = figure.stats.unwrap();
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.mean, 4.0);
    }

    #[test]
    fn test_commit_message_truncation_keeps_stats() {
        let mut dataset = Dataset::default();
        let commits = [0usize, 10, 20, 1000]
            .iter()
            .map(|n| Commit {
                pr_id: Some(RecordId::Int(1)),
                message: Some("m".repeat(*n)),
            })
            .collect();
        dataset.commits = table(Commits, &["pr_id", "message"], commits);

        let figure = build(12, &dataset).unwrap();
        let stats = figure.stats.unwrap();
        assert_eq!(stats.median, 15.0);
        assert_eq!(stats.mean, 257.5);

        match figure.plot {
            Plot::Histogram(h) => assert_eq!(h.series[0].values, vec![0.0, 10.0, 20.0]),
            other => panic!("unexpected plot: {}", other.kind()),
        }
    }

    #[test]
    fn test_missing_stars_skips_only_star_figures() {
        let mut dataset = Dataset::default();
        dataset.repositories = table(
            Repositories,
            &["forks", "language"],
            vec![Repository {
                stars: None,
                forks: Some(3.0),
                language: Some("Rust".to_string()),
            }],
        );

        for ordinal in [22, 36] {
            let err = build(ordinal, &dataset).unwrap_err();
            assert!(
                matches!(err, ReportError::MissingColumn { ref column, .. } if column == "stars")
            );
        }
        assert!(build(23, &dataset).is_ok());
        assert!(build(24, &dataset).is_ok());
    }

    #[test]
    fn test_state_bars_use_semantic_colors() {
        let mut dataset = Dataset::default();
        let prs = ["merged", "closed", "merged", "open"]
            .iter()
            .enumerate()
            .map(|(i, s)| PullRequest {
                id: RecordId::Int(i as i64),
                state: Some(s.to_string()),
                ..Default::default()
            })
            .collect();
        dataset.pull_requests = table(PullRequests, &["id", "state"], prs);

        let figure = build(9, &dataset).unwrap();
        let Plot::Bar(bars) = figure.plot else {
            panic!("expected bar chart");
        };
        assert_eq!(bars.bars[0].label, "merged");
        assert_eq!(bars.bars[0].value, 2);
        assert_eq!(bars.bars[0].color, theme::FLAT_GREEN);
        assert_eq!(bars.bars[1].color, theme::FLAT_RED);
        assert_eq!(bars.bars[2].color, theme::FLAT_BLUE);
    }

    #[test]
    fn test_top_15_languages() {
        let mut dataset = Dataset::default();
        let repos = (0..20)
            .flat_map(|i| {
                (0..=i).map(move |_| Repository {
                    language: Some(format!("lang{}", i)),
                    ..Default::default()
                })
            })
            .collect::<Vec<_>>();
        let total = repos.len();
        dataset.repositories = table(Repositories, &["language"], repos);

        let figure = build(24, &dataset).unwrap();
        let Plot::Bar(bars) = figure.plot else {
            panic!("expected bar chart");
        };
        assert!(bars.horizontal);
        assert_eq!(bars.bars.len(), 15);
        assert_eq!(bars.bars[0].label, "lang19");
        assert!(bars.bars.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(bars.bars.iter().map(|b| b.value).sum::<usize>() <= total);
    }

    #[test]
    fn test_agent_breakdown_skips_absent_agents() {
        let mut dataset = Dataset::default();
        dataset.pull_requests = table(
            PullRequests,
            &["id", "agent", "body"],
            vec![
                agent_pr(1, "Claude_Code"),
                agent_pr(2, "Cursor"),
                agent_pr(3, "Cursor"),
                agent_pr(4, "Human"),
            ],
        );
        dataset.commit_details = table(
            CommitDetails,
            &["pr_id", "additions"],
            vec![detail(1, 10.0), detail(2, 20.0), detail(3, 30.0), detail(4, 40.0)],
        );
        let agents = AgentsConfig::default();

        let violin = build(31, &dataset).unwrap();
        let Plot::Violin(v) = violin.plot else {
            panic!("expected violin plot");
        };
        assert_eq!(v.slots.len(), 5);
        let placed: Vec<(usize, Rgb)> = v.series.iter().map(|s| (s.position, s.color)).collect();
        assert_eq!(
            placed,
            vec![
                (0, agents.color_for("Claude_Code")),
                (1, agents.color_for("Cursor"))
            ]
        );

        let boxes = build(32, &dataset).unwrap();
        let Plot::Box(b) = boxes.plot else {
            panic!("expected box plot");
        };
        assert_eq!(b.slots, vec!["Claude Code", "Cursor"]);
        assert!(b.log_y);
        assert!(!b.show_outliers);
        assert_eq!(b.series[1].color, agents.color_for("Cursor"));

        let overlay = build(33, &dataset).unwrap();
        let Plot::Histogram(h) = overlay.plot else {
            panic!("expected histogram");
        };
        assert!(h.legend);
        assert_eq!(h.series.len(), 2);
    }

    #[test]
    fn test_no_agents_with_data_is_skipped() {
        let mut dataset = Dataset::default();
        dataset.pull_requests = table(PullRequests, &["id", "agent"], vec![agent_pr(1, "Human")]);

        let err = build(34, &dataset).unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_time_to_merge_in_days() {
        let mut dataset = Dataset::default();
        let pr = |id: i64, merged: Option<&str>| PullRequest {
            id: RecordId::Int(id),
            agent: Some("Devin".to_string()),
            created_at: Some("2025-01-01T00:00:00Z".parse().unwrap()),
            merged_at: merged.map(|m| m.parse().unwrap()),
            ..Default::default()
        };
        dataset.pull_requests = table(
            PullRequests,
            &["id", "agent", "created_at", "merged_at"],
            vec![
                pr(1, Some("2025-01-02T00:00:00Z")),
                pr(2, Some("2025-02-01T00:00:00Z")),
                pr(3, None),
                pr(4, Some("2025-01-01T00:00:00Z")),
            ],
        );

        let figure = build(35, &dataset).unwrap();
        let Plot::Box(b) = figure.plot else {
            panic!("expected box plot");
        };
        // One day, and 31 days clamped to 7.
        assert_eq!(b.series[0].values, vec![1.0, 7.0]);
        assert_eq!(figure.stats.unwrap().count, 2);
    }

    #[test]
    fn test_annotated_histograms() {
        let mut dataset = Dataset::default();
        dataset.users = table(
            Users,
            &["followers"],
            vec![
                User { followers: Some(0.0) },
                User { followers: Some(10.0) },
                User { followers: Some(5000.0) },
            ],
        );
        dataset.issues = table(
            Issues,
            &["body"],
            vec![Issue { body: None }, Issue { body: Some("abcd".to_string()) }],
        );

        let reach = build(38, &dataset).unwrap();
        assert_eq!(reach.stats.unwrap().count, 2);
        let Plot::Histogram(h) = reach.plot else {
            panic!("expected histogram");
        };
        assert!(h.log_x);
        assert_eq!(h.series[0].values, vec![10.0, 1000.0]);
        assert_eq!(h.annotation, vec!["Median: 2505", "Mean: 2505"]);

        let issues = build(39, &dataset).unwrap();
        assert_eq!(issues.stats.unwrap().median, 2.0);
    }

    #[test]
    fn test_empty_table_is_skipped_not_failed() {
        let dataset = Dataset::default();
        for entry in CATALOG.iter() {
            if let Err(err) = build(entry.ordinal, &dataset) {
                assert!(err.is_skip(), "figure {} failed: {}", entry.ordinal, err);
            }
        }
    }
}
