//! Per-entity metrics derived once from the loaded dataset.

use crate::analysis::aggregator::{change_stats_by_pr, count_by, counts_as_series, ChangeStats};
use crate::models::{Dataset, RecordId};
use std::collections::BTreeMap;
use tracing::debug;

/// Grouped counts and sums shared by several figures.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub change_stats: BTreeMap<RecordId, ChangeStats>,
    pub commits_per_pr: BTreeMap<RecordId, usize>,
    pub reviews_per_pr: BTreeMap<RecordId, usize>,
    pub comments_per_pr: BTreeMap<RecordId, usize>,
    pub timeline_events_per_pr: BTreeMap<RecordId, usize>,
    pub prs_per_user: BTreeMap<RecordId, usize>,
    pub prs_per_repo: BTreeMap<RecordId, usize>,
}

impl Metrics {
    pub fn compute(dataset: &Dataset) -> Self {
        let prs = &dataset.pull_requests;
        // Repositories are keyed by URL when the source carries one.
        let prs_per_repo = if prs.has_column("repo_url") {
            count_by(&prs.rows, |pr| pr.repo_url.as_deref().map(RecordId::from))
        } else {
            count_by(&prs.rows, |pr| pr.repo_id.clone())
        };

        let metrics = Self {
            change_stats: change_stats_by_pr(&dataset.commit_details.rows),
            commits_per_pr: count_by(&dataset.commits.rows, |c| c.pr_id.clone()),
            reviews_per_pr: count_by(&dataset.reviews.rows, |r| r.pr_id.clone()),
            comments_per_pr: count_by(&dataset.comments.rows, |c| c.pr_id.clone()),
            timeline_events_per_pr: count_by(&dataset.timeline.rows, |t| t.pr_id.clone()),
            prs_per_user: count_by(&prs.rows, |pr| pr.user.clone()),
            prs_per_repo,
        };

        debug!(
            "Computed metrics: {} PRs with file details, {} with commits, {} users, {} repos",
            metrics.change_stats.len(),
            metrics.commits_per_pr.len(),
            metrics.prs_per_user.len(),
            metrics.prs_per_repo.len()
        );

        metrics
    }

    pub fn files_per_pr(&self) -> Vec<f64> {
        self.change_stats
            .values()
            .map(|s| s.files_changed as f64)
            .collect()
    }

    pub fn additions_per_pr(&self) -> Vec<f64> {
        self.change_stats.values().map(|s| s.additions).collect()
    }

    pub fn deletions_per_pr(&self) -> Vec<f64> {
        self.change_stats.values().map(|s| s.deletions).collect()
    }

    pub fn changes_per_pr(&self) -> Vec<f64> {
        self.change_stats.values().map(|s| s.total_changes()).collect()
    }

    pub fn commits_series(&self) -> Vec<f64> {
        counts_as_series(&self.commits_per_pr)
    }

    pub fn reviews_series(&self) -> Vec<f64> {
        counts_as_series(&self.reviews_per_pr)
    }

    pub fn comments_series(&self) -> Vec<f64> {
        counts_as_series(&self.comments_per_pr)
    }

    pub fn timeline_series(&self) -> Vec<f64> {
        counts_as_series(&self.timeline_events_per_pr)
    }

    /// Comments on one PR; PRs without comments count zero.
    pub fn comment_count(&self, pr: &RecordId) -> usize {
        self.comments_per_pr.get(pr).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, CommitFileDetail, PullRequest, Table, TableKind};

    fn table<T>(kind: TableKind, columns: &[&str], rows: Vec<T>) -> Table<T> {
        Table::new(kind, columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn pr(id: i64, user: &str, repo_id: i64, repo_url: Option<&str>) -> PullRequest {
        PullRequest {
            id: RecordId::Int(id),
            user: Some(RecordId::from(user)),
            repo_id: Some(RecordId::Int(repo_id)),
            repo_url: repo_url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_prs_per_repo_prefers_url() {
        let mut dataset = Dataset::default();
        dataset.pull_requests = table(
            TableKind::PullRequests,
            &["id", "user", "repo_id", "repo_url"],
            vec![
                pr(1, "alice", 10, Some("https://x/a")),
                pr(2, "alice", 11, Some("https://x/a")),
                pr(3, "bob", 12, Some("https://x/b")),
            ],
        );

        let metrics = Metrics::compute(&dataset);
        assert_eq!(metrics.prs_per_repo.len(), 2);
        assert_eq!(metrics.prs_per_user.get(&RecordId::from("alice")), Some(&2));
    }

    #[test]
    fn test_prs_per_repo_falls_back_to_id() {
        let mut dataset = Dataset::default();
        dataset.pull_requests = table(
            TableKind::PullRequests,
            &["id", "user", "repo_id"],
            vec![pr(1, "alice", 10, None), pr(2, "bob", 10, None)],
        );

        let metrics = Metrics::compute(&dataset);
        assert_eq!(metrics.prs_per_repo.get(&RecordId::Int(10)), Some(&2));
    }

    #[test]
    fn test_series_and_comment_join() {
        let mut dataset = Dataset::default();
        dataset.commit_details = table(
            TableKind::CommitDetails,
            &["pr_id", "additions", "deletions"],
            vec![
                CommitFileDetail {
                    pr_id: Some(RecordId::Int(1)),
                    additions: Some(4.0),
                    deletions: Some(1.0),
                    ..Default::default()
                },
                CommitFileDetail {
                    pr_id: Some(RecordId::Int(1)),
                    additions: Some(6.0),
                    deletions: None,
                    ..Default::default()
                },
            ],
        );
        dataset.comments = table(
            TableKind::Comments,
            &["pr_id", "body"],
            vec![
                Comment {
                    pr_id: Some(RecordId::Int(1)),
                    body: Some("lgtm".to_string()),
                },
                Comment {
                    pr_id: None,
                    body: Some("orphan".to_string()),
                },
            ],
        );

        let metrics = Metrics::compute(&dataset);
        assert_eq!(metrics.files_per_pr(), vec![2.0]);
        assert_eq!(metrics.additions_per_pr(), vec![10.0]);
        assert_eq!(metrics.changes_per_pr(), vec![11.0]);
        assert_eq!(metrics.comment_count(&RecordId::Int(1)), 1);
        assert_eq!(metrics.comment_count(&RecordId::Int(2)), 0);
        assert_eq!(metrics.comments_series(), vec![1.0]);
    }
}
