//! Grouping and aggregation over loaded tables.
//!
//! This module provides the group-by-and-count/sum primitives the figures
//! are built from, plus per-PR change statistics and categorical value
//! counts.

use crate::models::{CommitFileDetail, PullRequest, RecordId};
use std::collections::{BTreeMap, HashMap};

/// Count records per key. Records whose key is `None` are dropped.
pub fn count_by<'a, T, K, F>(records: &'a [T], key: F) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(&'a T) -> Option<K>,
{
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();

    for record in records {
        if let Some(k) = key(record) {
            *counts.entry(k).or_default() += 1;
        }
    }

    counts
}

/// Sum a numeric field per key. Null values contribute zero.
pub fn sum_by<'a, T, K, F, V>(records: &'a [T], key: F, value: V) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&'a T) -> Option<K>,
    V: Fn(&'a T) -> Option<f64>,
{
    let mut sums: BTreeMap<K, f64> = BTreeMap::new();

    for record in records {
        if let Some(k) = key(record) {
            *sums.entry(k).or_default() += value(record).unwrap_or(0.0);
        }
    }

    sums
}

/// Values of a grouped count as a numeric series.
pub fn counts_as_series<K>(counts: &BTreeMap<K, usize>) -> Vec<f64> {
    counts.values().map(|c| *c as f64).collect()
}

/// Frequency of each distinct non-null value, most frequent first.
///
/// Ties keep the order in which values were first seen.
pub fn value_counts<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in values.into_iter().flatten() {
        match index.get(value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.to_string(), order.len());
                order.push((value.to_string(), 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    order
}

/// The `k` most frequent values.
pub fn top_k<'a, I>(values: I, k: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = value_counts(values);
    counts.truncate(k);
    counts
}

/// File-level change totals for one PR.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChangeStats {
    pub files_changed: usize,
    pub additions: f64,
    pub deletions: f64,
}

impl ChangeStats {
    pub fn total_changes(&self) -> f64 {
        self.additions + self.deletions
    }
}

/// Aggregate commit file details per PR: file count and line sums.
pub fn change_stats_by_pr(details: &[CommitFileDetail]) -> BTreeMap<RecordId, ChangeStats> {
    let pr_key = |d: &CommitFileDetail| d.pr_id.clone();
    let files = count_by(details, pr_key);
    let additions = sum_by(details, pr_key, |d| d.additions);
    let deletions = sum_by(details, pr_key, |d| d.deletions);

    files
        .into_iter()
        .map(|(pr_id, files_changed)| {
            let stats = ChangeStats {
                files_changed,
                additions: additions.get(&pr_id).copied().unwrap_or(0.0),
                deletions: deletions.get(&pr_id).copied().unwrap_or(0.0),
            };
            (pr_id, stats)
        })
        .collect()
}

/// Group PRs by agent, keeping only agents in `order`, in that order.
///
/// Every agent in `order` gets an entry, possibly empty.
pub fn group_prs_by_agent<'a>(
    prs: &'a [PullRequest],
    order: &[String],
) -> Vec<(String, Vec<&'a PullRequest>)> {
    let mut grouped: HashMap<&str, Vec<&'a PullRequest>> = HashMap::new();

    for pr in prs {
        if let Some(agent) = pr.agent.as_deref() {
            grouped.entry(agent).or_default().push(pr);
        }
    }

    order
        .iter()
        .map(|agent| {
            let members = grouped.remove(agent.as_str()).unwrap_or_default();
            (agent.clone(), members)
        })
        .collect()
}

/// How a series is restricted to a display range before plotting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayRange {
    /// Drop values outside `[lo, hi]`.
    Truncate { lo: Option<f64>, hi: f64 },
    /// Saturate values to `[lo, hi]`.
    Clamp { lo: Option<f64>, hi: f64 },
}

impl DisplayRange {
    pub fn at_most(hi: f64) -> Self {
        DisplayRange::Truncate { lo: None, hi }
    }

    pub fn clamp(lo: f64, hi: f64) -> Self {
        DisplayRange::Clamp { lo: Some(lo), hi }
    }

    pub fn clamp_upper(hi: f64) -> Self {
        DisplayRange::Clamp { lo: None, hi }
    }

    /// The `[lo, hi]` window; an open lower end starts at zero.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            DisplayRange::Truncate { lo, hi } | DisplayRange::Clamp { lo, hi } => {
                (lo.unwrap_or(0.0), hi)
            }
        }
    }

    /// Apply the range to a series, returning the values to plot.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        match *self {
            DisplayRange::Truncate { lo, hi } => values
                .iter()
                .copied()
                .filter(|x| *x <= hi && lo.map_or(true, |lo| *x >= lo))
                .collect(),
            DisplayRange::Clamp { lo, hi } => values
                .iter()
                .map(|x| {
                    let x = lo.map_or(*x, |lo| x.max(lo));
                    x.min(hi)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::Summary;

    fn detail(pr: i64, additions: f64, deletions: Option<f64>) -> CommitFileDetail {
        CommitFileDetail {
            pr_id: Some(RecordId::Int(pr)),
            additions: Some(additions),
            deletions,
            status: None,
        }
    }

    #[test]
    fn test_count_by_drops_null_keys() {
        let keys = vec![Some("a"), Some("b"), None, Some("a")];
        let counts = count_by(&keys, |k| *k);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_change_stats_by_pr() {
        let details = vec![
            detail(1, 10.0, Some(2.0)),
            detail(1, 5.0, None),
            detail(2, 1.0, Some(1.0)),
        ];
        let stats = change_stats_by_pr(&details);
        let pr1 = stats[&RecordId::Int(1)];
        assert_eq!(pr1.files_changed, 2);
        assert_eq!(pr1.additions, 15.0);
        assert_eq!(pr1.deletions, 2.0);
        assert_eq!(pr1.total_changes(), 17.0);
        assert_eq!(stats[&RecordId::Int(2)].files_changed, 1);
    }

    #[test]
    fn test_files_changed_scenario() {
        let details: Vec<CommitFileDetail> = [(1, 2), (2, 5), (3, 5)]
            .iter()
            .flat_map(|(pr, n)| (0..*n).map(move |_| detail(*pr, 1.0, None)))
            .collect();
        let files = count_by(&details, |d| d.pr_id.clone());
        let summary = Summary::of(&counts_as_series(&files)).unwrap();
        assert_eq!(summary.median, 5.0);
        assert_eq!(format!("{:.1}", summary.mean), "4.0");
    }

    #[test]
    fn test_change_stats_skip_null_pr_ids() {
        let mut orphan = detail(9, 100.0, Some(100.0));
        orphan.pr_id = None;
        let details = vec![detail(1, 10.0, Some(2.0)), orphan];

        let stats = change_stats_by_pr(&details);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&RecordId::Int(1)].total_changes(), 12.0);
    }

    #[test]
    fn test_sum_by() {
        let details = vec![detail(1, 10.0, Some(3.0)), detail(1, 5.0, None)];
        let sums = sum_by(&details, |d| d.pr_id.clone(), |d| d.deletions);
        assert_eq!(sums[&RecordId::Int(1)], 3.0);
    }

    #[test]
    fn test_top_k_order_and_ties() {
        let values = ["b", "a", "a", "c", "b", "d", "a"];
        let top = top_k(values.iter().map(|v| Some(*v)), 3);
        assert_eq!(
            top,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
        let total: usize = top.iter().map(|(_, c)| c).sum();
        assert!(total <= values.len());
    }

    #[test]
    fn test_value_counts_skips_nulls() {
        let counts = value_counts(vec![Some("open"), None, Some("open")]);
        assert_eq!(counts, vec![("open".to_string(), 2)]);
    }

    #[test]
    fn test_group_prs_by_agent_keeps_order() {
        let prs: Vec<PullRequest> = ["Cursor", "Claude_Code", "Human", "Cursor"]
            .iter()
            .enumerate()
            .map(|(i, a)| PullRequest {
                id: RecordId::Int(i as i64),
                agent: Some(a.to_string()),
                ..Default::default()
            })
            .collect();
        let order: Vec<String> = ["Claude_Code", "Cursor", "Devin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let groups = group_prs_by_agent(&prs, &order);
        let sizes: Vec<(&str, usize)> = groups.iter().map(|(a, g)| (a.as_str(), g.len())).collect();
        assert_eq!(sizes, vec![("Claude_Code", 1), ("Cursor", 2), ("Devin", 0)]);
    }

    #[test]
    fn test_truncate_excludes_but_stats_keep_everything() {
        let lengths = [0.0, 10.0, 20.0, 1000.0];
        let plotted = DisplayRange::at_most(500.0).apply(&lengths);
        assert_eq!(plotted, vec![0.0, 10.0, 20.0]);

        let summary = Summary::of(&lengths).unwrap();
        assert_eq!(summary.median, 15.0);
        assert_eq!(summary.mean, 257.5);
    }

    #[test]
    fn test_clamp_saturates() {
        let clamped = DisplayRange::clamp(1.0, 100.0).apply(&[0.0, 50.0, 500.0]);
        assert_eq!(clamped, vec![1.0, 50.0, 100.0]);
        let upper = DisplayRange::clamp_upper(30.0).apply(&[0.0, 31.0]);
        assert_eq!(upper, vec![0.0, 30.0]);
    }

    #[test]
    fn test_display_bounds() {
        assert_eq!(DisplayRange::at_most(50.0).bounds(), (0.0, 50.0));
        assert_eq!(DisplayRange::clamp(1.0, 10000.0).bounds(), (1.0, 10000.0));
        assert_eq!(DisplayRange::clamp_upper(168.0).bounds(), (0.0, 168.0));
    }
}
