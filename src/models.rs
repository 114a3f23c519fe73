//! Data models for the dataset tables.
//!
//! Records are deserialized once at load time and never mutated. Optional
//! columns are `Option` fields; whether a column exists at all in a source
//! is tracked separately by [`Table`], so "column absent" and "cell null"
//! stay distinguishable.

use crate::error::{ReportError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// Identifier cell that may be stored as an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// The named tabular sources the tool knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    PullRequests,
    Repositories,
    Users,
    Comments,
    Reviews,
    Commits,
    CommitDetails,
    Timeline,
    Issues,
}

impl TableKind {
    pub const ALL: [TableKind; 9] = [
        TableKind::PullRequests,
        TableKind::Repositories,
        TableKind::Users,
        TableKind::Comments,
        TableKind::Reviews,
        TableKind::Commits,
        TableKind::CommitDetails,
        TableKind::Timeline,
        TableKind::Issues,
    ];

    /// Default file stem of the source, matching the published dataset.
    pub fn default_stem(&self) -> &'static str {
        match self {
            TableKind::PullRequests => "pull_request",
            TableKind::Repositories => "repository",
            TableKind::Users => "user",
            TableKind::Comments => "pr_comments",
            TableKind::Reviews => "pr_reviews",
            TableKind::Commits => "pr_commits",
            TableKind::CommitDetails => "pr_commit_details",
            TableKind::Timeline => "pr_timeline",
            TableKind::Issues => "issue",
        }
    }

    /// Key used for this table in the `[data.sources]` config section.
    pub fn config_key(&self) -> &'static str {
        match self {
            TableKind::PullRequests => "pull_requests",
            TableKind::Repositories => "repositories",
            TableKind::Users => "users",
            TableKind::Comments => "comments",
            TableKind::Reviews => "reviews",
            TableKind::Commits => "commits",
            TableKind::CommitDetails => "commit_details",
            TableKind::Timeline => "timeline",
            TableKind::Issues => "issues",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_stem())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub id: RecordId,
    pub user: Option<RecordId>,
    pub repo_id: Option<RecordId>,
    pub repo_url: Option<String>,
    pub agent: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn title_length(&self) -> usize {
        text_length(self.title.as_deref())
    }

    pub fn body_length(&self) -> usize {
        text_length(self.body.as_deref())
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Hours between creation and merge, when both timestamps exist.
    pub fn time_to_merge_hours(&self) -> Option<f64> {
        let created = self.created_at?;
        let merged = self.merged_at?;
        Some((merged - created).num_milliseconds() as f64 / 3_600_000.0)
    }
}

/// Naive layouts accepted for timestamp cells, read as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp string: RFC 3339, a naive date-time, or a bare date.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Timestamp cell that never fails the row: strings go through
/// [`parse_timestamp`], numbers are epoch milliseconds, anything else is null.
fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(raw) => raw,
    };

    let parsed = match &raw {
        Value::String(text) => parse_timestamp(text),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };

    if parsed.is_none() {
        warn!("Unrecognized timestamp {}, treating it as null", raw);
    }
    Ok(parsed)
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::Int(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    pub pr_id: Option<RecordId>,
    pub message: Option<String>,
}

impl Commit {
    pub fn message_length(&self) -> usize {
        text_length(self.message.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitFileDetail {
    pub pr_id: Option<RecordId>,
    pub additions: Option<f64>,
    pub deletions: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Review {
    pub pr_id: Option<RecordId>,
    pub body: Option<String>,
    pub state: Option<String>,
}

impl Review {
    pub fn body_length(&self) -> usize {
        text_length(self.body.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Comment {
    pub pr_id: Option<RecordId>,
    pub body: Option<String>,
}

impl Comment {
    pub fn body_length(&self) -> usize {
        text_length(self.body.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineEvent {
    pub pr_id: Option<RecordId>,
    pub event: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub followers: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub stars: Option<f64>,
    pub forks: Option<f64>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    pub body: Option<String>,
}

impl Issue {
    pub fn body_length(&self) -> usize {
        text_length(self.body.as_deref())
    }
}

/// Character count of an optional text cell; null counts as empty.
pub fn text_length(text: Option<&str>) -> usize {
    text.map(|t| t.chars().count()).unwrap_or(0)
}

/// A loaded table: its rows plus the set of columns seen in the source.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub kind: TableKind,
    pub columns: BTreeSet<String>,
    pub rows: Vec<T>,
}

impl<T> Table<T> {
    pub fn new(kind: TableKind, columns: BTreeSet<String>, rows: Vec<T>) -> Self {
        Self {
            kind,
            columns,
            rows,
        }
    }

    /// A table that was not loaded (no rows, no columns).
    pub fn empty(kind: TableKind) -> Self {
        Self::new(kind, BTreeSet::new(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Fail with [`ReportError::MissingColumn`] unless `column` is present.
    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(ReportError::MissingColumn {
                table: self.kind.to_string(),
                column: column.to_string(),
            })
        }
    }
}

/// All tables, loaded once and shared read-only by every figure.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub pull_requests: Table<PullRequest>,
    pub repositories: Table<Repository>,
    pub users: Table<User>,
    pub comments: Table<Comment>,
    pub reviews: Table<Review>,
    pub commits: Table<Commit>,
    pub commit_details: Table<CommitFileDetail>,
    pub timeline: Table<TimelineEvent>,
    pub issues: Table<Issue>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            pull_requests: Table::empty(TableKind::PullRequests),
            repositories: Table::empty(TableKind::Repositories),
            users: Table::empty(TableKind::Users),
            comments: Table::empty(TableKind::Comments),
            reviews: Table::empty(TableKind::Reviews),
            commits: Table::empty(TableKind::Commits),
            commit_details: Table::empty(TableKind::CommitDetails),
            timeline: Table::empty(TableKind::Timeline),
            issues: Table::empty(TableKind::Issues),
        }
    }
}

impl Dataset {
    /// Row count per table, in catalog order.
    pub fn row_counts(&self) -> Vec<(TableKind, usize)> {
        vec![
            (TableKind::PullRequests, self.pull_requests.len()),
            (TableKind::Repositories, self.repositories.len()),
            (TableKind::Users, self.users.len()),
            (TableKind::Comments, self.comments.len()),
            (TableKind::Reviews, self.reviews.len()),
            (TableKind::Commits, self.commits.len()),
            (TableKind::CommitDetails, self.commit_details.len()),
            (TableKind::Timeline, self.timeline.len()),
            (TableKind::Issues, self.issues.len()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_int_and_string() {
        let int: RecordId = serde_json::from_str("42").unwrap();
        let text: RecordId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(int, RecordId::Int(42));
        assert_eq!(text, RecordId::Text("abc".to_string()));
        assert_eq!(int.to_string(), "42");
    }

    #[test]
    fn test_text_length_counts_characters() {
        assert_eq!(text_length(None), 0);
        assert_eq!(text_length(Some("")), 0);
        assert_eq!(text_length(Some("héllo")), 5);
    }

    #[test]
    fn test_time_to_merge() {
        let pr: PullRequest = serde_json::from_str(
            r#"{"id": 1, "created_at": "2025-01-01T00:00:00Z", "merged_at": "2025-01-02T06:00:00Z"}"#,
        )
        .unwrap();
        assert!(pr.is_merged());
        assert_eq!(pr.time_to_merge_hours(), Some(30.0));

        let open: PullRequest = serde_json::from_str(
            r#"{"id": 2, "created_at": "2025-01-01T00:00:00Z", "merged_at": null}"#,
        )
        .unwrap();
        assert!(!open.is_merged());
        assert_eq!(open.time_to_merge_hours(), None);
    }

    #[test]
    fn test_require_column() {
        let table: Table<Repository> = Table::new(
            TableKind::Repositories,
            ["forks".to_string()].into_iter().collect(),
            vec![],
        );
        assert!(table.require_column("forks").is_ok());
        let err = table.require_column("stars").unwrap_err();
        assert!(err.is_skip());
        assert!(err.to_string().contains("repository"));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-01T10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-01 10:00:00.250"),
            Some(expected + chrono::Duration::milliseconds(250))
        );
        assert_eq!(
            parse_timestamp("2025-01-01"),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn test_pull_request_timestamps_are_lenient() {
        let pr: PullRequest = serde_json::from_str(
            r#"{"id": 1, "created_at": "2025-01-01 10:00:00", "merged_at": 1735736400000}"#,
        )
        .unwrap();
        assert_eq!(
            pr.created_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            pr.merged_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 13, 0, 0).unwrap())
        );
        assert_eq!(pr.time_to_merge_hours(), Some(3.0));

        let odd: PullRequest =
            serde_json::from_str(r#"{"id": 2, "created_at": "soon", "merged_at": true}"#).unwrap();
        assert_eq!(odd.created_at, None);
        assert_eq!(odd.merged_at, None);

        let absent: PullRequest = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(absent.created_at, None);
    }

    #[test]
    fn test_null_pr_id_deserializes() {
        let comment: Comment = serde_json::from_str(r#"{"pr_id": null, "body": "hi"}"#).unwrap();
        assert_eq!(comment.pr_id, None);
        let comment: Comment = serde_json::from_str(r#"{"pr_id": "7"}"#).unwrap();
        assert_eq!(comment.pr_id, Some(RecordId::from("7")));
    }
}
