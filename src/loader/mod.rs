//! Dataset loading.
//!
//! Each table lives in its own file under the data directory, either as
//! JSON Lines (`<stem>.jsonl`) or as a JSON array (`<stem>.json`). The
//! loader records which columns a source actually carries so optional
//! figures can be skipped when a column is absent.

use crate::error::{ReportError, Result};
use crate::models::{Dataset, Table, TableKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions tried, in order, when resolving a table's file.
const EXTENSIONS: [&str; 2] = ["jsonl", "json"];

/// Configuration for locating dataset files.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directory holding one file per table.
    pub data_dir: PathBuf,
    /// File stem per table (without extension).
    pub stems: BTreeMap<TableKind, String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            stems: TableKind::ALL
                .iter()
                .map(|k| (*k, k.default_stem().to_string()))
                .collect(),
        }
    }
}

impl From<&crate::config::DataConfig> for LoadConfig {
    fn from(config: &crate::config::DataConfig) -> Self {
        let mut stems: BTreeMap<TableKind, String> = BTreeMap::new();
        for kind in TableKind::ALL {
            let stem = config
                .sources
                .get(kind.config_key())
                .cloned()
                .unwrap_or_else(|| kind.default_stem().to_string());
            stems.insert(kind, stem);
        }

        Self {
            data_dir: PathBuf::from(&config.data_dir),
            stems,
        }
    }
}

/// Loader for the dataset tables.
pub struct DatasetLoader {
    config: LoadConfig,
}

impl DatasetLoader {
    /// Create a new loader.
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    fn stem(&self, kind: TableKind) -> &str {
        self.config
            .stems
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_stem())
    }

    /// Path a table would be read from, whether or not it exists.
    pub fn expected_path(&self, kind: TableKind) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.{}", self.stem(kind), EXTENSIONS[0]))
    }

    /// Find the file backing `kind`, if any.
    pub fn resolve(&self, kind: TableKind) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.config.data_dir.join(format!("{}.{}", self.stem(kind), ext)))
            .find(|path| path.is_file())
    }

    /// Load a single table, failing if its source is unavailable.
    pub fn load_table<T: DeserializeOwned>(&self, kind: TableKind) -> Result<Table<T>> {
        let path = self.resolve(kind).ok_or_else(|| ReportError::MissingSource {
            table: self.stem(kind).to_string(),
            path: self.expected_path(kind),
        })?;

        debug!("Reading {} from {}", kind, path.display());
        let content = fs::read_to_string(&path)?;

        let objects = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            parse_json_array(kind, &content)?
        } else {
            parse_json_lines(kind, &content)?
        };

        let mut columns = BTreeSet::new();
        let mut rows = Vec::with_capacity(objects.len());

        for (line, object) in objects {
            columns.extend(object.keys().cloned());
            let row = serde_json::from_value::<T>(Value::Object(object)).map_err(|e| {
                ReportError::Parse {
                    table: kind.to_string(),
                    line,
                    message: e.to_string(),
                }
            })?;
            rows.push(row);
        }

        debug!("Loaded {} rows, {} columns from {}", rows.len(), columns.len(), kind);
        Ok(Table::new(kind, columns, rows))
    }

    /// Load a table that may be absent; absence yields an empty table.
    fn load_optional<T: DeserializeOwned>(&self, kind: TableKind) -> Result<Table<T>> {
        if self.resolve(kind).is_none() {
            debug!("Optional table {} not present, using empty table", kind);
            return Ok(Table::empty(kind));
        }
        self.load_table(kind)
    }

    fn load_kind<T: DeserializeOwned>(
        &self,
        kind: TableKind,
        required: &BTreeSet<TableKind>,
    ) -> Result<Table<T>> {
        if required.contains(&kind) {
            let table = self.load_table(kind)?;
            if table.is_empty() {
                warn!("Table {} has no rows; its figures will be skipped", kind);
            }
            Ok(table)
        } else {
            self.load_optional(kind)
        }
    }

    /// Load every table. Tables in `required` must exist.
    pub fn load(&self, required: &BTreeSet<TableKind>) -> Result<Dataset> {
        info!("Loading datasets from {}", self.config.data_dir.display());

        let dataset = Dataset {
            pull_requests: self.load_kind(TableKind::PullRequests, required)?,
            repositories: self.load_kind(TableKind::Repositories, required)?,
            users: self.load_kind(TableKind::Users, required)?,
            comments: self.load_kind(TableKind::Comments, required)?,
            reviews: self.load_kind(TableKind::Reviews, required)?,
            commits: self.load_kind(TableKind::Commits, required)?,
            commit_details: self.load_kind(TableKind::CommitDetails, required)?,
            timeline: self.load_kind(TableKind::Timeline, required)?,
            issues: self.load_kind(TableKind::Issues, required)?,
        };

        info!(
            "Loaded {} PRs, {} repos, {} users",
            dataset.pull_requests.len(),
            dataset.repositories.len(),
            dataset.users.len()
        );

        Ok(dataset)
    }

    /// The data directory this loader reads from.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
}

/// Parse JSON Lines content into (line number, object) pairs.
fn parse_json_lines(kind: TableKind, content: &str) -> Result<Vec<(usize, Map<String, Value>)>> {
    let mut objects = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|e| ReportError::Parse {
            table: kind.to_string(),
            line: line_no,
            message: e.to_string(),
        })?;

        objects.push((line_no, into_object(kind, line_no, value)?));
    }

    Ok(objects)
}

/// Parse a JSON array of objects; "line" numbers are 1-based array indices.
fn parse_json_array(kind: TableKind, content: &str) -> Result<Vec<(usize, Map<String, Value>)>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(content).map_err(|e| ReportError::Parse {
        table: kind.to_string(),
        line: e.line(),
        message: e.to_string(),
    })?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Ok((i + 1, into_object(kind, i + 1, item)?)))
            .collect(),
        _ => Err(ReportError::Parse {
            table: kind.to_string(),
            line: 1,
            message: "expected a JSON array of records".to_string(),
        }),
    }
}

fn into_object(kind: TableKind, line: usize, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ReportError::Parse {
            table: kind.to_string(),
            line,
            message: format!("expected an object, found {}", json_type_name(&other)),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
