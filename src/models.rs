//! Core Data Models
//!
//! This module defines the data structures that flow through the module-usage
//! counting pipeline, from a single matched log line to the ranked report rows.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`UsageEvent`] - one `module load` record matched in a log line
//! 2. **Deduplication**: [`GroupKey`] - the unique (group, module, entity) triple an event
//!    contributes, collected per file into a [`FileResult`]
//! 3. **Output**: [`ModuleCount`] / [`UsageCounts`] - merged counts, ranked for reports
//!
//! ## Modes
//!
//! - [`CountMode`] picks the entity being counted: distinct users or distinct jobs.
//! - [`GroupMode`] picks how counts are grouped: not at all, by module category, or by
//!   the first directory of the module path.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// One `module load` record.
///
/// Lines in the minimal format only carry the common fields; `extended` is
/// `Some` when the line matched the richer format with category and job data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    /// Seconds since the epoch, still as written in the log.
    pub timestamp: String,
    pub host: String,
    pub user: String,
    pub action: String,
    /// Module name and version as found in the log, e.g. `gcc/12.2.0`.
    pub module: String,
    pub path: String,
    pub extended: Option<ExtendedFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedFields {
    pub category: String,
    pub version: String,
    pub shell: String,
    /// Always all-digit; the grammar rejects anything else.
    pub job_id: String,
    pub job_account: String,
    pub job_partition: String,
}

impl UsageEvent {
    /// Timestamp as a float, or `None` when the field is not a number.
    pub fn timestamp_secs(&self) -> Option<f64> {
        self.timestamp.parse::<f64>().ok()
    }

    pub fn is_extended(&self) -> bool {
        self.extended.is_some()
    }

    pub fn category(&self) -> Option<&str> {
        self.extended.as_ref().map(|ext| ext.category.as_str())
    }

    pub fn job_id(&self) -> Option<&str> {
        self.extended.as_ref().map(|ext| ext.job_id.as_str())
    }
}

/// What a distinct load is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    Users,
    #[default]
    Jobs,
}

impl CountMode {
    pub fn noun(&self) -> &'static str {
        match self {
            CountMode::Users => "users",
            CountMode::Jobs => "jobs",
        }
    }
}

/// How counts are grouped before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
pub enum GroupMode {
    #[default]
    #[value(skip)]
    #[serde(rename = "none")]
    None,
    #[value(name = "cat")]
    #[serde(rename = "cat")]
    Category,
    #[value(name = "path")]
    #[serde(rename = "path")]
    PathPrefix,
}

/// Grouping part of a [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    None,
    Category(String),
    PathPrefix(String),
}

impl Group {
    pub fn label(&self) -> Option<&str> {
        match self {
            Group::None => None,
            Group::Category(name) | Group::PathPrefix(name) => Some(name),
        }
    }
}

/// Entity part of a [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    User(String),
    Job(String),
}

/// Deduplication unit: the same key seen twice is one load.
///
/// Components are compared as raw strings, with no case or whitespace
/// normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub group: Group,
    pub module: String,
    pub entity: Entity,
}

impl GroupKey {
    /// Builds the key for `event` under the given modes.
    ///
    /// Returns `None` when the event lacks a field the key needs: category
    /// grouping and job counting both require the extended format.
    pub fn build(count: CountMode, group: GroupMode, event: &UsageEvent) -> Option<Self> {
        let entity = match count {
            CountMode::Users => Entity::User(event.user.clone()),
            CountMode::Jobs => Entity::Job(event.job_id()?.to_string()),
        };
        let group = match group {
            GroupMode::None => Group::None,
            GroupMode::Category => Group::Category(event.category()?.to_string()),
            GroupMode::PathPrefix => Group::PathPrefix(path_prefix(&event.path).to_string()),
        };
        Some(Self {
            group,
            module: event.module.clone(),
            entity,
        })
    }
}

/// First directory of a module path.
///
/// The search for `/` starts at index 1, so a leading slash is kept:
/// `/usr/lib/x` gives `/usr`. A path without a later `/` is returned whole.
pub fn path_prefix(path: &str) -> &str {
    let first = path.chars().next().map_or(0, char::len_utf8);
    match path[first..].find('/') {
        Some(pos) => &path[..first + pos],
        None => path,
    }
}

/// Unique keys found in one log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub file: PathBuf,
    pub keys: HashSet<GroupKey>,
}

/// One report row: how many distinct entities loaded `module` (within `group`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub module: String,
    pub count: usize,
}

impl fmt::Display for ModuleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}: {} ({})", group, self.module, self.count),
            None => write!(f, "{} ({})", self.module, self.count),
        }
    }
}

/// Merged counts for a whole run, ranked by count descending.
#[derive(Debug, Clone, Serialize)]
pub struct UsageCounts {
    pub count_mode: CountMode,
    pub group_mode: GroupMode,
    pub rows: Vec<ModuleCount>,
}

/// A ranked `(label, value)` sequence handed to the chart sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub group: Option<String>,
    pub entries: Vec<(String, usize)>,
}

impl UsageCounts {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|row| row.count).sum()
    }

    /// Splits rows into one ranked series per group, groups in name order.
    pub fn series(&self) -> Vec<Series> {
        let mut series: Vec<Series> = Vec::new();
        let mut groups: Vec<Option<&str>> = self.rows.iter().map(|row| row.group.as_deref()).collect();
        groups.sort();
        groups.dedup();

        for group in groups {
            let entries = self
                .rows
                .iter()
                .filter(|row| row.group.as_deref() == group)
                .map(|row| (row.module.clone(), row.count))
                .collect();
            series.push(Series {
                group: group.map(str::to_string),
                entries,
            });
        }
        series
    }
}
