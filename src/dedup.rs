//! Deduplication Engine
//!
//! This module turns matched log events into unique [`GroupKey`]s and counts them.
//!
//! ## Core Functionality
//!
//! ### Deduplication Strategy
//! - **Per-file key sets**: every file is folded into a `HashSet<GroupKey>`, so the same
//!   user (or job) loading the same module twice in one file is counted once
//! - **Raw-string keys**: key components are compared exactly as they appear in the log
//! - **Global union**: the per-file sets are unioned before counting, so a load seen in
//!   two rotated log files is still a single load
//!
//! ### Processing Pipeline
//! 1. **Matching**: [`crate::parser`] turns lines into [`UsageEvent`]s
//! 2. **Filtering**: [`EventFilter`] drops events outside the allow-list or time window
//! 3. **Key Building**: [`GroupKey::build`] picks the key shape for the count/group modes
//! 4. **Merging**: [`merge_results`] unions the file sets and tallies keys per
//!    `(group, module)`
//!
//! ## Parallel Processing
//!
//! With the `parallel` feature, files are processed on a dedicated rayon pool. Workers
//! share no mutable state; the only synchronisation point is the final merge.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use mobylette::dedup::{AggregateOptions, DeduplicationEngine, merge_results};
//! use mobylette::models::{CountMode, GroupMode};
//! use std::path::PathBuf;
//!
//! # fn example() -> anyhow::Result<()> {
//! let options = AggregateOptions {
//!     count_mode: CountMode::Users,
//!     group_mode: GroupMode::Category,
//!     ..Default::default()
//! };
//! let engine = DeduplicationEngine::new(options.clone(), 0)?;
//! let results = engine.process_files(&[PathBuf::from("/var/log/lmod/lmod.log")]);
//! let files: Vec<_> = results.into_iter().collect::<Result<_, _>>()?;
//! let counts = merge_results(&files, options.count_mode, options.group_mode);
//! # Ok(())
//! # }
//! ```

use crate::error::UsageError;
use crate::filter::EventFilter;
use crate::models::{CountMode, FileResult, GroupKey, GroupMode, ModuleCount, UsageCounts, UsageEvent};
use crate::parser::{match_line, FileParser, LogProcessor};
use dashmap::DashMap;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Everything the per-file pass needs, passed by value to each worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    pub count_mode: CountMode,
    pub group_mode: GroupMode,
    pub filter: EventFilter,
}

/// [`LogProcessor`] that folds events into a key set.
pub struct KeyCollector<'a> {
    options: &'a AggregateOptions,
    keys: HashSet<GroupKey>,
    matched: usize,
    kept: usize,
}

impl<'a> KeyCollector<'a> {
    pub fn new(options: &'a AggregateOptions) -> Self {
        Self {
            options,
            keys: HashSet::new(),
            matched: 0,
            kept: 0,
        }
    }
}

impl LogProcessor for KeyCollector<'_> {
    type Output = HashSet<GroupKey>;

    fn process_event(&mut self, event: UsageEvent, _line_number: usize) {
        self.matched += 1;
        if !self.options.filter.keep(&event) {
            return;
        }
        if let Some(key) = GroupKey::build(self.options.count_mode, self.options.group_mode, &event) {
            self.kept += 1;
            self.keys.insert(key);
        }
    }

    fn finalize(self) -> Self::Output {
        tracing::debug!(
            matched = self.matched,
            kept = self.kept,
            unique = self.keys.len(),
            "Folded events into unique keys"
        );
        self.keys
    }
}

/// Folds already-read lines into a key set.
pub fn aggregate_lines<I, S>(lines: I, options: &AggregateOptions) -> HashSet<GroupKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut collector = KeyCollector::new(options);
    for (index, line) in lines.into_iter().enumerate() {
        if let Some(event) = match_line(line.as_ref()).into_event() {
            collector.process_event(event, index + 1);
        }
    }
    collector.finalize()
}

/// Reads one (possibly gzipped) log file and returns its unique keys.
pub fn aggregate_file(path: &Path, options: &AggregateOptions) -> Result<FileResult, UsageError> {
    let keys = FileParser::new().process_log_file(path, KeyCollector::new(options))?;
    Ok(FileResult {
        file: path.to_path_buf(),
        keys,
    })
}

pub struct DeduplicationEngine {
    options: AggregateOptions,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl DeduplicationEngine {
    /// `threads == 0` sizes the pool to the number of cores.
    pub fn new(options: AggregateOptions, threads: usize) -> Result<Self, UsageError> {
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mobylette-worker-{}", i))
            .build()
            .map_err(|e| UsageError::InvalidConfiguration(format!("cannot start worker pool: {}", e)))?;
        #[cfg(not(feature = "parallel"))]
        let _ = threads;

        Ok(Self {
            options,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Processes every file independently; results keep the input order.
    pub fn process_files(&self, files: &[PathBuf]) -> Vec<Result<FileResult, UsageError>> {
        tracing::debug!(files = files.len(), "Processing log files");

        #[cfg(feature = "parallel")]
        let results: Vec<_> = self.pool.install(|| {
            files
                .par_iter()
                .map(|file| aggregate_file(file, &self.options))
                .collect()
        });
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = files
            .iter()
            .map(|file| aggregate_file(file, &self.options))
            .collect();

        results
    }
}

/// Unions the per-file key sets and counts keys per `(group, module)`.
///
/// Rows are ranked by count (descending), then group and module name.
pub fn merge_results(results: &[FileResult], count_mode: CountMode, group_mode: GroupMode) -> UsageCounts {
    let unique: HashSet<&GroupKey> = results.iter().flat_map(|result| result.keys.iter()).collect();
    let tally: DashMap<(Option<String>, String), usize> = DashMap::new();

    let count_key = |key: &&GroupKey| {
        *tally
            .entry((key.group.label().map(str::to_string), key.module.clone()))
            .or_insert(0) += 1;
    };
    #[cfg(feature = "parallel")]
    unique.par_iter().for_each(count_key);
    #[cfg(not(feature = "parallel"))]
    unique.iter().for_each(count_key);

    let mut rows: Vec<ModuleCount> = tally
        .into_iter()
        .map(|((group, module), count)| ModuleCount { group, module, count })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.module.cmp(&b.module))
    });

    tracing::info!(
        files = results.len(),
        unique_keys = unique.len(),
        rows = rows.len(),
        "Merged per-file results"
    );

    UsageCounts {
        count_mode,
        group_mode,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, Group};

    fn minimal(time: &str, user: &str, module: &str) -> String {
        format!(
            "lmod: source=ModUsageTrack, time={}, host=n1, user={}, action=load, module={}, path=/opt/mods/{}",
            time, user, module, module
        )
    }

    fn extended(user: &str, module: &str, cat: &str, job: &str) -> String {
        format!(
            "source=ModUsageTrack, time=1546333200.1, host=n1, user={}, action=load, module={}, \
             path=/apps/{}/{}, cat={}, version=1, shell=bash, job_id={}, job_acc=acc, job_part=cn",
            user, module, cat, module, cat, job
        )
    }

    fn options(count_mode: CountMode, group_mode: GroupMode) -> AggregateOptions {
        AggregateOptions {
            count_mode,
            group_mode,
            filter: EventFilter::new(),
        }
    }

    #[test]
    fn test_duplicate_load_counted_once() {
        let lines = [
            minimal("100.0", "alice", "gcc/8.2.0"),
            minimal("101.0", "bob", "gcc/8.2.0"),
            minimal("102.0", "alice", "gcc/8.2.0"),
        ];
        let keys = aggregate_lines(&lines, &options(CountMode::Users, GroupMode::None));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_repeating_input_is_idempotent() {
        let lines = vec![
            extended("alice", "fftw/3", "libs", "1"),
            extended("bob", "fftw/3", "libs", "2"),
        ];
        let opts = options(CountMode::Jobs, GroupMode::Category);
        let once = aggregate_lines(&lines, &opts);
        let twice = aggregate_lines(lines.iter().chain(lines.iter()), &opts);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_job_keys_by_category() {
        let lines = [
            extended("alice", "fftw/3", "libs", "10"),
            extended("bob", "fftw/3", "libs", "10"),
            extended("bob", "gcc/12", "compilers", "11"),
        ];
        let keys = aggregate_lines(&lines, &options(CountMode::Jobs, GroupMode::Category));
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&GroupKey {
            group: Group::Category("libs".to_string()),
            module: "fftw/3".to_string(),
            entity: Entity::Job("10".to_string()),
        }));
    }

    #[test]
    fn test_path_prefix_grouping() {
        let lines = [extended("alice", "fftw/3", "libs", "10")];
        let keys = aggregate_lines(&lines, &options(CountMode::Users, GroupMode::PathPrefix));
        let key = keys.into_iter().next().unwrap();
        assert_eq!(key.group, Group::PathPrefix("/apps".to_string()));
    }

    #[test]
    fn test_minimal_lines_ignored_when_counting_jobs() {
        let lines = [minimal("100", "alice", "gcc/8.2.0")];
        assert!(aggregate_lines(&lines, &options(CountMode::Jobs, GroupMode::None)).is_empty());
    }

    #[test]
    fn test_filter_applied_before_keying() {
        let lines = [
            minimal("100", "alice", "gcc/8.2.0"),
            minimal("300", "bob", "gcc/8.2.0"),
            minimal("150", "carol", "fftw/3"),
        ];
        let opts = AggregateOptions {
            count_mode: CountMode::Users,
            group_mode: GroupMode::None,
            filter: EventFilter::new()
                .with_modules(["gcc/8.2.0"])
                .with_end(Some(200)),
        };
        let keys = aggregate_lines(&lines, &opts);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_merge_unions_across_files() {
        let opts = options(CountMode::Users, GroupMode::None);
        let first = FileResult {
            file: PathBuf::from("a.log"),
            keys: aggregate_lines(
                [minimal("1", "alice", "gcc/8"), minimal("1", "bob", "gcc/8")],
                &opts,
            ),
        };
        let second = FileResult {
            file: PathBuf::from("b.log"),
            keys: aggregate_lines(
                [minimal("2", "alice", "gcc/8"), minimal("2", "alice", "fftw/3")],
                &opts,
            ),
        };

        let counts = merge_results(&[first, second], CountMode::Users, GroupMode::None);
        assert_eq!(
            counts.rows,
            vec![
                ModuleCount { group: None, module: "gcc/8".to_string(), count: 2 },
                ModuleCount { group: None, module: "fftw/3".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_merge_ties_sorted_by_name() {
        let opts = options(CountMode::Users, GroupMode::None);
        let result = FileResult {
            file: PathBuf::from("a.log"),
            keys: aggregate_lines(
                [minimal("1", "u", "zlib/1"), minimal("1", "u", "bzip2/1")],
                &opts,
            ),
        };
        let counts = merge_results(&[result], CountMode::Users, GroupMode::None);
        assert_eq!(counts.rows[0].module, "bzip2/1");
        assert_eq!(counts.rows[1].module, "zlib/1");
    }
}
