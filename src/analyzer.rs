//! Usage Analysis Engine
//!
//! This module provides the analysis engine that drives one counting run from
//! a list of log files to ranked module counts.
//!
//! ## Pipeline
//!
//! 1. **Fan-out**: every file is matched, filtered and folded into unique keys on
//!    the worker pool of the [`DeduplicationEngine`]
//! 2. **Failure policy**: an unreadable file either aborts the run (default) or is
//!    logged and left out when `skip_unreadable` is set
//! 3. **Fan-in**: the surviving per-file key sets are merged and ranked by
//!    [`merge_results`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use mobylette::analyzer::ModuleUsageAnalyzer;
//! use mobylette::dedup::AggregateOptions;
//! use std::path::PathBuf;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = ModuleUsageAnalyzer::new(AggregateOptions::default(), 0, false)?;
//! let summary = analyzer.analyze(&[PathBuf::from("/var/log/lmod/lmod.log")])?;
//! for row in &summary.counts.rows {
//!     println!("{}", row);
//! }
//! # Ok(())
//! # }
//! ```

use crate::dedup::{merge_results, AggregateOptions, DeduplicationEngine};
use crate::error::UsageError;
use crate::models::{FileResult, UsageCounts};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counts: UsageCounts,
    pub files_scanned: usize,
    /// Files left out under `skip_unreadable`.
    pub files_failed: Vec<PathBuf>,
}

pub struct ModuleUsageAnalyzer {
    engine: DeduplicationEngine,
    skip_unreadable: bool,
}

impl ModuleUsageAnalyzer {
    pub fn new(options: AggregateOptions, cpus: usize, skip_unreadable: bool) -> Result<Self, UsageError> {
        Ok(Self {
            engine: DeduplicationEngine::new(options, cpus)?,
            skip_unreadable,
        })
    }

    pub fn analyze(&self, files: &[PathBuf]) -> Result<RunSummary, UsageError> {
        let options = self.engine.options();
        info!(
            files = files.len(),
            count = options.count_mode.noun(),
            group = ?options.group_mode,
            "Counting module loads"
        );

        let mut results: Vec<FileResult> = Vec::with_capacity(files.len());
        let mut files_failed = Vec::new();

        for result in self.engine.process_files(files) {
            match result {
                Ok(file_result) => results.push(file_result),
                Err(UsageError::UnreadableFile { path, source }) if self.skip_unreadable => {
                    warn!(file = %path.display(), error = %source, "Skipping unreadable log file");
                    files_failed.push(path);
                }
                Err(e) => return Err(e),
            }
        }

        let counts = merge_results(&results, options.count_mode, options.group_mode);
        if counts.is_empty() {
            warn!("No module loads matched across all log files");
        }

        Ok(RunSummary {
            counts,
            files_scanned: results.len(),
            files_failed,
        })
    }
}
