//! Mobylette Library
//!
//! Counts how many distinct users or distinct batch jobs loaded each software
//! module, from the usage lines Lmod's `ModUsageTrack` hook writes to syslog.
//!
//! ## Core Features
//!
//! - **Two log layouts**: the minimal `lmod:` record and the extended record with
//!   category and job fields are both recognised
//! - **Transparent decompression**: gzip-rotated logs are detected by magic bytes
//! - **Deduplicated counting**: a user (or job) loading a module many times counts once
//! - **Grouping**: by module category or by the first directory of the module path
//! - **Filtering**: by exact module name and by an inclusive time window
//! - **Paged charts**: rankings are split into balanced pages of horizontal bar charts
//!
//! ## Architecture Overview
//!
//! - [`parser`] - Line matching and (gzip-aware) file reading
//! - [`filter`] - Module allow-list and time window
//! - [`dedup`] - Per-file key sets, parallel file processing, cross-file merge
//! - [`bucket`] - Chart page planning
//! - [`analyzer`] - Orchestrates one run over a list of files
//! - [`chart`], [`report`], [`display`] - SVG charts, CSV report, terminal/JSON output
//! - [`config`], [`logging`], [`file_discovery`] - Ambient plumbing for the binary
//!
//! ## Usage Example
//!
//! ```rust
//! use mobylette::dedup::{aggregate_lines, AggregateOptions};
//! use mobylette::models::{CountMode, GroupMode};
//!
//! let lines = [
//!     "lmod: source=ModUsageTrack, time=1546333200.1, host=n1, user=alice, action=load, module=gcc/8.2.0, path=/opt/gcc",
//!     "lmod: source=ModUsageTrack, time=1546333201.1, host=n1, user=bob, action=load, module=gcc/8.2.0, path=/opt/gcc",
//!     "lmod: source=ModUsageTrack, time=1546333202.1, host=n1, user=alice, action=load, module=gcc/8.2.0, path=/opt/gcc",
//! ];
//! let options = AggregateOptions {
//!     count_mode: CountMode::Users,
//!     group_mode: GroupMode::None,
//!     ..Default::default()
//! };
//! assert_eq!(aggregate_lines(lines, &options).len(), 2);
//! ```

pub mod analyzer;
pub mod bucket;
pub mod chart;
pub mod config;
pub mod dedup;
pub mod display;
pub mod error;
pub mod file_discovery;
pub mod filter;
pub mod logging;
pub mod models;
pub mod parser;
pub mod report;
pub mod timestamp_parser;

pub use analyzer::ModuleUsageAnalyzer;
pub use error::UsageError;
pub use models::*;
