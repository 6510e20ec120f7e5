//! Output Formatting and Display Management
//!
//! This module prints the merged module counts either as a colored terminal
//! summary or as JSON for programmatic consumption.
//!
//! ## Output Formats
//!
//! ### Terminal Output
//! - A banner naming the count mode and grouping
//! - A one-line summary: modules listed, total distinct loads, files scanned
//! - Ranked rows, under a header per group when grouping is enabled
//!
//! ### JSON Output
//! When `json_output` is enabled the report is printed as:
//! ```json
//! {
//!   "count": "users",
//!   "group": "cat",
//!   "modules": [
//!     { "group": "compilers", "module": "gcc/12.2.0", "count": 42 }
//!   ]
//! }
//! ```

use crate::models::*;
use colored::Colorize;
use serde::Serialize;

/// JSON report layout; field order is the serialized order.
#[derive(Serialize)]
struct JsonReport<'a> {
    count: CountMode,
    group: GroupMode,
    modules: &'a [ModuleCount],
}

pub struct DisplayManager {
    json_pretty: bool,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DisplayManager {
    pub fn new(json_pretty: bool) -> Self {
        Self { json_pretty }
    }

    pub fn to_json(&self, counts: &UsageCounts) -> serde_json::Result<String> {
        let output = JsonReport {
            count: counts.count_mode,
            group: counts.group_mode,
            modules: &counts.rows,
        };
        if self.json_pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        }
    }

    pub fn display_counts(&self, counts: &UsageCounts, files_scanned: usize, limit: Option<usize>, json_output: bool) {
        if json_output {
            match self.to_json(counts) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing module counts to JSON: {}", e),
            }
            return;
        }

        println!("\n{}", "=".repeat(80).bright_cyan());
        let title = match counts.group_mode {
            GroupMode::None => format!("Lmod Module Usage - distinct {}", counts.count_mode.noun()),
            GroupMode::Category => format!("Lmod Module Usage - distinct {} by category", counts.count_mode.noun()),
            GroupMode::PathPrefix => format!("Lmod Module Usage - distinct {} by path", counts.count_mode.noun()),
        };
        println!("{}", title.bright_white().bold());
        println!("{}", "=".repeat(80).bright_cyan());

        if counts.is_empty() {
            println!("\nNo module loads matched the given filters.");
            return;
        }

        println!(
            "\n{} modules • {} distinct loads • {} files\n",
            counts.rows.len().to_string().bright_white().bold(),
            counts.total().to_string().bright_green().bold(),
            files_scanned.to_string().bright_white()
        );

        let display_limit = limit.unwrap_or(usize::MAX);
        for series in counts.series() {
            if let Some(group) = &series.group {
                println!("{}", group.bright_blue().bold());
            }
            let width = series
                .entries
                .iter()
                .take(display_limit)
                .map(|(module, _)| module.chars().count())
                .max()
                .unwrap_or(0);
            for (module, count) in series.entries.iter().take(display_limit) {
                println!(
                    "   {:<width$}  {}",
                    module.bright_cyan(),
                    count.to_string().bright_yellow(),
                    width = width
                );
            }
            if series.entries.len() > display_limit {
                println!("   … {} more", series.entries.len() - display_limit);
            }
            println!();
        }
    }
}
