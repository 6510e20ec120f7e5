//! Event filtering by module allow-list and time window.

use crate::models::UsageEvent;
use std::collections::HashSet;

/// Keep/drop criteria applied to every matched event.
///
/// All criteria are optional; an empty filter keeps every event with a
/// numeric timestamp. Bounds are inclusive whole-second epoch values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub modules: Option<HashSet<String>>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to the given `name/version` strings. An empty list disables the check.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modules: HashSet<String> = modules.into_iter().map(Into::into).collect();
        self.modules = if modules.is_empty() { None } else { Some(modules) };
        self
    }

    pub fn with_start(mut self, start: Option<i64>) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: Option<i64>) -> Self {
        self.end = end;
        self
    }

    pub fn keep(&self, event: &UsageEvent) -> bool {
        if let Some(modules) = &self.modules {
            if !modules.contains(&event.module) {
                return false;
            }
        }

        if self.start.is_none() && self.end.is_none() {
            return true;
        }

        // A timestamp that does not parse makes the line malformed.
        let Some(timestamp) = event.timestamp_secs() else {
            return false;
        };
        if let Some(start) = self.start {
            if timestamp < start as f64 {
                return false;
            }
        }
        if let Some(end) = self.end {
            if timestamp > end as f64 {
                return false;
            }
        }
        true
    }
}
