use crate::config::ClusterConfig;
use anyhow::{Context, Result};
use glob::glob;
use std::collections::BTreeSet;
use std::fs::metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Finds the Lmod log files of a cluster
pub struct FileDiscovery {
    cluster: ClusterConfig,
}

impl FileDiscovery {
    pub fn new(cluster: ClusterConfig) -> Self {
        Self { cluster }
    }

    /// Node names log files must start with, `prefix + node` for every configured node
    pub fn node_names(&self) -> Vec<String> {
        let prefix = self.cluster.prefix.as_deref().unwrap_or_default();
        self.cluster
            .nodes
            .iter()
            .map(|node| format!("{}{}", prefix, node.trim()))
            .collect()
    }

    /// Glob every configured pattern under `log_path`; sorted, without duplicates
    pub fn discover_log_files(&self) -> Result<Vec<PathBuf>> {
        let log_path = &self.cluster.log_path;
        if !log_path.is_dir() {
            anyhow::bail!("Log directory {} does not exist", log_path.display());
        }

        let patterns: Vec<&str> = if self.cluster.patterns.is_empty() {
            vec!["*"]
        } else {
            self.cluster.patterns.iter().map(|p| p.trim()).collect()
        };
        let nodes = self.node_names();
        let mut files = BTreeSet::new();

        for pattern in patterns {
            let full_pattern = log_path.join(pattern);
            let paths = glob(&full_pattern.to_string_lossy())
                .with_context(|| format!("Invalid log file pattern: {}", pattern))?;

            for entry in paths.flatten() {
                if !entry.is_file() {
                    continue;
                }
                if !nodes.is_empty() && !matches_node(&entry, &nodes) {
                    continue;
                }
                files.insert(entry);
            }
        }

        tracing::debug!(
            log_path = %log_path.display(),
            files = files.len(),
            "Discovered log files"
        );
        Ok(files.into_iter().collect())
    }

    /// A file last written before `start` cannot hold loads inside the window
    pub fn should_include_file(&self, file_path: &Path, start: Option<i64>) -> bool {
        let Some(start) = start else {
            return true;
        };

        let modified = metadata(file_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok());

        match modified {
            Some(modified) => modified.as_secs() as i64 >= start,
            // Unknown modification time: read it to be safe
            None => true,
        }
    }
}

fn matches_node(path: &Path, nodes: &[String]) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .map(|name| nodes.iter().any(|node| name.starts_with(node.as_str())))
        .unwrap_or(false)
}
