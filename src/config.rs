//! Configuration system
//!
//! Provides configuration management with:
//! - Config file loading (optional, TOML)
//! - Environment variable support
//! - Runtime defaults
//! - Validation
//!
//! The loaded [`Config`] is an ordinary value: `main` loads it once and hands
//! the relevant parts to the components that need them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::bucket::DEFAULT_MAX_ROWS;
use crate::chart::DEFAULT_COLOR;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Worker pool configuration
    pub processing: ProcessingConfig,

    /// Where the cluster's Lmod logs live
    pub cluster: ClusterConfig,

    /// Chart paging and styling
    pub chart: ChartConfig,

    /// Report output
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker threads; 0 uses one per core.
    pub cpus: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub name: Option<String>,
    /// Prepended to every entry of `nodes`.
    pub prefix: Option<String>,
    pub log_path: PathBuf,
    /// Glob patterns relative to `log_path`.
    pub patterns: Vec<String>,
    /// Node name suffixes; when set, only log files named after these nodes are read.
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub enabled: bool,
    pub max_rows: usize,
    pub max_charts: Option<usize>,
    pub color: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_file: PathBuf,
    pub json_pretty: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: None,
            prefix: None,
            log_path: PathBuf::from("/var/log/lmod"),
            patterns: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rows: DEFAULT_MAX_ROWS,
            max_charts: None,
            color: DEFAULT_COLOR.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_file: PathBuf::from("mobylette.csv"),
            json_pretty: true,
        }
    }
}

impl Config {
    /// Candidate config files, first existing one wins.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("mobylette.toml"), PathBuf::from(".mobylette.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mobylette").join("mobylette.toml"));
        }
        paths.push(PathBuf::from("/etc/mobylette.toml"));
        paths
    }

    /// Load configuration from an explicit file or the search path, then environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                info!(config_file = %path.display(), "Loading configuration from file");
                Self::load_from_file(path)?
            }
            None => match Self::search_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    info!(config_file = %path.display(), "Loading configuration from file");
                    Self::load_from_file(&path)?
                }
                None => Config::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    #[cfg(feature = "basic")]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    #[cfg(not(feature = "basic"))]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        anyhow::bail!(
            "Config file {} given but this build lacks the `basic` feature",
            path.display()
        )
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("MOBYLETTE_LOG_PATH") {
            self.cluster.log_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("MOBYLETTE_CPUS") {
            self.processing.cpus = val.parse().context("Invalid MOBYLETTE_CPUS")?;
        }
        if let Ok(val) = env::var("MOBYLETTE_MAX_ROWS") {
            self.chart.max_rows = val.parse().context("Invalid MOBYLETTE_MAX_ROWS")?;
        }
        if let Ok(val) = env::var("MOBYLETTE_CHART_COLOR") {
            self.chart.color = val;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chart.max_rows == 0 {
            anyhow::bail!("chart.max_rows must be greater than 0");
        }
        if self.chart.max_charts == Some(0) {
            anyhow::bail!("chart.max_charts must be greater than 0");
        }
        if !is_hex_color(&self.chart.color) {
            anyhow::bail!(
                "chart.color must be six hex digits without '#', got '{}'",
                self.chart.color
            );
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!("logging.format must be 'pretty' or 'json', got '{}'", self.logging.format);
        }
        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            anyhow::bail!(
                "logging.output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            );
        }
        if self.cluster.prefix.is_none() && !self.cluster.nodes.is_empty() {
            warn!("cluster.nodes set without cluster.prefix, node names are used as-is");
        }
        Ok(())
    }

    /// Save current configuration to file
    #[cfg(feature = "basic")]
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");
        Ok(())
    }
}

pub fn is_hex_color(color: &str) -> bool {
    color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.chart.max_rows, 13);
        assert_eq!(config.chart.color, "2792ea");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.chart.max_rows = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chart.color = "#2792ea".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("ff00AA"));
        assert!(!is_hex_color("ff00A"));
        assert!(!is_hex_color("gg0000"));
    }
}
