//! Configuration file handling.
//!
//! Settings live in `.critpath/config.yaml`. Every key is optional; missing keys
//! take their defaults. Relative file paths are resolved against the project
//! root (the directory containing `.critpath/`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Name of the critpath directory
pub const CRITPATH_DIR_NAME: &str = ".critpath";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default task data file
pub const DEFAULT_TASKS_FILE: &str = ".critpath/tasks.jsonl";

/// Default impact cache file
pub const DEFAULT_CACHE_FILE: &str = ".critpath/impact.json";

/// Maximum directory depth to traverse when searching for the project root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Upper bound applied to `stale-after-secs` (about a century)
const MAX_STALE_AFTER_SECS: u64 = 100 * 365 * 86_400;

/// Configuration file structure for critpath
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CritpathConfig {
    /// Quiet window before a recalculation runs
    pub debounce_ms: u64,

    /// Bound on each enrichment call
    pub enrichment_timeout_ms: u64,

    /// Period of the slippage scan
    pub scan_interval_secs: u64,

    /// Window in which an overdue task is not flagged again
    pub flag_window_hours: u32,

    /// Age after which a cached snapshot counts as stale
    pub stale_after_secs: u64,

    /// Task data file (JSONL)
    pub tasks_file: String,

    /// Impact cache file (JSON)
    pub cache_file: String,
}

impl Default for CritpathConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            enrichment_timeout_ms: 10_000,
            scan_interval_secs: 3_600,
            flag_window_hours: 24,
            stale_after_secs: 86_400,
            tasks_file: DEFAULT_TASKS_FILE.to_string(),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl CritpathConfig {
    /// Load and validate configuration from a file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject values that would stall or spin the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.enrichment_timeout_ms == 0 {
            return Err(Error::Config(
                "enrichment-timeout-ms must be greater than 0".to_string(),
            ));
        }
        if self.scan_interval_secs == 0 {
            return Err(Error::Config(
                "scan-interval-secs must be greater than 0".to_string(),
            ));
        }
        if self.flag_window_hours == 0 {
            return Err(Error::Config(
                "flag-window-hours must be greater than 0".to_string(),
            ));
        }
        if self.tasks_file.trim().is_empty() || self.cache_file.trim().is_empty() {
            return Err(Error::Config("file paths must not be empty".to_string()));
        }
        Ok(())
    }

    /// Debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Enrichment timeout.
    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }

    /// Slippage scan period.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Flag window.
    pub fn flag_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.flag_window_hours))
    }

    /// Cache staleness threshold.
    pub fn stale_after(&self) -> chrono::Duration {
        let secs = self.stale_after_secs.min(MAX_STALE_AFTER_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    /// Task file resolved against `root`.
    pub fn tasks_path(&self, root: &Path) -> PathBuf {
        root.join(&self.tasks_file)
    }

    /// Cache file resolved against `root`.
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_file)
    }
}

/// Find the project root by searching up the directory tree for `.critpath/`.
pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(CRITPATH_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
