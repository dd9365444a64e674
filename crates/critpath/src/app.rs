//! Application context for CLI command execution.
//!
//! [`App`] resolves the project root, loads the configuration and the task
//! file, and opens the impact cache. Commands receive it as their context.

use crate::cache::JsonFileCache;
use crate::config::{CONFIG_FILE_NAME, CRITPATH_DIR_NAME, CritpathConfig, find_project_root};
use crate::error::{Error, Result};
use crate::store::{InMemoryTaskStore, JsonlTaskStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
pub struct App {
    root: PathBuf,
    config: CritpathConfig,
    tasks: JsonlTaskStore,
    cache: Arc<JsonFileCache>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("tasks_path", &self.tasks.path())
            .field("cache", &self.cache.path())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App for `working_dir`.
    ///
    /// The project root is the nearest ancestor containing `.critpath/`, or
    /// `working_dir` itself. `config_path` overrides the default
    /// `.critpath/config.yaml`; an explicit file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the task file is
    /// missing or unreadable. Malformed task lines are logged and skipped.
    pub async fn from_directory(working_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let root = find_project_root(working_dir).unwrap_or_else(|| working_dir.to_path_buf());

        let config = match config_path {
            Some(path) => CritpathConfig::load(path).await?,
            None => {
                CritpathConfig::load_or_default(&root.join(CRITPATH_DIR_NAME).join(CONFIG_FILE_NAME))
                    .await?
            }
        };

        let tasks_path = config.tasks_path(&root);
        if !tokio::fs::try_exists(&tasks_path).await? {
            return Err(Error::Config(format!(
                "Task file not found: {}",
                tasks_path.display()
            )));
        }

        let (tasks, warnings) = JsonlTaskStore::open(&tasks_path).await?;
        for warning in &warnings {
            tracing::warn!(path = %tasks_path.display(), "{warning}");
        }

        let cache = Arc::new(JsonFileCache::new(config.cache_path(&root)));

        Ok(Self {
            root,
            config,
            tasks,
            cache,
        })
    }

    /// The resolved project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loaded configuration.
    pub fn config(&self) -> &CritpathConfig {
        &self.config
    }

    /// The in-memory view of the task file.
    pub fn store(&self) -> &InMemoryTaskStore {
        self.tasks.memory()
    }

    /// The task file store, for commands that write flag activities back.
    pub fn task_file(&self) -> &JsonlTaskStore {
        &self.tasks
    }

    /// The impact cache.
    pub fn cache(&self) -> Arc<JsonFileCache> {
        Arc::clone(&self.cache)
    }
}
