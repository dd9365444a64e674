//! JSON file cache backend.
//!
//! The snapshot lives in a single pretty-printed JSON document. Every update is a
//! read-modify-write of that document, serialized by an async mutex within the
//! process and published with an atomic rename.

use super::{ImpactCache, ImpactSnapshot, SnapshotUpdate};
use crate::atomic::write_atomic;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Cache persisted as a JSON file.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCache {
    /// Create a cache backed by the file at `path`.
    ///
    /// The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<ImpactSnapshot>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                Error::Storage(format!("corrupt impact cache {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ImpactCache for JsonFileCache {
    async fn get(&self) -> Result<Option<ImpactSnapshot>> {
        self.read().await
    }

    async fn put(&self, update: SnapshotUpdate) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.read().await?.unwrap_or_default();
        let applied = snapshot.apply(update);
        if applied {
            let bytes = serde_json::to_vec_pretty(&snapshot)?;
            write_atomic(&self.path, &bytes).await?;
            tracing::debug!(path = %self.path.display(), generation = snapshot.generation, "Impact cache written");
        }
        Ok(applied)
    }
}
