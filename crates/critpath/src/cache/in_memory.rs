//! Process-local cache backend.

use super::{ImpactCache, ImpactSnapshot, SnapshotUpdate};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory cache guarded by a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    slot: RwLock<Option<ImpactSnapshot>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImpactCache for InMemoryCache {
    async fn get(&self) -> Result<Option<ImpactSnapshot>> {
        Ok(self.slot.read().await.clone())
    }

    async fn put(&self, update: SnapshotUpdate) -> Result<bool> {
        let mut slot = self.slot.write().await;
        Ok(slot.get_or_insert_with(ImpactSnapshot::default).apply(update))
    }
}
