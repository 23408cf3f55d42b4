//! Registry of named indices.
//!
//! Explicitly constructed and owned by the application; there is no global
//! instance. Callers search through the `Arc<IndexInstance>` they get back.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{IndexConfiguration, IndexStatus};
use crate::telemetry::{Operation, TelemetryStore};

use super::instance::IndexInstance;

/// Registry-wide aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatistics {
    pub total_indices: usize,
    pub active_indices_count: usize,
    pub total_creates: u64,
    pub total_removes: u64,
    pub total_searches: u64,
    pub total_items: usize,
    pub total_index_size_bytes: usize,
}

/// Summary row for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index_id: String,
    pub name: String,
    pub index_type: String,
    pub priority: i32,
    pub status: IndexStatus,
    pub items: usize,
}

#[derive(Debug)]
pub struct IndexRegistry {
    settings: EngineConfig,
    indices: RwLock<BTreeMap<String, Arc<IndexInstance>>>,
    telemetry: Arc<TelemetryStore>,
    creates: AtomicU64,
    removes: AtomicU64,
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl IndexRegistry {
    #[must_use]
    pub fn new(settings: EngineConfig) -> Self {
        Self {
            settings,
            indices: RwLock::new(BTreeMap::new()),
            telemetry: Arc::new(TelemetryStore::new()),
            creates: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Create and register an index. Fails when the id or the name is taken.
    pub fn create_index(&self, config: IndexConfiguration) -> Result<Arc<IndexInstance>> {
        let mut indices = self.indices.write();
        Self::ensure_unique(&indices, &config.index_id, &config.name)?;
        let instance = Arc::new(IndexInstance::create(
            config,
            &self.settings,
            Some(Arc::clone(&self.telemetry)),
        )?);
        indices.insert(instance.name(), Arc::clone(&instance));
        self.creates.fetch_add(1, Ordering::Relaxed);
        Ok(instance)
    }

    /// Load a saved index and register it under its stored name.
    pub fn load_index(&self, path: impl AsRef<Path>) -> Result<Arc<IndexInstance>> {
        let instance = IndexInstance::load(
            path.as_ref(),
            &self.settings,
            Some(Arc::clone(&self.telemetry)),
        )?;
        let mut indices = self.indices.write();
        Self::ensure_unique(&indices, &instance.index_id(), &instance.name())?;
        let instance = Arc::new(instance);
        indices.insert(instance.name(), Arc::clone(&instance));
        self.creates.fetch_add(1, Ordering::Relaxed);
        Ok(instance)
    }

    fn ensure_unique(
        indices: &BTreeMap<String, Arc<IndexInstance>>,
        index_id: &str,
        name: &str,
    ) -> Result<()> {
        if indices.contains_key(name) {
            return Err(EngineError::DuplicateIndex(name.to_string()));
        }
        if indices.values().any(|index| index.index_id() == index_id) {
            return Err(EngineError::DuplicateIndex(index_id.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<Arc<IndexInstance>> {
        self.indices.read().get(name).cloned()
    }

    #[must_use]
    pub fn get_index_by_id(&self, index_id: &str) -> Option<Arc<IndexInstance>> {
        self.indices
            .read()
            .values()
            .find(|index| index.index_id() == index_id)
            .cloned()
    }

    /// Unregister an index. Callers still holding the `Arc` keep a usable
    /// instance.
    pub fn remove_index(&self, name: &str) -> Result<Arc<IndexInstance>> {
        let removed = self
            .indices
            .write()
            .remove(name)
            .ok_or_else(|| EngineError::IndexNotFound(name.to_string()))?;
        self.removes.fetch_add(1, Ordering::Relaxed);
        info!(target: "index", index = %name, "index removed from registry");
        Ok(removed)
    }

    /// Summaries ordered by priority (descending), then name.
    #[must_use]
    pub fn list_indices(&self) -> Vec<IndexSummary> {
        let mut summaries: Vec<IndexSummary> = self
            .indices
            .read()
            .values()
            .map(|index| {
                let config = index.configuration();
                IndexSummary {
                    index_id: config.index_id,
                    name: config.name,
                    index_type: config.index_type,
                    priority: config.priority,
                    status: config.status,
                    items: index.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        summaries
    }

    #[must_use]
    pub fn active_indices_count(&self) -> usize {
        self.indices
            .read()
            .values()
            .filter(|index| index.status() == IndexStatus::Active)
            .count()
    }

    #[must_use]
    pub fn registry_statistics(&self) -> RegistryStatistics {
        let indices = self.indices.read();
        RegistryStatistics {
            total_indices: indices.len(),
            active_indices_count: indices
                .values()
                .filter(|index| index.status() == IndexStatus::Active)
                .count(),
            total_creates: self.creates.load(Ordering::Relaxed),
            total_removes: self.removes.load(Ordering::Relaxed),
            total_searches: self.telemetry.count(Operation::Search),
            total_items: indices.values().map(|index| index.len()).sum(),
            total_index_size_bytes: indices.values().map(|index| index.size_bytes()).sum(),
        }
    }
}
