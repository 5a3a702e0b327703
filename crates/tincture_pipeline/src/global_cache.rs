//! Long-lived cache of compiled pipelines.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::description::PipelineCacheKey;

/// Compiled pipelines shared by every recording of a context. Entries are
/// never evicted.
#[derive(Debug)]
pub struct GlobalPipelineCache<P> {
    pipelines: RwLock<FxHashMap<PipelineCacheKey, Arc<P>>>,
}

impl<P> Default for GlobalPipelineCache<P> {
    fn default() -> Self {
        Self {
            pipelines: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<P> GlobalPipelineCache<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &PipelineCacheKey) -> Option<Arc<P>> {
        self.pipelines.read().get(key).cloned()
    }

    /// Inserts `pipeline` unless `key` is already cached, and returns the
    /// canonical pipeline for `key`.
    pub fn insert(&self, key: PipelineCacheKey, pipeline: Arc<P>) -> Arc<P> {
        Arc::clone(self.pipelines.write().entry(key).or_insert(pipeline))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.read().is_empty()
    }
}
