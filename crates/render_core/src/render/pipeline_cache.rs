//! Pipeline state cache and the backend that fills it
//!
//! Pipeline states are immutable GPU objects that outlive frames, so the
//! cache persists across collections and most frames resolve every batch
//! without touching the backend. Lookup is split in two: worker lanes probe
//! the cache read-only during classification and record misses, then the
//! calling thread creates the missing states in a deterministic order after
//! the barrier. The backend is only ever driven from that single thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::scene::drawable::GeometryId;
use crate::scene::light::Light;
use crate::scene::material::MaterialId;
use crate::scene::technique::{Pass, PassRef};

/// Identity of one pipeline state.
///
/// `light_hash` folds the pipeline-relevant light state (type, shadow
/// status) of the batch's light; zero means unlit. Lights that differ only
/// in position or color share a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStateKey {
    /// Geometry being drawn
    pub geometry: GeometryId,
    /// Material after default resolution
    pub material: MaterialId,
    /// Technique pass being drawn
    pub pass: PassRef,
    /// Index of the source batch within its drawable
    pub source_batch_index: u32,
    /// Pipeline-relevant light state, zero for unlit
    pub light_hash: u64,
}

/// One cached pipeline state.
///
/// `id` is assigned by the cache in creation order and doubles as the cheap
/// sort key for state-grouped batch ordering.
#[derive(Debug)]
pub struct PipelineState {
    id: u32,
    backend_handle: u64,
}

impl PipelineState {
    /// Cache-assigned id, dense in creation order
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Opaque handle returned by the backend at creation
    pub fn backend_handle(&self) -> u64 {
        self.backend_handle
    }
}

/// Everything a backend needs to build one pipeline state
#[derive(Debug)]
pub struct PipelineStateDesc<'a> {
    /// Cache key the state will be stored under
    pub key: PipelineStateKey,
    /// Shader pair of the pass being compiled
    pub pass: &'a Pass,
    /// Interned pass name, for diagnostics
    pub pass_name: &'a str,
    /// The light baked into per-light and lit-base variants
    pub light: Option<&'a Light>,
}

/// Errors from pipeline state resolution
#[derive(thiserror::Error, Debug)]
pub enum PipelineStateError {
    /// The backend rejected or failed to compile the state
    #[error("pipeline backend error: {0}")]
    Backend(String),

    /// The batch's pass reference no longer resolves to a pass
    #[error("pass reference does not resolve to a pass")]
    MissingPass,
}

/// Creates GPU pipeline state objects for the collector.
///
/// Called only from the thread driving collection, after the classification
/// barrier, in a deterministic key order.
pub trait PipelineBackend {
    /// Build the state described by `desc` and return an opaque handle
    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc<'_>) -> Result<u64, PipelineStateError>;
}

/// Per-frame cache activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCacheStats {
    /// Probes that found an existing state
    pub hits: u64,
    /// Probes that found nothing
    pub misses: u64,
    /// States created this frame
    pub created: u64,
}

/// Cross-frame store of pipeline states keyed by batch identity.
///
/// The lock is only contended in theory: parallel phases take read guards,
/// and all writes go through `&mut self` after the barrier.
pub struct PipelineStateCache {
    states: RwLock<HashMap<PipelineStateKey, Arc<PipelineState>>>,
    next_id: u32,
    hits: AtomicU64,
    misses: AtomicU64,
    created: u64,
}

impl PipelineStateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            next_id: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            created: 0,
        }
    }

    /// Reset the per-frame counters; cached states persist
    pub fn begin_frame(&mut self) {
        *self.hits.get_mut() = 0;
        *self.misses.get_mut() = 0;
        self.created = 0;
    }

    /// Probe for an existing state; safe to call from worker lanes
    pub fn try_get(&self, key: &PipelineStateKey) -> Option<Arc<PipelineState>> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        match states.get(key) {
            Some(state) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(state))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Return the state for `key`, creating it through `create` on a miss.
    ///
    /// Two recorded misses for the same key resolve to the same state; only
    /// the first reaches the backend. A failed creation stores nothing, so
    /// the key is retried on the next frame.
    pub fn get_or_create(
        &mut self,
        key: PipelineStateKey,
        create: impl FnOnce() -> Result<u64, PipelineStateError>,
    ) -> Result<Arc<PipelineState>, PipelineStateError> {
        let states = self.states.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get(&key) {
            return Ok(Arc::clone(state));
        }

        let backend_handle = create()?;
        let state = Arc::new(PipelineState {
            id: self.next_id,
            backend_handle,
        });
        self.next_id += 1;
        self.created += 1;
        states.insert(key, Arc::clone(&state));
        Ok(state)
    }

    /// Number of states in the cache
    pub fn len(&self) -> usize {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no states have been created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters accumulated since the last [`PipelineStateCache::begin_frame`]
    pub fn stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            created: self.created,
        }
    }
}

impl Default for PipelineStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::TypedHandle;
    use crate::scene::technique::PassIndex;

    fn key(geometry: u32, light_hash: u64) -> PipelineStateKey {
        PipelineStateKey {
            geometry: GeometryId(geometry),
            material: MaterialId(1),
            pass: PassRef {
                technique: TypedHandle::new(slotmap::DefaultKey::default()),
                index: PassIndex(0),
            },
            source_batch_index: 0,
            light_hash,
        }
    }

    #[test]
    fn test_duplicate_misses_create_once() {
        let mut cache = PipelineStateCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_create(key(1, 0), || {
                calls += 1;
                Ok(100)
            })
            .unwrap();
        let second = cache
            .get_or_create(key(1, 0), || {
                calls += 1;
                Ok(200)
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.backend_handle(), 100);
        assert_eq!(cache.stats().created, 1);
    }

    #[test]
    fn test_failed_creation_is_not_cached() {
        let mut cache = PipelineStateCache::new();

        let failed = cache.get_or_create(key(1, 0), || {
            Err(PipelineStateError::Backend("shader error".into()))
        });
        assert!(failed.is_err());
        assert!(cache.is_empty());

        // The same key succeeds later; the failure poisoned nothing
        let state = cache.get_or_create(key(1, 0), || Ok(7)).unwrap();
        assert_eq!(state.backend_handle(), 7);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_probe_counters_track_hits_and_misses() {
        let mut cache = PipelineStateCache::new();
        cache.get_or_create(key(1, 0), || Ok(1)).unwrap();
        cache.begin_frame();

        assert!(cache.try_get(&key(1, 0)).is_some());
        assert!(cache.try_get(&key(2, 0)).is_none());
        assert!(cache.try_get(&key(1, 0)).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn test_ids_are_dense_in_creation_order() {
        let mut cache = PipelineStateCache::new();
        let a = cache.get_or_create(key(1, 0), || Ok(0)).unwrap();
        let b = cache.get_or_create(key(2, 0), || Ok(0)).unwrap();
        let c = cache.get_or_create(key(1, 2), || Ok(0)).unwrap();

        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(c.id(), 2);
    }
}
