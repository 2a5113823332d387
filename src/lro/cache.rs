//! Per-operation memoization of engine results.
//!
//! A [`MetadataCache`] is tied to the fingerprint of the graph snapshot it
//! was filled from. Each operation is computed at most once per
//! fingerprint, even when several threads ask for it at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use super::engine::LroEngine;
use super::steps::LroMetadata;
use crate::annotations::AnnotationStore;
use crate::diagnostics::Diagnosed;
use crate::graph::{OperationId, TypeGraph};

type Entry = Arc<OnceLock<Diagnosed<Option<LroMetadata>>>>;

#[derive(Debug, Default)]
struct CacheState {
    fingerprint: String,
    entries: HashMap<OperationId, Entry>,
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    state: Mutex<CacheState>,
}

impl MetadataCache {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                fingerprint: fingerprint.into(),
                entries: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // entries are write-once cells; a poisoned lock still guards consistent data
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fingerprint(&self) -> String {
        self.state().fingerprint.clone()
    }

    /// Point the cache at a new snapshot, dropping every entry if the
    /// fingerprint changed. Returns whether anything was invalidated.
    pub fn invalidate(&self, fingerprint: &str) -> bool {
        let mut state = self.state();
        if state.fingerprint == fingerprint {
            return false;
        }
        log::debug!(
            "metadata cache invalidated: {} -> {} ({} entries dropped)",
            state.fingerprint,
            fingerprint,
            state.entries.len()
        );
        state.fingerprint = fingerprint.to_string();
        state.entries.clear();
        true
    }

    /// Drop everything regardless of fingerprint
    pub fn clear(&self) {
        self.state().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached result for `op`, running `compute` only on the first request
    pub fn get_or_insert_with(
        &self,
        op: OperationId,
        compute: impl FnOnce() -> Diagnosed<Option<LroMetadata>>,
    ) -> Diagnosed<Option<LroMetadata>> {
        let entry = Arc::clone(self.state().entries.entry(op).or_default());
        entry.get_or_init(compute).clone()
    }

    pub fn get_or_compute<G, A>(
        &self,
        engine: &LroEngine<'_, G, A>,
        op: OperationId,
    ) -> Diagnosed<Option<LroMetadata>>
    where
        G: TypeGraph + ?Sized,
        A: AnnotationStore + ?Sized,
    {
        self.get_or_insert_with(op, || engine.get_lro_metadata(op))
    }
}
