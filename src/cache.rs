//! Keyed single-flight caching for callers that want to reuse analyses.
//!
//! The engine itself stays stateless; these wrappers sit in front of it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::engine::{AnalysisMode, AnalysisResult, Engine};
use crate::error::EngineError;
use crate::record::MatchRecord;

/// At most one computation in flight per key. Concurrent callers for the same
/// key block on the first one and share its value; errors are not cached.
pub struct SingleFlight<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> SingleFlight<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_compute<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let cell = {
            let mut cells = self.cells.lock().expect("single-flight lock poisoned");
            Arc::clone(cells.entry(key).or_default())
        };
        // The map lock is released here; only callers of this key wait.
        let result = cell.get_or_try_init(compute).cloned();
        if result.is_err() {
            self.forget_empty(&cell);
        }
        result
    }

    /// Drop a failed slot unless another caller still holds it or has
    /// filled it meanwhile.
    fn forget_empty(&self, cell: &Arc<OnceCell<V>>) {
        let mut cells = self.cells.lock().expect("single-flight lock poisoned");
        cells.retain(|_, held| {
            !(Arc::ptr_eq(held, cell) && held.get().is_none() && Arc::strong_count(held) == 2)
        });
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().expect("single-flight lock poisoned");
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drop the entry for `key`. Returns whether a value was cached.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut cells = self.cells.lock().expect("single-flight lock poisoned");
        cells
            .remove(key)
            .is_some_and(|cell| cell.get().is_some())
    }

    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) {
        let mut cells = self.cells.lock().expect("single-flight lock poisoned");
        cells.retain(|key, _| keep(key));
    }

    /// Number of computed values currently held.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().expect("single-flight lock poisoned");
        cells.values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn slots(&self) -> usize {
        self.cells.lock().expect("single-flight lock poisoned").len()
    }
}

/// Analyses keyed by match identity and mode. Editing a record must be
/// followed by `invalidate_match`.
pub struct AnalysisCache<'e> {
    engine: &'e Engine,
    results: SingleFlight<(String, AnalysisMode), Arc<AnalysisResult>>,
}

impl<'e> AnalysisCache<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            results: SingleFlight::new(),
        }
    }

    pub fn analysis(
        &self,
        record: &MatchRecord,
        mode: AnalysisMode,
    ) -> Result<Arc<AnalysisResult>, EngineError> {
        self.results
            .get_or_try_compute((record.id.clone(), mode), || {
                self.engine.analyze(record, mode).map(Arc::new)
            })
    }

    pub fn invalidate_match(&self, match_id: &str) {
        self.results.retain(|(id, _)| id != match_id);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
