//! In-memory registry of fitted models keyed by series and target

use crate::error::Result;
use crate::series::SeriesKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Registry key: one model per (series, target)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    series: SeriesKey,
    target: String,
}

impl ModelKey {
    /// Create a key
    pub fn new(series: SeriesKey, target: impl Into<String>) -> Self {
        Self {
            series,
            target: target.into(),
        }
    }

    /// Series part of the key
    pub fn series(&self) -> &SeriesKey {
        &self.series
    }

    /// Target part of the key
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Thread-safe cache of trained models.
///
/// A registry belongs to one forecaster configuration: entries are not
/// invalidated when features or transforms change, so build a new registry
/// (or call [`ModelRegistry::clear`]) when the config does.
#[derive(Debug)]
pub struct ModelRegistry<T> {
    models: Mutex<HashMap<ModelKey, Arc<T>>>,
}

impl<T> Default for ModelRegistry<T> {
    fn default() -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> ModelRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ModelKey, Arc<T>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.models.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached model for `key`, training and storing it on a miss.
    ///
    /// Training runs outside the lock, so two threads missing the same key may
    /// both train; the first stored model wins. A failed training is not cached.
    pub fn get_or_train<F>(&self, key: ModelKey, train: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(model) = self.lock().get(&key) {
            debug!(series = %key.series, target = %key.target, "registry hit");
            return Ok(Arc::clone(model));
        }

        let trained = Arc::new(train()?);
        let mut models = self.lock();
        let entry = models.entry(key).or_insert(trained);
        Ok(Arc::clone(entry))
    }

    /// Cached model for `key`, if any
    pub fn get(&self, key: &ModelKey) -> Option<Arc<T>> {
        self.lock().get(key).cloned()
    }

    /// Whether a model is cached for `key`
    pub fn contains(&self, key: &ModelKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Remove one entry
    pub fn remove(&self, key: &ModelKey) -> Option<Arc<T>> {
        self.lock().remove(key)
    }

    /// Number of cached models
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached model
    pub fn clear(&self) {
        self.lock().clear();
    }
}
