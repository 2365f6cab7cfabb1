use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::camera_roll::canonical_uuid;
use crate::error::{RollError, RollResult};

/// Duplicates are only swept out on every n-th insertion.
const DEDUPE_EVERY: usize = 5;

/// Called once for every identifier that leaves the cache.
pub type RemoveFn = Arc<dyn Fn(&str) -> RollResult<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCacheConfig {
    /// Hard ceiling on tracked identifiers.
    pub max: usize,
    /// Identifiers kept after an eviction.
    pub min: usize,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self { max: 10, min: 5 }
    }
}

struct Entries {
    ids: Vec<String>,
    inserts: usize,
}

/// Bounded most-recently-used set of cached file identifiers.
///
/// Eviction uses hysteresis: once more than `max` ids are tracked, everything past
/// the `min` most recent is dropped and `remove_fn` is called for each of them.
pub struct FileCache {
    config: FileCacheConfig,
    entries: Mutex<Entries>,
    remove_fn: RemoveFn,
}

impl FileCache {
    /// A `min` above `max` is clamped to `max`.
    pub fn new(mut config: FileCacheConfig, remove_fn: RemoveFn) -> Self {
        if config.min > config.max {
            warn!(
                "File cache min {} exceeds max {}, clamping",
                config.min, config.max
            );
            config.min = config.max;
        }
        Self {
            config,
            entries: Mutex::new(Entries {
                ids: Vec::new(),
                inserts: 0,
            }),
            remove_fn,
        }
    }

    fn lock(&self) -> RollResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| RollError::Poisoned("file cache"))
    }

    pub fn config(&self) -> FileCacheConfig {
        self.config
    }

    pub fn is_cached(&self, uuid: &str) -> bool {
        let id = canonical_uuid(uuid);
        match self.lock() {
            Ok(entries) => entries.ids.iter().any(|cached| cached == id),
            Err(_) => false,
        }
    }

    /// Records `uuid` as the most recently cached identifier.
    pub fn cache(&self, uuid: &str) -> RollResult<()> {
        let id = canonical_uuid(uuid).to_string();

        let evicted = {
            let mut entries = self.lock()?;
            entries.ids.insert(0, id);
            entries.inserts += 1;

            if entries.inserts % DEDUPE_EVERY == 0 {
                let mut seen: Vec<String> = Vec::with_capacity(entries.ids.len());
                entries.ids.retain(|id| {
                    if seen.contains(id) {
                        false
                    } else {
                        seen.push(id.clone());
                        true
                    }
                });
            }

            if entries.ids.len() > self.config.max {
                let keep = self.config.min.min(entries.ids.len());
                entries.ids.split_off(keep)
            } else {
                Vec::new()
            }
        };

        if !evicted.is_empty() {
            debug!(
                "File cache over {} entries, evicting {}",
                self.config.max,
                evicted.len()
            );
        }
        for id in evicted {
            self.remove(&id);
        }
        Ok(())
    }

    /// Forgets `uuid` and always runs `remove_fn`, tracked or not.
    pub fn clear(&self, uuid: &str) -> RollResult<()> {
        let id = canonical_uuid(uuid).to_string();
        {
            let mut entries = self.lock()?;
            entries.ids.retain(|cached| *cached != id);
        }
        self.remove(&id);
        Ok(())
    }

    fn remove(&self, id: &str) {
        if let Err(e) = (self.remove_fn)(id) {
            warn!("Failed to remove cached file {}: {}", id, e);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked identifiers, most recent first.
    pub fn ids(&self) -> Vec<String> {
        self.lock()
            .map(|entries| entries.ids.clone())
            .unwrap_or_default()
    }
}
