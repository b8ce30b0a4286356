//! Fingerprint-keyed result cache.
//!
//! The facade never reports backend failures to its caller: a failed read
//! is a miss and a failed write or eviction is a no-op, each logged once at
//! `warn`.

mod backend;
mod fingerprint;
mod key;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::CacheConfig;

pub use backend::{CacheBackend, MemoryBackend, SledBackend};
pub use fingerprint::{fingerprint, fingerprint_elements};
pub use key::{CacheKey, ResultKind, TtlClass};

/// A value and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<T> {
    pub value: T,
    pub hit: bool,
}

#[derive(Clone)]
pub struct FingerprintCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl FingerprintCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), config)
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn key(&self, kind: ResultKind, fingerprint: &str) -> CacheKey {
        CacheKey::new(&self.config.namespace, kind, fingerprint)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw_key = key.to_string();
        let bytes = match self.backend.get(&raw_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %raw_key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %raw_key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key = %raw_key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %raw_key, error = %e, "cached payload unreadable, treating as miss");
                None
            }
        }
    }

    /// Store with the tier chosen by the key's result kind.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        self.put_with_ttl(key, value, key.ttl_class());
    }

    pub fn put_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, class: TtlClass) {
        let raw_key = key.to_string();
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %raw_key, error = %e, "failed to serialize cache payload");
                return;
            }
        };

        let ttl = class.ttl(&self.config);
        match self.backend.set(&raw_key, bytes, ttl) {
            Ok(()) => debug!(key = %raw_key, ttl_secs = ttl.as_secs(), "cached"),
            Err(e) => warn!(key = %raw_key, error = %e, "cache write failed"),
        }
    }

    pub fn evict(&self, key: &CacheKey) {
        let raw_key = key.to_string();
        if let Err(e) = self.backend.delete(&raw_key) {
            warn!(key = %raw_key, error = %e, "cache eviction failed");
        }
    }

    /// Evict every key in this namespace that starts with `prefix`, e.g.
    /// `"archive_scan:"`. Returns the number of keys removed.
    pub fn evict_pattern(&self, prefix: &str) -> usize {
        self.evict_raw_prefix(&format!("{}:{}", self.config.namespace, prefix))
    }

    /// Evict everything in this namespace.
    pub fn clear(&self) -> usize {
        self.evict_raw_prefix(&format!("{}:", self.config.namespace))
    }

    pub fn exists(&self, key: &CacheKey) -> bool {
        let raw_key = key.to_string();
        self.backend.exists(&raw_key).unwrap_or_else(|e| {
            warn!(key = %raw_key, error = %e, "cache lookup failed");
            false
        })
    }

    /// Number of live keys in this namespace.
    pub fn size(&self) -> usize {
        let prefix = format!("{}:", self.config.namespace);
        match self.backend.keys_with_prefix(&prefix) {
            Ok(keys) => keys.len(),
            Err(e) => {
                warn!(error = %e, "cache size unavailable");
                0
            }
        }
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// success. Errors from `compute` are returned and never cached.
    pub fn get_or_compute<T, E, F>(&self, key: &CacheKey, compute: F) -> Result<Lookup<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Lookup { value, hit: true });
        }
        let value = compute()?;
        self.put(key, &value);
        Ok(Lookup { value, hit: false })
    }

    fn evict_raw_prefix(&self, prefix: &str) -> usize {
        let keys = match self.backend.keys_with_prefix(prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "cache pattern eviction failed");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.backend.delete(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "cache eviction failed"),
            }
        }
        debug!(prefix, removed, "cache keys evicted");
        removed
    }
}
