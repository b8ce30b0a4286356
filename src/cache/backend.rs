use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::error::CacheError;

/// Key-value store with per-key expiry and prefix enumeration.
///
/// Implementations must be safe for concurrent use; no operation spans more
/// than one key atomically.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a live entry was removed.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Live keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: SystemTime,
}

impl CacheEntry {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

/// Process-local backend. Expired entries are dropped when touched.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::backend("memory cache lock poisoned"))
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.lock()?;
        let now = SystemTime::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = SystemTime::now() + ttl;
        self.lock()?
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.lock()?.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(SystemTime::now())))
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut entries = self.lock()?;
        let now = SystemTime::now();
        entries.retain(|_, entry| entry.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Persistent backend on an embedded sled database.
///
/// Each value is stored behind an 8-byte big-endian expiry timestamp in
/// milliseconds since the Unix epoch.
pub struct SledBackend {
    db: sled::Db,
}

const EXPIRY_HEADER: usize = 8;

impl SledBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Temporary database removed when dropped.
    pub fn temporary() -> Result<Self, CacheError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn decode(raw: &[u8], now_ms: u64) -> Result<Option<Vec<u8>>, CacheError> {
        if raw.len() < EXPIRY_HEADER {
            return Err(CacheError::Deserialize(
                "cache entry shorter than expiry header".to_string(),
            ));
        }
        let (header, payload) = raw.split_at(EXPIRY_HEADER);
        let mut expiry = [0u8; EXPIRY_HEADER];
        expiry.copy_from_slice(header);
        if u64::from_be_bytes(expiry) > now_ms {
            Ok(Some(payload.to_vec()))
        } else {
            Ok(None)
        }
    }
}

impl Drop for SledBackend {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            warn!(error = %e, "failed to flush cache database");
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl CacheBackend for SledBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(raw) = self.db.get(key)? else {
            return Ok(None);
        };
        match Self::decode(&raw, now_millis())? {
            Some(value) => Ok(Some(value)),
            None => {
                self.db.remove(key)?;
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = now_millis().saturating_add(ttl.as_millis() as u64);
        let mut raw = Vec::with_capacity(EXPIRY_HEADER + value.len());
        raw.extend_from_slice(&expires_at.to_be_bytes());
        raw.extend_from_slice(&value);
        self.db.insert(key, raw)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        match self.db.remove(key)? {
            Some(raw) => Ok(Self::decode(&raw, now_millis())?.is_some()),
            None => Ok(false),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = now_millis();
        let mut keys = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (key, raw) = entry?;
            match Self::decode(&raw, now) {
                Ok(Some(_)) => keys.push(String::from_utf8_lossy(&key).into_owned()),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "removing malformed cache entry"
                    );
                    self.db.remove(&key)?;
                }
            }
        }
        Ok(keys)
    }
}
