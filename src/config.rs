use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveLimits,
    pub discovery: DiscoveryConfig,
    pub cache: CacheConfig,
}

/// Resource and containment bounds applied to every uploaded archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLimits {
    /// Directory under which one quarantine directory per archive is created.
    #[serde(skip_serializing)]
    pub base_dir: PathBuf,
    pub max_archive_size: u64,
    pub max_entry_size: u64,
    pub max_entries: usize,
    pub max_path_length: usize,
    /// Bytes actually written across all entries of one archive.
    pub max_total_extracted: u64,
    /// Lowercase extensions, without the leading dot.
    pub denied_extensions: Vec<String>,
    /// Lowercase substrings that flag an entry name without rejecting it.
    pub suspicious_patterns: Vec<String>,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("uploads"),
            max_archive_size: 100 * MIB,
            max_entry_size: 10 * MIB,
            max_entries: 1000,
            max_path_length: 260,
            max_total_extracted: 500 * MIB,
            denied_extensions: [
                "exe", "bat", "cmd", "com", "pif", "scr", "vbs", "jar", "app", "deb", "pkg",
                "dmg", "rpm",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            suspicious_patterns: ["~", "$", "system32", "windows", "program files"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory names excluded by exact path-segment match.
    pub excluded_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: ["target", "build", "node_modules", ".git", ".idea", "dist", "out"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub namespace: String,
    pub short_ttl_secs: u64,
    pub default_ttl_secs: u64,
    pub long_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "codeintake".to_string(),
            short_ttl_secs: 30 * 60,
            default_ttl_secs: 60 * 60,
            long_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn short_ttl(&self) -> Duration {
        Duration::from_secs(self.short_ttl_secs)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn long_ttl(&self) -> Duration {
        Duration::from_secs(self.long_ttl_secs)
    }
}

impl Config {
    /// Load a config file, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::read_error(path, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: Config = match extension.as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?,
            other => return Err(ConfigError::unsupported_format(other)),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive.max_entries == 0 {
            return Err(ConfigError::invalid_value(
                "archive.max_entries",
                "must be greater than zero",
            ));
        }
        if self.archive.max_entry_size == 0 {
            return Err(ConfigError::invalid_value(
                "archive.max_entry_size",
                "must be greater than zero",
            ));
        }
        if self.cache.namespace.is_empty() || self.cache.namespace.contains(':') {
            return Err(ConfigError::invalid_value(
                "cache.namespace",
                "must be non-empty and must not contain ':'",
            ));
        }
        Ok(())
    }
}
