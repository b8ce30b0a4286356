use std::fmt;
use std::time::Duration;

use crate::config::CacheConfig;

/// Retention tier for a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Short,
    Default,
    Long,
}

impl TtlClass {
    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        match self {
            TtlClass::Short => config.short_ttl(),
            TtlClass::Default => config.default_ttl(),
            TtlClass::Long => config.long_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultKind {
    ArchiveScan,
    ProjectScan,
    FileScan,
    Extraction,
    Ocr,
    Image,
    Custom(String),
}

impl ResultKind {
    /// A caller-defined kind. Separators are replaced so the kind stays one
    /// key segment.
    pub fn custom(name: &str) -> Self {
        ResultKind::Custom(name.replace(':', "_").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultKind::ArchiveScan => "archive_scan",
            ResultKind::ProjectScan => "project_scan",
            ResultKind::FileScan => "file_scan",
            ResultKind::Extraction => "extraction",
            ResultKind::Ocr => "ocr",
            ResultKind::Image => "image",
            ResultKind::Custom(name) => name,
        }
    }

    /// Archive and project work is the most expensive and its input never
    /// changes; visual results are rarely reused.
    pub fn ttl_class(&self) -> TtlClass {
        match self {
            ResultKind::ArchiveScan | ResultKind::ProjectScan | ResultKind::Extraction => {
                TtlClass::Long
            }
            ResultKind::Ocr | ResultKind::Image => TtlClass::Short,
            ResultKind::FileScan => TtlClass::Default,
            ResultKind::Custom(name) => {
                if ["zip", "archive", "project"].iter().any(|m| name.contains(m)) {
                    TtlClass::Long
                } else if ["ocr", "image"].iter().any(|m| name.contains(m)) {
                    TtlClass::Short
                } else {
                    TtlClass::Default
                }
            }
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `namespace:kind:fingerprint`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub kind: ResultKind,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(namespace: &str, kind: ResultKind, fingerprint: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kind,
            fingerprint: fingerprint.to_string(),
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        self.kind.ttl_class()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.kind, self.fingerprint)
    }
}
