use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

use super::{ArchiveGuard, ExtractionResult};
use crate::error::ArchiveError;

/// Unguessable name of one quarantine directory.
///
/// Only constructed from a freshly generated or successfully parsed UUID, so
/// it can never address anything but a direct child of the base directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineId(String);

impl QuarantineId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value)
            .ok()
            .map(|uuid| Self(uuid.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuarantineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An extracted archive whose quarantine directory lives exactly as long as
/// this value. Dropping it (normally, on `?`, or while unwinding) deletes
/// the directory.
pub struct Quarantine<'g> {
    guard: &'g ArchiveGuard,
    result: ExtractionResult,
    released: bool,
}

impl<'g> Quarantine<'g> {
    pub(super) fn new(guard: &'g ArchiveGuard, result: ExtractionResult) -> Self {
        Self {
            guard,
            result,
            released: false,
        }
    }

    pub fn id(&self) -> &QuarantineId {
        &self.result.quarantine_id
    }

    pub fn root(&self) -> &Path {
        &self.result.root
    }

    pub fn result(&self) -> &ExtractionResult {
        &self.result
    }

    /// Release now and report failure instead of only logging it.
    pub fn release(mut self) -> Result<ExtractionResult, ArchiveError> {
        self.released = true;
        self.guard.release(&self.result.quarantine_id)?;
        Ok(self.result.clone())
    }
}

impl Drop for Quarantine<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.guard.release(&self.result.quarantine_id) {
            warn!(
                quarantine = %self.result.quarantine_id,
                error = %e,
                "failed to release quarantine"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = QuarantineId::generate();
        let b = QuarantineId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_parse_roundtrips_generated_id() {
        let id = QuarantineId::generate();
        assert_eq!(QuarantineId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_path_like_values() {
        assert!(QuarantineId::parse("../etc").is_none());
        assert!(QuarantineId::parse("").is_none());
        assert!(QuarantineId::parse("uploads/abc").is_none());
    }
}
