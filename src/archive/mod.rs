//! Secure extraction of untrusted zip uploads into quarantine directories.

mod detect;
mod guard;
mod path;
mod quarantine;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostics::Diagnostic;

pub use detect::{has_zip_signature, InputKind, ZIP_SIGNATURES};
pub use guard::ArchiveGuard;
pub use path::resolve_entry_path;
pub use quarantine::{Quarantine, QuarantineId};

/// Metadata of one entry as declared by the archive. Sizes here are claims,
/// not facts; only bytes actually written are accounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub is_dir: bool,
}

/// A finished extraction and the live quarantine it was written to.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub quarantine_id: QuarantineId,
    pub root: PathBuf,
    /// Regular files written into the quarantine.
    pub entries_written: usize,
    pub entries_skipped: usize,
    pub bytes_written: u64,
    pub warnings: Vec<Diagnostic>,
}

/// Counters and warnings of an extraction, detached from its quarantine.
/// This is what outlives the quarantine in cached analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub entries_written: usize,
    pub entries_skipped: usize,
    pub bytes_written: u64,
    pub warnings: Vec<Diagnostic>,
}

impl From<&ExtractionResult> for ExtractionSummary {
    fn from(result: &ExtractionResult) -> Self {
        Self {
            entries_written: result.entries_written,
            entries_skipped: result.entries_skipped,
            bytes_written: result.bytes_written,
            warnings: result.warnings.clone(),
        }
    }
}
