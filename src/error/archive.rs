use std::path::PathBuf;
use thiserror::Error;

use super::IoError;

/// Input rejected before any extraction work begins.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("archive is empty")]
    Empty,

    #[error("archive size {size} exceeds maximum of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("input does not start with a zip signature")]
    InvalidSignature,
}

/// Hostile archive content. Always aborts the whole archive.
#[derive(Error, Debug)]
pub enum SecurityViolation {
    #[error("path traversal attempt in entry '{entry}' (resolves to {resolved})")]
    PathTraversal { entry: String, resolved: PathBuf },

    #[error("archive contains more than {limit} entries")]
    TooManyEntries { limit: usize },

    #[error("entry '{entry}' is {size} bytes, maximum is {limit}")]
    EntryTooLarge { entry: String, size: u64, limit: u64 },

    #[error("entry name is {length} characters, maximum is {limit}")]
    EntryNameTooLong { length: usize, limit: usize },

    #[error("invalid entry name: {reason}")]
    InvalidEntryName { reason: String },

    #[error("extracted content exceeds {limit} bytes in total")]
    TotalSizeExceeded { limit: u64 },
}

impl SecurityViolation {
    pub fn path_traversal(entry: impl Into<String>, resolved: impl Into<PathBuf>) -> Self {
        Self::PathTraversal {
            entry: entry.into(),
            resolved: resolved.into(),
        }
    }

    pub fn too_many_entries(limit: usize) -> Self {
        Self::TooManyEntries { limit }
    }

    pub fn entry_too_large(entry: impl Into<String>, size: u64, limit: u64) -> Self {
        Self::EntryTooLarge {
            entry: entry.into(),
            size,
            limit,
        }
    }

    pub fn invalid_entry_name(reason: impl Into<String>) -> Self {
        Self::InvalidEntryName {
            reason: reason.into(),
        }
    }

    /// Event name used for the security log line.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PathTraversal { .. } => "PATH_TRAVERSAL_ATTEMPT",
            Self::TooManyEntries { .. } => "ENTRY_COUNT_EXCEEDED",
            Self::EntryTooLarge { .. } => "ENTRY_SIZE_EXCEEDED",
            Self::EntryNameTooLong { .. } => "ENTRY_NAME_TOO_LONG",
            Self::InvalidEntryName { .. } => "INVALID_ENTRY_NAME",
            Self::TotalSizeExceeded { .. } => "TOTAL_SIZE_EXCEEDED",
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Security(#[from] SecurityViolation),

    #[error("corrupt archive: {message}")]
    Corrupt { message: String },

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("quarantine not found: {id}")]
    QuarantineNotFound { id: String },
}

impl ArchiveError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub fn quarantine_not_found(id: impl Into<String>) -> Self {
        Self::QuarantineNotFound { id: id.into() }
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::corrupt(err.to_string())
    }
}
