//! Secure code intake.
//!
//! Extracts untrusted zip uploads into quarantine directories under strict
//! resource and containment bounds, classifies the extracted sources, and
//! inventories their classes, methods, fields and functions. Results are
//! cached by content fingerprint.
pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod scanner;

pub use archive::{
    ArchiveGuard, ExtractionResult, ExtractionSummary, InputKind, Quarantine, QuarantineId,
};
pub use cache::{fingerprint, CacheBackend, CacheKey, FingerprintCache, ResultKind, TtlClass};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use discovery::{FileRole, SourceClassifier, SourceFile};
pub use error::{Error, Result};
pub use pipeline::{Analysis, Analyzer, Upload, UploadOutcome};
pub use scanner::{CodeElement, ElementKind, StructuralScanner, Visibility};
