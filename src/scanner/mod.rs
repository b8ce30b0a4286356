//! Structural scanning: source text in, code elements out.

pub mod element;
pub mod heuristic;
pub mod languages;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::discovery::SourceFile;
use crate::error::ParserError;

pub use element::{CodeElement, ElementKind, Parameter, Visibility};
pub use languages::{LanguageScanner, ScannerRegistry};

/// Elements of a whole project plus the files that could not be scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScan {
    pub elements: Vec<CodeElement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectScan {
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn merge(&mut self, other: ProjectScan) {
        self.elements.extend(other.elements);
        self.diagnostics.extend(other.diagnostics);
    }
}

pub struct StructuralScanner {
    registry: ScannerRegistry,
}

impl StructuralScanner {
    pub fn new() -> Self {
        Self::with_registry(ScannerRegistry::new())
    }

    pub fn with_registry(registry: ScannerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ScannerRegistry {
        &self.registry
    }

    /// Scan text already in memory; the scanner is picked by `file_path`'s
    /// extension.
    pub fn scan_source(
        &self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<CodeElement>, ParserError> {
        let scanner = self
            .registry
            .for_path(Path::new(file_path))
            .ok_or_else(|| ParserError::unsupported_language(file_path))?;
        trace!(file_path, language = scanner.language().as_str(), "scanning source");
        scanner.scan(source, file_path)
    }

    /// Scan one classified file under `root`. Never fails: every problem,
    /// including a panicking scanner, becomes a diagnostic.
    pub fn scan_file(&self, root: &Path, file: &SourceFile) -> ProjectScan {
        let mut outcome = ProjectScan::default();

        let bytes = match fs::read(root.join(&file.path)) {
            Ok(bytes) => bytes,
            Err(e) => {
                outcome.diagnostics.push(Diagnostic::new(
                    &file.path,
                    DiagnosticKind::Unreadable,
                    e.to_string(),
                ));
                return outcome;
            }
        };

        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(_) => {
                outcome.diagnostics.push(Diagnostic::new(
                    &file.path,
                    DiagnosticKind::ParseFailed,
                    ParserError::invalid_encoding(&file.path).to_string(),
                ));
                return outcome;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.scan_source(&file.path, &source))) {
            Ok(Ok(elements)) => {
                debug!(file = %file.path, elements = elements.len(), "file scanned");
                outcome.elements = elements;
            }
            Ok(Err(e)) => {
                debug!(file = %file.path, error = %e, "file scan failed");
                outcome.diagnostics.push(Diagnostic::new(
                    &file.path,
                    DiagnosticKind::ParseFailed,
                    e.to_string(),
                ));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(file = %file.path, error = %message, "scanner panicked");
                outcome.diagnostics.push(Diagnostic::new(
                    &file.path,
                    DiagnosticKind::ParseFailed,
                    format!("scanner panicked: {message}"),
                ));
            }
        }

        outcome
    }

    /// Scan every file in parallel. Results are merged in the order of
    /// `files`, each file's elements in declaration order.
    pub fn scan_project(&self, root: &Path, files: &[SourceFile]) -> ProjectScan {
        let started = Instant::now();

        let per_file: Vec<ProjectScan> = files
            .par_iter()
            .map(|file| self.scan_file(root, file))
            .collect();

        let mut project = ProjectScan::default();
        for outcome in per_file {
            project.merge(outcome);
        }

        info!(
            step = "scan",
            files = files.len(),
            elements = project.elements.len(),
            diagnostics = project.diagnostics.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "structural scan complete"
        );
        project
    }
}

impl Default for StructuralScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
