//! Source classification of an extracted tree.

mod role;
mod walk;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::cli::{detect_language, Language};
use crate::config::DiscoveryConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};

pub use role::FileRole;
pub use walk::{relative_display, walk_source_files, WalkOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Forward-slash path relative to the scanned root.
    pub path: String,
    pub role: FileRole,
    pub language: Language,
}

#[derive(Debug, Default, Serialize)]
pub struct ClassifiedTree {
    pub files: Vec<SourceFile>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SourceClassifier {
    config: DiscoveryConfig,
}

impl SourceClassifier {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn scan(&self, root: &Path) -> ClassifiedTree {
        let started = Instant::now();
        let walked = walk_source_files(root, &self.config.excluded_dirs, |path| {
            detect_language(path).is_some()
        });

        let mut tree = ClassifiedTree {
            files: Vec::with_capacity(walked.files.len()),
            diagnostics: walked.diagnostics,
        };

        for path in walked.files {
            let relative = relative_display(root, &path);
            let Some(language) = detect_language(&path) else {
                continue;
            };

            if let Err(e) = File::open(&path) {
                debug!(path = %relative, error = %e, "skipping unreadable source file");
                tree.diagnostics
                    .push(Diagnostic::new(&relative, DiagnosticKind::Unreadable, e.to_string()));
                continue;
            }

            let role = FileRole::classify(&relative);
            tree.files.push(SourceFile {
                path: relative,
                role,
                language,
            });
        }

        info!(
            step = "classify",
            files = tree.files.len(),
            diagnostics = tree.diagnostics.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "source classification complete"
        );
        tree
    }
}

impl Default for SourceClassifier {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}
