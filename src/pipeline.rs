//! Upload analysis: extraction, classification and scanning, with the
//! fingerprint cache around the expensive part.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveGuard, ExtractionSummary, InputKind};
use crate::cache::{fingerprint, CacheKey, FingerprintCache, ResultKind};
use crate::cli::{detect_language, Language};
use crate::config::{ArchiveLimits, Config, DiscoveryConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::discovery::{SourceClassifier, SourceFile};
use crate::error::{ArchiveError, Error, IoError, ParserError};
use crate::scanner::{CodeElement, ProjectScan, StructuralScanner};

/// One uploaded file as delivered by the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self, IoError> {
        let bytes = fs::read(path).map_err(|e| IoError::read_error(path, e))?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

/// Version of the extraction, classification and scanning output. Bump it
/// whenever cached analyses would no longer match a fresh run.
const ANALYSIS_VERSION: u32 = 1;

/// Everything besides the input bytes that shapes an archive analysis.
/// The quarantine base directory is excluded: it never reaches the result.
#[derive(Debug, Serialize)]
struct AnalysisSettings<'a> {
    version: u32,
    archive: &'a ArchiveLimits,
    discovery: &'a DiscoveryConfig,
}

impl AnalysisSettings<'_> {
    fn fingerprint(&self) -> String {
        let encoded =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        fingerprint(&encoded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveAnalysis {
    /// SHA-256 of the archive bytes.
    pub fingerprint: String,
    pub extraction: ExtractionSummary,
    pub files: Vec<SourceFile>,
    pub scan: ProjectScan,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAnalysis {
    pub file_name: String,
    pub fingerprint: String,
    pub language: Language,
    pub elements: Vec<CodeElement>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub cached: bool,
}

impl SourceAnalysis {
    /// Point the analysis, its elements and its diagnostics at `name`.
    /// Cached source results are keyed by content, so a hit may carry the
    /// name it was first scanned under.
    fn relabel(&mut self, name: &str) {
        if self.file_name == name {
            return;
        }
        self.file_name = name.to_string();
        for element in &mut self.elements {
            element.file_path = name.to_string();
        }
        for diagnostic in &mut self.diagnostics {
            diagnostic.path = name.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectAnalysis {
    pub root: String,
    pub files: Vec<SourceFile>,
    pub scan: ProjectScan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Analysis {
    Archive(ArchiveAnalysis),
    Source(SourceAnalysis),
    Project(ProjectAnalysis),
    /// Recognized but handled by another service, or not recognized at all.
    NotAnalyzed { kind: InputKind },
}

impl Analysis {
    pub fn elements(&self) -> &[CodeElement] {
        match self {
            Analysis::Archive(a) => &a.scan.elements,
            Analysis::Source(s) => &s.elements,
            Analysis::Project(p) => &p.scan.elements,
            Analysis::NotAnalyzed { .. } => &[],
        }
    }
}

/// Result for one upload of a batch. Failures stay scoped to their upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub name: String,
    pub result: Result<Analysis, Error>,
}

pub struct Analyzer {
    guard: ArchiveGuard,
    classifier: SourceClassifier,
    scanner: StructuralScanner,
    cache: FingerprintCache,
    settings: String,
}

impl Analyzer {
    pub fn new(config: &Config, cache: FingerprintCache) -> Self {
        let settings = AnalysisSettings {
            version: ANALYSIS_VERSION,
            archive: &config.archive,
            discovery: &config.discovery,
        }
        .fingerprint();
        Self {
            guard: ArchiveGuard::new(config.archive.clone()),
            classifier: SourceClassifier::new(config.discovery.clone()),
            scanner: StructuralScanner::new(),
            cache,
            settings,
        }
    }

    pub fn with_scanner(mut self, scanner: StructuralScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn guard(&self) -> &ArchiveGuard {
        &self.guard
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    /// Cache key of an archive analysis. Analyzers with different limits or
    /// discovery settings never share entries for the same archive.
    pub fn archive_key(&self, archive_fingerprint: &str) -> CacheKey {
        let identity = format!("{}:{}", self.settings, archive_fingerprint);
        self.cache
            .key(ResultKind::ArchiveScan, &fingerprint(identity.as_bytes()))
    }

    fn source_key(&self, language: Language, bytes: &[u8]) -> CacheKey {
        let mut identity = Vec::with_capacity(bytes.len() + 32);
        identity.extend_from_slice(&ANALYSIS_VERSION.to_be_bytes());
        identity.extend_from_slice(language.as_str().as_bytes());
        identity.push(0);
        identity.extend_from_slice(bytes);
        self.cache.key(ResultKind::FileScan, &fingerprint(&identity))
    }

    /// Extract, classify and scan one archive. Identical archive bytes are
    /// served from the cache; the quarantine exists only while the scan runs.
    pub fn analyze_archive(&self, bytes: &[u8]) -> Result<ArchiveAnalysis, ArchiveError> {
        let started = Instant::now();
        self.guard.validate(bytes)?;

        let digest = fingerprint(bytes);
        let key = self.archive_key(&digest);
        let lookup = self
            .cache
            .get_or_compute(&key, || self.scan_archive(bytes, &digest))?;

        let mut analysis = lookup.value;
        analysis.cached = lookup.hit;

        info!(
            step = "analyze_archive",
            fingerprint = %digest,
            cached = analysis.cached,
            files = analysis.files.len(),
            elements = analysis.scan.elements.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "archive analyzed"
        );
        Ok(analysis)
    }

    fn scan_archive(&self, bytes: &[u8], digest: &str) -> Result<ArchiveAnalysis, ArchiveError> {
        let quarantine = self.guard.extract_scoped(bytes)?;

        let tree = self.classifier.scan(quarantine.root());
        let scan = self.scanner.scan_project(quarantine.root(), &tree.files);

        let mut diagnostics = tree.diagnostics;
        diagnostics.extend(scan.diagnostics);

        let extraction = ExtractionSummary::from(quarantine.result());
        drop(quarantine);

        Ok(ArchiveAnalysis {
            fingerprint: digest.to_string(),
            extraction,
            files: tree.files,
            scan: ProjectScan {
                elements: scan.elements,
                diagnostics,
            },
            cached: false,
        })
    }

    /// Scan a single uploaded source file. Parse problems are reported as
    /// diagnostics on an otherwise empty result.
    pub fn analyze_source(&self, name: &str, bytes: &[u8]) -> Result<SourceAnalysis, ParserError> {
        let language =
            detect_language(Path::new(name)).ok_or_else(|| ParserError::unsupported_language(name))?;

        let digest = fingerprint(bytes);
        // The scanner is chosen by extension, so the language is part of
        // the result's identity; the file name is not.
        let key = self.source_key(language, bytes);

        let lookup = self.cache.get_or_compute(&key, || {
            Ok::<_, ParserError>(self.scan_source(name, language, bytes, &digest))
        })?;

        let mut analysis = lookup.value;
        analysis.relabel(name);
        analysis.cached = lookup.hit;
        Ok(analysis)
    }

    fn scan_source(&self, name: &str, language: Language, bytes: &[u8], digest: &str) -> SourceAnalysis {
        let mut analysis = SourceAnalysis {
            file_name: name.to_string(),
            fingerprint: digest.to_string(),
            language,
            elements: Vec::new(),
            diagnostics: Vec::new(),
            cached: false,
        };

        match std::str::from_utf8(bytes) {
            Ok(source) => match self.scanner.scan_source(name, source) {
                Ok(elements) => analysis.elements = elements,
                Err(e) => analysis.diagnostics.push(Diagnostic::new(
                    name,
                    DiagnosticKind::ParseFailed,
                    parse_failure_message(&e),
                )),
            },
            Err(_) => analysis.diagnostics.push(Diagnostic::new(
                name,
                DiagnosticKind::ParseFailed,
                "source is not valid UTF-8",
            )),
        }
        analysis
    }

    /// Classify and scan a directory already on disk. Not cached: the tree
    /// may change between calls.
    pub fn analyze_directory(&self, path: &Path) -> Result<ProjectAnalysis, IoError> {
        if !path.is_dir() {
            return Err(IoError::directory_not_found(path));
        }
        let tree = self.classifier.scan(path);
        let scan = self.scanner.scan_project(path, &tree.files);

        let mut diagnostics = tree.diagnostics;
        diagnostics.extend(scan.diagnostics);

        Ok(ProjectAnalysis {
            root: path.display().to_string(),
            files: tree.files,
            scan: ProjectScan {
                elements: scan.elements,
                diagnostics,
            },
        })
    }

    pub fn analyze_upload(&self, upload: &Upload) -> Result<Analysis, Error> {
        match InputKind::detect(&upload.name, &upload.bytes) {
            InputKind::ZipArchive => Ok(Analysis::Archive(self.analyze_archive(&upload.bytes)?)),
            InputKind::Source(_) => Ok(Analysis::Source(
                self.analyze_source(&upload.name, &upload.bytes)?,
            )),
            kind => {
                info!(upload = %upload.name, ?kind, "upload not analyzed");
                Ok(Analysis::NotAnalyzed { kind })
            }
        }
    }

    /// Analyze files and directories named on the command line. Readable
    /// files are analyzed as one batch, in input order, followed by files
    /// that could not be read and then by directories.
    pub fn analyze_paths(&self, paths: &[PathBuf]) -> Vec<UploadOutcome> {
        let mut uploads = Vec::new();
        let mut unreadable = Vec::new();
        let mut directories = Vec::new();
        for path in paths {
            if path.is_dir() {
                directories.push(path);
                continue;
            }
            match Upload::read(path) {
                Ok(upload) => uploads.push(upload),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "upload could not be read");
                    unreadable.push(UploadOutcome {
                        name: path.display().to_string(),
                        result: Err(Error::from(e)),
                    });
                }
            }
        }

        let mut outcomes = self.analyze_batch(&uploads);
        outcomes.extend(unreadable);
        for dir in directories {
            debug!(path = %dir.display(), "analyzing directory");
            outcomes.push(UploadOutcome {
                name: dir.display().to_string(),
                result: self
                    .analyze_directory(dir)
                    .map(Analysis::Project)
                    .map_err(Error::from),
            });
        }
        outcomes
    }

    /// Analyze uploads concurrently, one outcome per upload in input order.
    pub fn analyze_batch(&self, uploads: &[Upload]) -> Vec<UploadOutcome> {
        let started = Instant::now();
        let outcomes: Vec<UploadOutcome> = uploads
            .par_iter()
            .map(|upload| {
                let result = self.analyze_upload(upload);
                if let Err(ref e) = result {
                    warn!(upload = %upload.name, error = %e, "upload analysis failed");
                }
                UploadOutcome {
                    name: upload.name.clone(),
                    result,
                }
            })
            .collect();

        info!(
            step = "analyze_batch",
            uploads = uploads.len(),
            failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "batch analyzed"
        );
        outcomes
    }
}

/// Diagnostic text for a failed single-file scan. The path lives in the
/// diagnostic itself and is left out here so cached results can be relabeled.
fn parse_failure_message(error: &ParserError) -> String {
    match error {
        ParserError::ParseFailed { .. } => "failed to parse source code".to_string(),
        ParserError::InvalidEncoding { .. } => "source is not valid UTF-8".to_string(),
        ParserError::UnsupportedLanguage { .. } => "no scanner for this language".to_string(),
        other => other.to_string(),
    }
}
