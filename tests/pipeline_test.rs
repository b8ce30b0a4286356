mod fixtures;

use codeintake::cache::SledBackend;
use codeintake::cli::Language;
use codeintake::config::{ArchiveLimits, Config};
use codeintake::error::{ArchiveError, Error, IoError, ParserError, SecurityViolation};
use codeintake::pipeline::{Analysis, Analyzer, Upload};
use codeintake::scanner::languages::JavaScanner;
use codeintake::scanner::{CodeElement, LanguageScanner, ScannerRegistry, StructuralScanner};
use codeintake::{DiagnosticKind, FingerprintCache, InputKind, ResultKind};
use std::fs;
use fixtures::{create_test_zip, files_under, get_test_fixture_path, project_zip};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct CountingJavaScanner {
    calls: Arc<AtomicUsize>,
}

impl LanguageScanner for CountingJavaScanner {
    fn language(&self) -> Language {
        Language::Java
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        JavaScanner.scan(source, file_path)
    }
}

fn config_in(dir: &TempDir) -> Config {
    Config {
        archive: ArchiveLimits {
            base_dir: dir.path().join("uploads"),
            ..ArchiveLimits::default()
        },
        ..Config::default()
    }
}

fn analyzer_in(dir: &TempDir) -> Analyzer {
    let config = config_in(dir);
    Analyzer::new(&config, FingerprintCache::in_memory(config.cache.clone()))
}

fn counting_analyzer(dir: &TempDir, cache: FingerprintCache) -> (Analyzer, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ScannerRegistry::new();
    registry.register(Box::new(CountingJavaScanner {
        calls: Arc::clone(&calls),
    }));
    let analyzer = Analyzer::new(&config_in(dir), cache)
        .with_scanner(StructuralScanner::with_registry(registry));
    (analyzer, calls)
}

#[test]
fn test_archive_analysis_end_to_end() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    let analysis = analyzer.analyze_archive(&project_zip()).unwrap();

    assert!(!analysis.cached);
    assert_eq!(analysis.fingerprint.len(), 64);
    assert_eq!(analysis.extraction.entries_written, 5);
    assert_eq!(analysis.files.len(), 5);
    assert_eq!(analysis.scan.element_count(), 24);
    assert!(analysis.scan.diagnostics.is_empty());
    assert!(analysis
        .scan
        .elements
        .iter()
        .any(|e| e.name == "UserController" && e.file_path.ends_with("UserController.java")));

    // The quarantine only lives for the duration of the scan.
    assert!(files_under(&dir.path().join("uploads")).is_empty());
}

#[test]
fn test_identical_archive_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let cache = FingerprintCache::in_memory(config.cache.clone());
    let (analyzer, calls) = counting_analyzer(&dir, cache);
    let archive = project_zip();

    let first = analyzer.analyze_archive(&archive).unwrap();
    let scans_after_first = calls.load(Ordering::SeqCst);
    let second = analyzer.analyze_archive(&archive).unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(scans_after_first, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.scan, second.scan);
    assert_eq!(first.files, second.files);
    assert_eq!(first.extraction, second.extraction);
    assert_eq!(second.extraction.entries_written, 5);

    assert!(analyzer.cache().exists(&analyzer.archive_key(&first.fingerprint)));
}

#[test]
fn test_cached_archive_not_reused_under_stricter_limits() {
    let dir = TempDir::new().unwrap();
    let loose = config_in(&dir);
    let strict = Config {
        archive: ArchiveLimits {
            max_entries: 1,
            ..loose.archive.clone()
        },
        ..loose.clone()
    };
    let cache = FingerprintCache::in_memory(loose.cache.clone());
    let archive = create_test_zip(vec![
        ("A.java", b"class A {}".as_slice()),
        ("B.java", b"class B {}".as_slice()),
    ]);

    let accepted = Analyzer::new(&loose, cache.clone())
        .analyze_archive(&archive)
        .unwrap();
    let strict_analyzer = Analyzer::new(&strict, cache.clone());
    let rejected = strict_analyzer.analyze_archive(&archive).unwrap_err();

    assert!(!accepted.cached);
    assert!(matches!(
        rejected,
        ArchiveError::Security(SecurityViolation::TooManyEntries { limit: 1 })
    ));
    assert!(!strict_analyzer
        .cache()
        .exists(&strict_analyzer.archive_key(&accepted.fingerprint)));

    let again = Analyzer::new(&loose, cache).analyze_archive(&archive).unwrap();
    assert!(again.cached);
}

#[test]
fn test_quarantine_location_does_not_split_cache() {
    let dir = TempDir::new().unwrap();
    let first_config = config_in(&dir);
    let second_config = Config {
        archive: ArchiveLimits {
            base_dir: dir.path().join("elsewhere"),
            ..first_config.archive.clone()
        },
        ..first_config.clone()
    };
    let cache = FingerprintCache::in_memory(first_config.cache.clone());
    let archive = project_zip();

    Analyzer::new(&first_config, cache.clone())
        .analyze_archive(&archive)
        .unwrap();
    let second = Analyzer::new(&second_config, cache)
        .analyze_archive(&archive)
        .unwrap();

    assert!(second.cached);
}

#[test]
fn test_changed_archive_is_rescanned() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let (analyzer, calls) =
        counting_analyzer(&dir, FingerprintCache::in_memory(config.cache.clone()));

    let v1 = create_test_zip(vec![("App.java", b"class App {}".as_slice())]);
    let v2 = create_test_zip(vec![("App.java", b"class App { void run() {} }".as_slice())]);

    let first = analyzer.analyze_archive(&v1).unwrap();
    let second = analyzer.analyze_archive(&v2).unwrap();

    assert!(!second.cached);
    assert_ne!(first.fingerprint, second.fingerprint);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(second.scan.element_count(), 2);
}

#[test]
fn test_evicted_archive_is_recomputed() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let archive = project_zip();

    let first = analyzer.analyze_archive(&archive).unwrap();
    let removed = analyzer.cache().evict_pattern(ResultKind::ArchiveScan.as_str());
    let again = analyzer.analyze_archive(&archive).unwrap();

    assert_eq!(removed, 1);
    assert!(!again.cached);
    assert_eq!(first.scan, again.scan);
}

#[test]
fn test_persistent_cache_shared_between_analyzers() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let backend = Arc::new(SledBackend::open(dir.path().join("cache")).unwrap());
    let archive = project_zip();

    let first = Analyzer::new(
        &config,
        FingerprintCache::new(backend.clone(), config.cache.clone()),
    )
    .analyze_archive(&archive)
    .unwrap();
    let second = Analyzer::new(&config, FingerprintCache::new(backend, config.cache.clone()))
        .analyze_archive(&archive)
        .unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.scan, second.scan);
}

#[test]
fn test_failed_archive_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let archive = create_test_zip(vec![("../../evil.txt", b"pwned".as_slice())]);

    for _ in 0..2 {
        let err = analyzer.analyze_archive(&archive).unwrap_err();
        assert!(matches!(err, ArchiveError::Security(_)));
    }
    assert_eq!(analyzer.cache().size(), 0);
}

#[test]
fn test_single_source_analysis_and_cache() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let source = b"public class Greeter {\n    public String greet() { return \"hi\"; }\n}\n";

    let first = analyzer.analyze_source("Greeter.java", source).unwrap();
    let second = analyzer.analyze_source("Copy.java", source).unwrap();

    assert_eq!(first.language, Language::Java);
    assert_eq!(first.elements.len(), 2);
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.file_name, "Copy.java");
}

#[test]
fn test_cached_source_points_at_new_file_name() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let source = b"public class A {
    public void run() {}
}
";

    let first = analyzer.analyze_source("first/A.java", source).unwrap();
    let second = analyzer.analyze_source("second/B.java", source).unwrap();

    assert!(second.cached);
    let paths: Vec<&str> = second.elements.iter().map(|e| e.file_path.as_str()).collect();
    assert_eq!(paths, vec!["second/B.java", "second/B.java"]);
    let first_paths: Vec<&str> = first.elements.iter().map(|e| e.file_path.as_str()).collect();
    assert_eq!(first_paths, vec!["first/A.java", "first/A.java"]);
}

#[test]
fn test_cached_parse_failure_points_at_new_file_name() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let source = b"public class Broken {";

    analyzer.analyze_source("old/Broken.java", source).unwrap();
    let again = analyzer.analyze_source("new/Broken.java", source).unwrap();

    assert!(again.cached);
    assert_eq!(again.diagnostics.len(), 1);
    assert_eq!(again.diagnostics[0].path, "new/Broken.java");
    assert!(!again.diagnostics[0].message.contains("old/"));
}

#[test]
fn test_same_bytes_different_language_not_shared() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let source = b"class Shared {}";

    let java = analyzer.analyze_source("Shared.java", source).unwrap();
    let kotlin = analyzer.analyze_source("Shared.kt", source).unwrap();

    assert!(!kotlin.cached);
    assert_eq!(java.language, Language::Java);
    assert_eq!(kotlin.language, Language::Kotlin);
}

#[test]
fn test_unparseable_source_reports_diagnostic() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    let analysis = analyzer
        .analyze_source("Broken.java", b"public class Broken {")
        .unwrap();

    assert!(analysis.elements.is_empty());
    assert_eq!(analysis.diagnostics.len(), 1);
    assert_eq!(analysis.diagnostics[0].kind, DiagnosticKind::ParseFailed);
}

#[test]
fn test_unsupported_source_rejected() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    let err = analyzer.analyze_source("main.go", b"package main").unwrap_err();
    assert!(matches!(err, ParserError::UnsupportedLanguage { .. }));
}

#[test]
fn test_directory_analysis() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    let analysis = analyzer
        .analyze_directory(&get_test_fixture_path("project"))
        .unwrap();

    assert_eq!(analysis.files.len(), 5);
    assert_eq!(analysis.scan.element_count(), 24);
    assert!(analysis.root.ends_with("project"));
}

#[test]
fn test_missing_directory_rejected() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    assert!(analyzer
        .analyze_directory(&dir.path().join("missing"))
        .is_err());
}

#[test]
fn test_batch_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let uploads = vec![
        Upload::new("project.zip", project_zip()),
        Upload::new(
            "evil.zip",
            create_test_zip(vec![
                ("ok.txt", b"fine".as_slice()),
                ("../../evil.txt", b"pwned".as_slice()),
            ]),
        ),
        Upload::new("App.java", b"public class App {}".to_vec()),
        Upload::new("diagram.png", b"\x89PNG\r\n".to_vec()),
        Upload::new("notes.txt", b"hello".to_vec()),
        Upload::new("fake.zip", b"not a zip".to_vec()),
    ];

    let outcomes = analyzer.analyze_batch(&uploads);

    let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["project.zip", "evil.zip", "App.java", "diagram.png", "notes.txt", "fake.zip"]
    );

    match &outcomes[0].result {
        Ok(Analysis::Archive(archive)) => assert_eq!(archive.scan.element_count(), 24),
        other => panic!("expected archive analysis, got {other:?}"),
    }

    let err = outcomes[1].result.as_ref().unwrap_err();
    assert!(err.is_security_violation());

    match &outcomes[2].result {
        Ok(Analysis::Source(source)) => assert_eq!(source.elements[0].name, "App"),
        other => panic!("expected source analysis, got {other:?}"),
    }

    assert!(matches!(
        outcomes[3].result,
        Ok(Analysis::NotAnalyzed {
            kind: InputKind::Visual
        })
    ));
    assert!(matches!(
        outcomes[4].result,
        Ok(Analysis::NotAnalyzed {
            kind: InputKind::Unsupported
        })
    ));

    // Content decides the kind, not the name: this is not an archive at all.
    assert!(matches!(
        outcomes[5].result,
        Ok(Analysis::NotAnalyzed {
            kind: InputKind::Unsupported
        })
    ));

    assert!(files_under(&dir.path().join("uploads")).is_empty());
    assert!(!dir.path().join("evil.txt").exists());
}

#[test]
fn test_unreadable_path_does_not_stop_other_paths() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);
    let good = dir.path().join("App.java");
    fs::write(&good, "public class App {}").unwrap();
    let missing = dir.path().join("Missing.java");
    let project = get_test_fixture_path("project");

    let outcomes = analyzer.analyze_paths(&[missing.clone(), good.clone(), project]);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].name, good.display().to_string());
    assert!(matches!(outcomes[0].result, Ok(Analysis::Source(_))));

    assert_eq!(outcomes[1].name, missing.display().to_string());
    assert!(matches!(
        outcomes[1].result,
        Err(Error::Io(IoError::ReadError { .. }))
    ));

    match &outcomes[2].result {
        Ok(Analysis::Project(project)) => assert_eq!(project.scan.element_count(), 24),
        other => panic!("expected project analysis, got {other:?}"),
    }
}

#[test]
fn test_empty_upload_fails_validation() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer_in(&dir);

    let err = analyzer.analyze_archive(b"").unwrap_err();
    assert!(Error::from(err).is_validation_error());
}
