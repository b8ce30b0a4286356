use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Files found under a root, plus whatever the walk could not inspect.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Collect regular files under `root` whose extension is accepted by
/// `accept`. Symbolic links are never followed or returned. A directory is
/// excluded only when one of its path segments equals an excluded name.
pub fn walk_source_files<F>(root: &Path, excluded_dirs: &[String], accept: F) -> WalkOutcome
where
    F: Fn(&Path) -> bool,
{
    let mut outcome = WalkOutcome::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !excluded_dirs.iter().any(|excluded| excluded.as_str() == name)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| relative_display(root, p))
                    .unwrap_or_else(|| root.display().to_string());
                outcome
                    .diagnostics
                    .push(Diagnostic::new(path, DiagnosticKind::WalkFailed, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if in_excluded_segment(root, entry.path(), excluded_dirs) {
            continue;
        }
        if accept(entry.path()) {
            outcome.files.push(entry.path().to_path_buf());
        }
    }

    outcome
}

fn in_excluded_segment(root: &Path, path: &Path, excluded_dirs: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        // The last component is the file name itself.
        if components.peek().is_none() {
            break;
        }
        if let Component::Normal(name) = component {
            let name = name.to_string_lossy();
            if excluded_dirs.iter().any(|excluded| excluded.as_str() == name) {
                return true;
            }
        }
    }
    false
}

/// Forward-slash path relative to `root`.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
