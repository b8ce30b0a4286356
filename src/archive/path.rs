use std::path::{Component, Path, PathBuf};

use crate::error::SecurityViolation;

/// Resolve an archive entry name to a location strictly inside `root`.
///
/// Backslashes are treated as separators so Windows-style names cannot hide
/// traversal on Unix hosts. Absolute names, drive prefixes, UNC prefixes and
/// any `..` that climbs above the root are rejected, as is a name that
/// resolves to the root itself.
pub fn resolve_entry_path(root: &Path, entry_name: &str) -> Result<PathBuf, SecurityViolation> {
    if entry_name.contains('\0') {
        return Err(SecurityViolation::invalid_entry_name("contains NUL byte"));
    }
    if entry_name.chars().any(|c| c.is_control()) {
        return Err(SecurityViolation::invalid_entry_name(
            "contains control characters",
        ));
    }

    let unified = entry_name.replace('\\', "/");

    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(SecurityViolation::path_traversal(
            entry_name,
            lexical_join(root, &unified),
        ));
    }

    let mut relative = PathBuf::new();
    let mut depth = 0usize;

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => {
                relative.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(SecurityViolation::path_traversal(
                        entry_name,
                        lexical_join(root, &unified),
                    ));
                }
                relative.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityViolation::path_traversal(
                    entry_name,
                    lexical_join(root, &unified),
                ));
            }
        }
    }

    if depth == 0 {
        return Err(SecurityViolation::path_traversal(entry_name, root));
    }

    let resolved = root.join(relative);
    if !resolved.starts_with(root) || resolved == root {
        return Err(SecurityViolation::path_traversal(entry_name, resolved));
    }

    Ok(resolved)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Where a name would land if joined naively; only used for reporting.
fn lexical_join(root: &Path, name: &str) -> PathBuf {
    let mut result = PathBuf::new();
    for component in root.join(name.trim_start_matches('/')).components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other.as_os_str()),
        }
    }
    result
}
