use sha2::{Digest, Sha256};

use crate::error::CacheError;
use crate::scanner::CodeElement;

/// Lowercase hex SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Order-independent fingerprint of a structural result set.
///
/// Elements are sorted by name, then file path, then kind, and finally by
/// their full serialized form so that duplicates across files still sort
/// the same way on every run.
pub fn fingerprint_elements(elements: &[CodeElement]) -> Result<String, CacheError> {
    let mut keyed = elements
        .iter()
        .map(|element| {
            serde_json::to_string(element)
                .map(|json| (element, json))
                .map_err(|e| CacheError::Serialize(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort_by(|(a, a_json), (b, b_json)| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a_json.cmp(b_json))
    });

    let mut hasher = Sha256::new();
    for (_, json) in &keyed {
        hasher.update(json.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}
