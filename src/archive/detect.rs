use serde::Serialize;
use std::path::Path;

use crate::cli::{detect_language, Language};

/// Local file header, empty archive, and spanned archive markers.
pub const ZIP_SIGNATURES: [&[u8; 4]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

const PDF_SIGNATURE: &[u8] = b"%PDF-";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// What an uploaded file is, decided from its content first and its name
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "language")]
pub enum InputKind {
    ZipArchive,
    Source(Language),
    /// Diagrams and documents are interpreted by another service.
    Visual,
    Unsupported,
}

impl InputKind {
    pub fn detect(file_name: &str, bytes: &[u8]) -> Self {
        if has_zip_signature(bytes) {
            return InputKind::ZipArchive;
        }
        if bytes.starts_with(PDF_SIGNATURE) || is_image_name(file_name) {
            return InputKind::Visual;
        }
        match detect_language(Path::new(file_name)) {
            Some(language) => InputKind::Source(language),
            None => InputKind::Unsupported,
        }
    }
}

pub fn has_zip_signature(bytes: &[u8]) -> bool {
    ZIP_SIGNATURES
        .iter()
        .any(|signature| bytes.starts_with(&signature[..]))
}

fn is_image_name(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
