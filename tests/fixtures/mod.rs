#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn get_test_fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644)
}

/// In-memory zip of `(name, content)` pairs, stored uncompressed.
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    for (name, data) in entries {
        builder = builder.add_file(name, data);
    }
    builder.build()
}

/// Zip every file under `dir`, named by its forward-slash relative path.
pub fn zip_directory(dir: &Path) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        builder = builder.add_file(&relative, &std::fs::read(entry.path()).unwrap());
    }
    builder.build()
}

pub fn project_zip() -> Vec<u8> {
    zip_directory(&get_test_fixture_path("project"))
}

pub struct ZipTestBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        self.zip.start_file(path, stored()).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    pub fn add_directory(mut self, path: &str) -> Self {
        self.zip
            .add_directory(path, SimpleFileOptions::default().unix_permissions(0o755))
            .unwrap();
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

const CENTRAL_DIRECTORY_HEADER: [u8; 4] = *b"PK\x01\x02";

/// One deflated entry whose local and central headers both claim
/// `declared` uncompressed bytes while the stream inflates to all of `data`.
pub fn zip_with_understated_size(name: &str, data: &[u8], declared: u32) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();
    let size = declared.to_le_bytes();

    // The only local header starts the archive.
    assert_eq!(&bytes[..4], b"PK\x03\x04");
    bytes[22..26].copy_from_slice(&size);

    let central = bytes
        .windows(4)
        .rposition(|window| window == CENTRAL_DIRECTORY_HEADER)
        .expect("central directory header not found");
    bytes[central + 24..central + 28].copy_from_slice(&size);
    bytes
}

/// Every regular file below `dir`.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect()
}
