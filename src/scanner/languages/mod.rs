use std::path::Path;

use crate::cli::Language;
use crate::error::ParserError;

use super::element::CodeElement;

pub mod java;
pub mod javascript;
pub mod kotlin;
pub mod php;

pub use java::JavaScanner;
pub use javascript::{JavaScriptScanner, TypeScriptScanner};
pub use kotlin::KotlinScanner;
pub use php::PhpScanner;

/// Turns the text of one source file into code elements.
pub trait LanguageScanner: Send + Sync {
    fn language(&self) -> Language;

    /// Lowercase extensions this scanner claims, without the dot.
    fn extensions(&self) -> &'static [&'static str] {
        self.language().extensions()
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError>;
}

pub struct ScannerRegistry {
    scanners: Vec<Box<dyn LanguageScanner>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            scanners: Vec::new(),
        };

        registry.register(Box::new(JavaScanner));
        registry.register(Box::new(KotlinScanner));
        registry.register(Box::new(JavaScriptScanner));
        registry.register(Box::new(TypeScriptScanner));
        registry.register(Box::new(PhpScanner));
        registry
    }

    pub fn empty() -> Self {
        Self {
            scanners: Vec::new(),
        }
    }

    /// Later registrations win for extensions claimed twice.
    pub fn register(&mut self, scanner: Box<dyn LanguageScanner>) {
        self.scanners.insert(0, scanner);
    }

    pub fn for_extension(&self, extension: &str) -> Option<&dyn LanguageScanner> {
        let extension = extension.to_lowercase();
        self.scanners
            .iter()
            .find(|s| s.extensions().contains(&extension.as_str()))
            .map(|s| s.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn LanguageScanner> {
        let extension = path.extension()?.to_str()?;
        self.for_extension(extension)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.scanners.iter().map(|s| s.language()).collect()
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
