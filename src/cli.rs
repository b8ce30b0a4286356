use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    Java,
    Kotlin,
    Javascript,
    Typescript,
    Php,
}

#[derive(Parser, Debug)]
#[command(name = "codeintake")]
#[command(about = "Secure code intake - extract uploads and inventory their code structure", long_about = None)]
pub struct Args {
    /// Zip archive, source file or directory to analyze. Can be specified multiple times.
    #[arg(long, value_name = "PATH", required = true)]
    pub path: Vec<PathBuf>,

    /// Config file (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Persist the result cache in this directory (in-memory if not specified)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Clear the result cache before analyzing
    #[arg(long)]
    pub clear_cache: bool,

    /// Base directory for quarantine directories
    #[arg(long, value_name = "DIR")]
    pub quarantine_dir: Option<PathBuf>,

    /// Maximum number of entries per archive
    #[arg(long, value_name = "N")]
    pub max_entries: Option<usize>,

    /// Maximum size of a single archive entry in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_entry_size: Option<u64>,

    /// Output file path (prints to stdout if not specified)
    #[arg(short = 'O', long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Output format (json, text)
    #[arg(short = 'f', long, default_value = "json")]
    pub format: OutputFormat,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        for path in &self.path {
            validate_path(path)?;
        }
        if let Some(ref config_path) = self.config {
            if !config_path.exists() {
                anyhow::bail!("Config file does not exist: {}", config_path.display());
            }
        }
        Ok(())
    }

    /// Resolve the effective configuration: file values first, then flags.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(ref dir) = self.quarantine_dir {
            config.archive.base_dir = dir.clone();
        }
        if let Some(max_entries) = self.max_entries {
            config.archive.max_entries = max_entries;
        }
        if let Some(max_entry_size) = self.max_entry_size {
            config.archive.max_entry_size = max_entry_size;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

pub fn detect_language(file_path: &Path) -> Option<Language> {
    let ext = file_path.extension()?.to_str()?.to_lowercase();
    Language::from_extension(&ext)
}

pub fn validate_path(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        std::fs::metadata(path).with_context(|| format!("Cannot read file: {}", path.display()))?;
    } else if path.is_dir() {
        std::fs::metadata(path)
            .with_context(|| format!("Cannot read directory: {}", path.display()))?;
    } else {
        anyhow::bail!("Path is neither a file nor a directory: {}", path.display());
    }

    Ok(())
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Java,
        Language::Kotlin,
        Language::Javascript,
        Language::Typescript,
        Language::Php,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Php => "php",
        }
    }

    /// Lowercase file extensions, without the leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::Kotlin => &["kt", "kts"],
            Language::Javascript => &["js", "jsx", "mjs", "cjs"],
            Language::Typescript => &["ts", "tsx"],
            Language::Php => &["php"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args_for(path: PathBuf) -> Args {
        Args {
            path: vec![path],
            config: None,
            cache_dir: None,
            clear_cache: false,
            quarantine_dir: None,
            max_entries: None,
            max_entry_size: None,
            output_file: None,
            format: OutputFormat::Json,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_detect_language_java() {
        assert_eq!(detect_language(Path::new("App.java")), Some(Language::Java));
    }

    #[test]
    fn test_detect_language_kotlin() {
        assert_eq!(detect_language(Path::new("App.kt")), Some(Language::Kotlin));
        assert_eq!(
            detect_language(Path::new("build.gradle.kts")),
            Some(Language::Kotlin)
        );
    }

    #[test]
    fn test_detect_language_javascript_and_typescript() {
        assert_eq!(
            detect_language(Path::new("index.js")),
            Some(Language::Javascript)
        );
        assert_eq!(
            detect_language(Path::new("page.tsx")),
            Some(Language::Typescript)
        );
    }

    #[test]
    fn test_detect_language_case_insensitive() {
        assert_eq!(detect_language(Path::new("Legacy.PHP")), Some(Language::Php));
    }

    #[test]
    fn test_detect_language_unknown() {
        assert_eq!(detect_language(Path::new("notes.txt")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_language_as_str() {
        assert_eq!(Language::Java.as_str(), "java");
        assert_eq!(Language::Kotlin.as_str(), "kotlin");
        assert_eq!(Language::Javascript.as_str(), "javascript");
        assert_eq!(Language::Typescript.as_str(), "typescript");
        assert_eq!(Language::Php.as_str(), "php");
    }

    #[test]
    fn test_output_format_as_str() {
        assert_eq!(OutputFormat::Json.as_str(), "json");
        assert_eq!(OutputFormat::Text.as_str(), "text");
    }

    #[test]
    fn test_validate_path_not_exists() {
        let path = Path::new("/nonexistent/path/that/does/not/exist");
        assert!(validate_path(path).is_err());
    }

    #[test]
    fn test_args_validate_all_valid() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("App.java");
        fs::write(&file_path, "class App {}").unwrap();

        assert!(args_for(file_path).validate().is_ok());
    }

    #[test]
    fn test_args_validate_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args_for(temp_dir.path().to_path_buf());
        args.config = Some(temp_dir.path().join("missing.yaml"));

        assert!(args.validate().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args_for(temp_dir.path().to_path_buf());
        args.max_entries = Some(5);
        args.quarantine_dir = Some(temp_dir.path().join("q"));

        let config = args.load_config().unwrap();
        assert_eq!(config.archive.max_entries, 5);
        assert_eq!(config.archive.base_dir, temp_dir.path().join("q"));
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args_for(temp_dir.path().to_path_buf());
        args.max_entries = Some(0);

        assert!(args.load_config().is_err());
    }
}
