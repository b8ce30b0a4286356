use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

use crate::cli::OutputFormat;
use crate::diagnostics::Diagnostic;
use crate::error::{ArchiveError, Error};
use crate::pipeline::{Analysis, UploadOutcome};
use crate::scanner::CodeElement;

#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub inputs: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub total_elements: usize,
    pub results: Vec<ResultEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry<'a> {
    pub input: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<&'a Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub category: &'static str,
    pub message: String,
}

impl ErrorEntry {
    fn from_error(error: &Error) -> Self {
        let category = match error {
            Error::Archive(ArchiveError::Validation(_)) => "validation",
            Error::Archive(ArchiveError::Security(_)) => "security",
            Error::Archive(_) => "archive",
            Error::Parser(_) => "parser",
            Error::Io(_) => "io",
            Error::Cache(_) => "cache",
            Error::Config(_) => "config",
        };
        Self {
            category,
            message: error.to_string(),
        }
    }
}

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format(outcomes: &[UploadOutcome], format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                let output = Self::build_output(outcomes);
                Ok(serde_json::to_string_pretty(&output)?)
            }
            OutputFormat::Text => Ok(Self::format_text(outcomes)),
        }
    }

    pub fn build_output(outcomes: &[UploadOutcome]) -> JsonOutput<'_> {
        let results: Vec<ResultEntry> = outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(analysis) => ResultEntry {
                    input: &outcome.name,
                    status: "ok",
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => ResultEntry {
                    input: &outcome.name,
                    status: "failed",
                    analysis: None,
                    error: Some(ErrorEntry::from_error(e)),
                },
            })
            .collect();

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        let total_elements = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|a| a.elements().len())
            .sum();

        JsonOutput {
            inputs: outcomes.len(),
            analyzed: outcomes.len() - failed,
            failed,
            total_elements,
            results,
        }
    }

    fn format_text(outcomes: &[UploadOutcome]) -> String {
        let mut out = String::new();
        for outcome in outcomes {
            match &outcome.result {
                Ok(analysis) => Self::write_analysis(&mut out, &outcome.name, analysis),
                Err(e) => {
                    let entry = ErrorEntry::from_error(e);
                    let _ = writeln!(out, "{} [failed: {}]", outcome.name, entry.category);
                    let _ = writeln!(out, "  {}", entry.message);
                }
            }
            out.push('\n');
        }
        out
    }

    fn write_analysis(out: &mut String, name: &str, analysis: &Analysis) {
        let diagnostics: &[Diagnostic] = match analysis {
            Analysis::Archive(a) => {
                let _ = writeln!(
                    out,
                    "{name} [archive{}] {} files, {} entries written, {} skipped",
                    if a.cached { ", cached" } else { "" },
                    a.files.len(),
                    a.extraction.entries_written,
                    a.extraction.entries_skipped,
                );
                for warning in &a.extraction.warnings {
                    let _ = writeln!(out, "  ! {warning}");
                }
                &a.scan.diagnostics
            }
            Analysis::Source(s) => {
                let _ = writeln!(
                    out,
                    "{name} [{}{}]",
                    s.language.as_str(),
                    if s.cached { ", cached" } else { "" }
                );
                &s.diagnostics
            }
            Analysis::Project(p) => {
                let _ = writeln!(out, "{name} [directory] {} files", p.files.len());
                &p.scan.diagnostics
            }
            Analysis::NotAnalyzed { kind } => {
                let _ = writeln!(out, "{name} [not analyzed: {kind:?}]");
                &[]
            }
        };

        for element in analysis.elements() {
            let _ = writeln!(out, "  {}", describe(element));
        }
        for diagnostic in diagnostics {
            let _ = writeln!(out, "  ! {diagnostic}");
        }
    }
}

fn describe(element: &CodeElement) -> String {
    let name = match &element.owner {
        Some(owner) if !element.kind.is_type() => format!("{owner}.{}", element.name),
        _ => element.name.clone(),
    };
    format!(
        "{:<9} {:<40} {:<11} {}:{}",
        element.kind.as_str(),
        name,
        element.visibility.as_str(),
        element.file_path,
        element.line
    )
}
