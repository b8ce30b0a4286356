use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Archive entry skipped because its extension is on the denylist.
    DangerousExtension,
    /// Archive entry name matched a suspicious pattern; extraction continued.
    SuspiciousName,
    /// Source file could not be read.
    Unreadable,
    /// Source file could not be parsed or scanned.
    ParseFailed,
    /// Directory walk hit an entry it could not inspect.
    WalkFailed,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DangerousExtension => "dangerous_extension",
            DiagnosticKind::SuspiciousName => "suspicious_name",
            DiagnosticKind::Unreadable => "unreadable",
            DiagnosticKind::ParseFailed => "parse_failed",
            DiagnosticKind::WalkFailed => "walk_failed",
        }
    }
}

/// A non-fatal problem recorded alongside an otherwise successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.kind.as_str(), self.message)
    }
}
