use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::detect::has_zip_signature;
use super::path::resolve_entry_path;
use super::{ArchiveEntry, ExtractionResult, Quarantine, QuarantineId};
use crate::config::ArchiveLimits;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{ArchiveError, IoError, SecurityViolation, ValidationError};
use crate::logging::SECURITY_TARGET;

/// Running totals for one archive, passed through each entry step by value.
#[derive(Debug, Default)]
struct ExtractionSession {
    entries_seen: usize,
    entries_written: usize,
    entries_skipped: usize,
    bytes_written: u64,
    warnings: Vec<Diagnostic>,
}

pub struct ArchiveGuard {
    limits: ArchiveLimits,
}

impl ArchiveGuard {
    pub fn new(limits: ArchiveLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ArchiveLimits {
        &self.limits
    }

    /// Checks that run before anything touches the filesystem.
    pub fn validate(&self, bytes: &[u8]) -> Result<(), ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::Empty);
        }
        let size = bytes.len() as u64;
        if size > self.limits.max_archive_size {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.limits.max_archive_size,
            });
        }
        if !has_zip_signature(bytes) {
            return Err(ValidationError::InvalidSignature);
        }
        Ok(())
    }

    /// Extract `bytes` into a new quarantine directory.
    ///
    /// The caller owns the returned quarantine and must [`release`] it. Any
    /// aborting condition deletes everything already written for this
    /// archive before the error is returned.
    ///
    /// [`release`]: ArchiveGuard::release
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ArchiveError> {
        let started = Instant::now();
        info!(size = bytes.len(), "starting secure archive extraction");

        self.validate(bytes)?;

        let quarantine_id = QuarantineId::generate();
        let root = self.limits.base_dir.join(quarantine_id.as_str());
        fs::create_dir_all(&root).map_err(|e| IoError::create_dir_error(&root, e))?;

        match self.extract_entries(bytes, &root) {
            Ok(session) => {
                info!(
                    quarantine = %quarantine_id,
                    written = session.entries_written,
                    skipped = session.entries_skipped,
                    bytes = session.bytes_written,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "archive extraction complete"
                );
                Ok(ExtractionResult {
                    quarantine_id,
                    root,
                    entries_written: session.entries_written,
                    entries_skipped: session.entries_skipped,
                    bytes_written: session.bytes_written,
                    warnings: session.warnings,
                })
            }
            Err(err) => {
                if let ArchiveError::Security(ref violation) = err {
                    error!(
                        target: SECURITY_TARGET,
                        event = violation.event_name(),
                        severity = "HIGH",
                        quarantine = %quarantine_id,
                        error = %violation,
                        "archive rejected"
                    );
                } else {
                    warn!(quarantine = %quarantine_id, error = %err, "archive extraction failed");
                }
                if let Err(cleanup) = fs::remove_dir_all(&root) {
                    error!(
                        quarantine = %quarantine_id,
                        error = %cleanup,
                        "failed to remove partial quarantine"
                    );
                }
                Err(err)
            }
        }
    }

    /// Extract and tie the quarantine's lifetime to the returned value.
    pub fn extract_scoped(&self, bytes: &[u8]) -> Result<Quarantine<'_>, ArchiveError> {
        let result = self.extract(bytes)?;
        Ok(Quarantine::new(self, result))
    }

    pub fn quarantine_root(&self, id: &QuarantineId) -> Result<PathBuf, ArchiveError> {
        let root = self.limits.base_dir.join(id.as_str());
        if root.is_dir() {
            Ok(root)
        } else {
            Err(ArchiveError::quarantine_not_found(id.as_str()))
        }
    }

    /// Delete a quarantine directory. Releasing an absent quarantine is not
    /// an error.
    pub fn release(&self, id: &QuarantineId) -> Result<(), ArchiveError> {
        let root = self.limits.base_dir.join(id.as_str());
        match fs::remove_dir_all(&root) {
            Ok(()) => {
                info!(quarantine = %id, "quarantine released");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(quarantine = %id, "quarantine already released");
                Ok(())
            }
            Err(e) => Err(IoError::remove_error(&root, e).into()),
        }
    }

    fn extract_entries(&self, bytes: &[u8], root: &Path) -> Result<ExtractionSession, ArchiveError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut session = ExtractionSession::default();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let entry = ArchiveEntry {
                name: file.name().to_string(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                is_dir: file.is_dir(),
            };
            session = self.extract_entry(session, &entry, &mut file, root)?;
        }

        Ok(session)
    }

    fn extract_entry<R: Read>(
        &self,
        mut session: ExtractionSession,
        entry: &ArchiveEntry,
        reader: &mut R,
        root: &Path,
    ) -> Result<ExtractionSession, ArchiveError> {
        session.entries_seen += 1;
        if session.entries_seen > self.limits.max_entries {
            return Err(SecurityViolation::too_many_entries(self.limits.max_entries).into());
        }

        if entry.name.trim().is_empty() {
            return Err(SecurityViolation::invalid_entry_name("empty entry name").into());
        }

        let name_length = entry.name.chars().count();
        if name_length > self.limits.max_path_length {
            return Err(SecurityViolation::EntryNameTooLong {
                length: name_length,
                limit: self.limits.max_path_length,
            }
            .into());
        }

        if entry.size > self.limits.max_entry_size {
            return Err(SecurityViolation::entry_too_large(
                &entry.name,
                entry.size,
                self.limits.max_entry_size,
            )
            .into());
        }

        let target = resolve_entry_path(root, &entry.name)?;

        if let Some(pattern) = self.suspicious_pattern(&entry.name) {
            warn!(
                target: SECURITY_TARGET,
                event = "SUSPICIOUS_ENTRY_NAME",
                severity = "MEDIUM",
                entry = %entry.name,
                pattern,
                "suspicious archive entry name"
            );
            session.warnings.push(Diagnostic::new(
                &entry.name,
                DiagnosticKind::SuspiciousName,
                format!("entry name contains '{pattern}'"),
            ));
        }

        if self.has_denied_extension(&entry.name) {
            warn!(
                target: SECURITY_TARGET,
                event = "DANGEROUS_FILE_SKIPPED",
                severity = "MEDIUM",
                entry = %entry.name,
                "skipping entry with denied extension"
            );
            session.entries_skipped += 1;
            session.warnings.push(Diagnostic::new(
                &entry.name,
                DiagnosticKind::DangerousExtension,
                "entry skipped: denied file extension",
            ));
            return Ok(session);
        }

        if entry.is_dir {
            fs::create_dir_all(&target).map_err(|e| IoError::create_dir_error(&target, e))?;
            return Ok(session);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| IoError::create_dir_error(parent, e))?;
        }

        let remaining = self
            .limits
            .max_total_extracted
            .saturating_sub(session.bytes_written);
        let entry_limited = self.limits.max_entry_size <= remaining;
        let cap = self.limits.max_entry_size.min(remaining);

        let written = write_capped(reader, &target, cap, &entry.name)?;
        if written > cap {
            return Err(if entry_limited {
                SecurityViolation::entry_too_large(&entry.name, written, self.limits.max_entry_size)
            } else {
                SecurityViolation::TotalSizeExceeded {
                    limit: self.limits.max_total_extracted,
                }
            }
            .into());
        }

        debug!(
            entry = %entry.name,
            declared = entry.size,
            compressed = entry.compressed_size,
            written,
            "entry extracted"
        );

        session.bytes_written += written;
        session.entries_written += 1;
        Ok(session)
    }

    fn has_denied_extension(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        match lower.rfind('.') {
            Some(dot) if dot > 0 => {
                let extension = &lower[dot + 1..];
                self.limits
                    .denied_extensions
                    .iter()
                    .any(|denied| denied == extension)
            }
            _ => false,
        }
    }

    fn suspicious_pattern(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.limits
            .suspicious_patterns
            .iter()
            .find(|pattern| lower.contains(pattern.as_str()))
            .map(|pattern| pattern.as_str())
    }
}

/// Copy at most `cap + 1` bytes so an overrun is detectable without reading
/// the rest of a lying entry.
fn write_capped<R: Read>(
    reader: &mut R,
    target: &Path,
    cap: u64,
    entry_name: &str,
) -> Result<u64, ArchiveError> {
    let file = File::create(target).map_err(|e| IoError::write_error(target, e))?;
    let mut writer = BufWriter::new(file);
    let mut limited = reader.take(cap.saturating_add(1));

    let written = io::copy(&mut limited, &mut writer).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ArchiveError::corrupt(format!("{entry_name}: {e}"))
        }
        _ => IoError::write_error(target, e).into(),
    })?;
    writer
        .flush()
        .map_err(|e| IoError::write_error(target, e))?;

    Ok(written)
}
