mod archive;
mod cache;
mod config;
mod io;
mod parser;

pub use archive::{ArchiveError, SecurityViolation, ValidationError};
pub use cache::CacheError;
pub use config::ConfigError;
pub use io::IoError;
pub use parser::ParserError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// True when the failure came from hostile archive content rather than
    /// malformed input or the environment.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Error::Archive(ArchiveError::Security(_)))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Archive(ArchiveError::Validation(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_violation_classification() {
        let err: Error = ArchiveError::from(SecurityViolation::too_many_entries(1000)).into();
        assert!(err.is_security_violation());
        assert!(!err.is_validation_error());
    }

    #[test]
    fn test_validation_error_classification() {
        let err: Error = ArchiveError::from(ValidationError::Empty).into();
        assert!(err.is_validation_error());
        assert_eq!(err.to_string(), "archive is empty");
    }
}
