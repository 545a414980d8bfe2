//! Error taxonomy for depsync
//!
//! Only the failures that must stop a run live here. Everything that is
//! scoped to a single module during synchronization is reported as a
//! [`SyncIssue`](crate::sync::SyncIssue) instead.

use std::path::PathBuf;
use thiserror::Error;

/// A manifest that could not be read or understood.
#[derive(Debug, Error)]
pub enum ManifestParseError {
    #[error("could not read manifest '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// A working-tree inspection that failed outright.
#[derive(Debug, Error)]
#[error("could not classify '{}': {reason}", path.display())]
pub struct ClassificationError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ManifestParse(#[from] ManifestParseError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_carries_location() {
        let err = ManifestParseError::Malformed {
            path: PathBuf::from("Puppetfile.tracking"),
            line: 7,
            message: "expected 'mod' or 'moduledir'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Puppetfile.tracking:7: expected 'mod' or 'moduledir'"
        );
    }

    #[test]
    fn test_classification_error_wraps_transparently() {
        let err: Error = ClassificationError {
            path: PathBuf::from("modules/foo"),
            reason: "could not refresh index".to_string(),
        }
        .into();
        assert!(err.to_string().contains("could not refresh index"));
        assert!(matches!(err, Error::Classification(_)));
    }
}
