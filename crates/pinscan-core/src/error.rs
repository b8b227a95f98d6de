use thiserror::Error;

/// Errors raised while analyzing one file of a repository.
///
/// `Parse` and `Io` are file-scoped: the scanner records them on the report
/// and moves on. `Internal` means an engine invariant broke on well-formed
/// input and aborts the scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file's grammar could not be parsed. Shell dialects the bash
    /// grammar does not understand are an accepted source of these.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// An engine invariant broke. Indicates a bug, not unusual input.
    #[error("internal error in {path}: {reason}")]
    Internal { path: String, reason: String },

    #[error("could not read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub fn parse(path: &str, reason: impl Into<String>) -> Self {
        ScanError::Parse {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn internal(path: &str, reason: impl Into<String>) -> Self {
        ScanError::Internal {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the scan may continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScanError::Parse { .. } | ScanError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_are_recoverable() {
        assert!(ScanError::parse("a/b.sh", "bad syntax").is_recoverable());
    }

    #[test]
    fn test_internal_errors_are_fatal() {
        assert!(!ScanError::internal("Dockerfile", "FROM without arguments").is_recoverable());
    }
}
