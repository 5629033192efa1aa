use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the blood-pressure ledger.
///
/// Line-level parse problems are deliberately absent: a malformed pasted line
/// is dropped and recorded as a [`crate::normalizer::SkipReason`] instead.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written, renamed or removed.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A reporting window list could not be understood.
    #[error("Invalid window specification: {0}")]
    InvalidWindow(String),

    /// Processing was requested before an owner name was configured.
    #[error("User name is not set; configure it with --user-name before processing data")]
    MissingUserName,

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the ledger crates.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = LedgerError::FileRead {
            path: PathBuf::from("/data/ledger.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/ledger.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = LedgerError::FileWrite {
            path: PathBuf::from("/data/views/monthly"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to write file /data/views/monthly"));
        assert!(msg.contains("read-only"));
    }

    #[test]
    fn test_error_display_invalid_window() {
        let err = LedgerError::InvalidWindow("abc".to_string());
        assert_eq!(err.to_string(), "Invalid window specification: abc");
    }

    #[test]
    fn test_error_display_missing_user_name() {
        let msg = LedgerError::MissingUserName.to_string();
        assert!(msg.contains("User name is not set"));
        assert!(msg.contains("--user-name"));
    }

    #[test]
    fn test_error_display_config() {
        let err = LedgerError::Config("data dir is a file".to_string());
        assert_eq!(err.to_string(), "Configuration error: data dir is a file");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LedgerError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: LedgerError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
