//! Error types for the exporter

use std::fmt;

use atproto_identity::IdentityError;
use atproto_repo::RepoError;
use atproto_sync_client::SyncError;

#[derive(Debug)]
pub enum ExportError {
    Identity(IdentityError),
    Sync(SyncError),
    Repo(RepoError),
    Io(std::io::Error),
    Json(String),
    UnsafePath(String),
    Config(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Identity(err) => write!(f, "{}", err),
            ExportError::Sync(err) => write!(f, "Sync error: {}", err),
            ExportError::Repo(err) => write!(f, "{}", err),
            ExportError::Io(err) => write!(f, "IO error: {}", err),
            ExportError::Json(msg) => write!(f, "JSON error: {}", msg),
            ExportError::UnsafePath(segment) => {
                write!(f, "Refusing to write outside the export directory: {}", segment)
            }
            ExportError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Identity(err) => Some(err),
            ExportError::Sync(err) => Some(err),
            ExportError::Repo(err) => Some(err),
            ExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IdentityError> for ExportError {
    fn from(err: IdentityError) -> Self {
        ExportError::Identity(err)
    }
}

impl From<SyncError> for ExportError {
    fn from(err: SyncError) -> Self {
        ExportError::Sync(err)
    }
}

impl From<RepoError> for ExportError {
    fn from(err: RepoError) -> Self {
        ExportError::Repo(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for ExportError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ExportError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_not_found_display() {
        let err: ExportError = IdentityError::HandleNotFound("alice.example".to_string()).into();
        assert_eq!(format!("{}", err), "Could not resolve handle: alice.example");
    }

    #[test]
    fn test_unsafe_path_display() {
        let err = ExportError::UnsafePath("..".to_string());
        assert_eq!(
            format!("{}", err),
            "Refusing to write outside the export directory: .."
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ExportError::Config("HTTP_TIMEOUT_SECS must be a number".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: HTTP_TIMEOUT_SECS must be a number"
        );
    }

    #[test]
    fn test_source_is_wrapped_error() {
        use std::error::Error;

        let err: ExportError = RepoError::Verification("bad signature".to_string()).into();
        assert!(err.source().is_some());
        assert!(ExportError::Json("eof".to_string()).source().is_none());
    }
}
