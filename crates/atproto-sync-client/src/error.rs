//! Error types for the AT Protocol sync client

use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    Http(Box<reqwest::Error>),
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
    },
    Json(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Http(err) => write!(f, "HTTP error: {}", err),
            SyncError::Status { method, status } => {
                write!(f, "{} returned status {}", method, status)
            }
            SyncError::Json(msg) => write!(f, "JSON parse error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Http(Box::new(err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
