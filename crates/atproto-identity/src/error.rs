//! Error types for AT Protocol identity resolution

use std::fmt;

#[derive(Debug)]
pub enum IdentityError {
    Http(Box<reqwest::Error>),
    HandleNotFound(String),
    DidResolution(String),
    UnsupportedDidMethod(String),
    DidMismatch { expected: String, actual: String },
    NoHostingService(String),
    NoSigningKey(String),
    InvalidKey(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Http(err) => write!(f, "HTTP error: {}", err),
            IdentityError::HandleNotFound(handle) => {
                write!(f, "Could not resolve handle: {}", handle)
            }
            IdentityError::DidResolution(msg) => write!(f, "DID resolution error: {}", msg),
            IdentityError::UnsupportedDidMethod(did) => {
                write!(f, "Unsupported DID method: {}", did)
            }
            IdentityError::DidMismatch { expected, actual } => write!(
                f,
                "DID document is for {} but {} was requested",
                actual, expected
            ),
            IdentityError::NoHostingService(did) => {
                write!(f, "Could not resolve PDS for DID: {}", did)
            }
            IdentityError::NoSigningKey(did) => {
                write!(f, "No atproto signing key in DID document for {}", did)
            }
            IdentityError::InvalidKey(msg) => write!(f, "Invalid signing key: {}", msg),
        }
    }
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IdentityError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
