//! Error types for repository archive handling

use std::fmt;

use ipld_core::cid::Cid;

#[derive(Debug)]
pub enum RepoError {
    Car(String),
    MissingBlock(Cid),
    BlockDigestMismatch(Cid),
    Decode(String),
    Encode(String),
    Verification(String),
    InvalidRecordKey(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::Car(msg) => write!(f, "Invalid CAR file: {}", msg),
            RepoError::MissingBlock(cid) => write!(f, "Block {} missing from archive", cid),
            RepoError::BlockDigestMismatch(cid) => {
                write!(f, "Block content does not match CID {}", cid)
            }
            RepoError::Decode(msg) => write!(f, "DAG-CBOR decode error: {}", msg),
            RepoError::Encode(msg) => write!(f, "DAG-CBOR encode error: {}", msg),
            RepoError::Verification(msg) => write!(f, "Repo verification failed: {}", msg),
            RepoError::InvalidRecordKey(key) => write!(f, "Invalid record path: {}", key),
        }
    }
}

impl std::error::Error for RepoError {}

pub type Result<T> = std::result::Result<T, RepoError>;
