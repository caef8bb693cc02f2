//! On-disk export tree
//!
//! ```text
//! <out>/<sanitized-did>/<collection>/<rkey>.json
//! <out>/<sanitized-did>/_blobs/<cid>
//! ```
//!
//! Directories are created on first use. Files are written in place with
//! no atomic rename.

use std::path::{Path, PathBuf};

use atproto_repo::ExtractedRecord;
use tracing::debug;

use crate::error::{ExportError, Result};

pub const BLOBS_DIR: &str = "_blobs";

/// Make a DID usable as a directory name: `did:plc:` → `did-plc-`,
/// `did:web:` → `did-web-`. Applying it twice changes nothing.
pub fn sanitize_did(did: &str) -> String {
    did.replacen("did:plc:", "did-plc-", 1)
        .replacen("did:web:", "did-web-", 1)
}

/// A single path component that cannot escape its parent
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

fn check_segment(segment: &str) -> Result<()> {
    if is_safe_segment(segment) {
        Ok(())
    } else {
        Err(ExportError::UnsafePath(segment.to_string()))
    }
}

/// Create `path` and its parents; existing directories are fine
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Writes one account's records and blobs below `<out>/<sanitized-did>`
#[derive(Debug)]
pub struct FileSink {
    root: PathBuf,
    records_written: usize,
}

impl FileSink {
    pub fn new(out_dir: &Path, did: &str) -> Result<Self> {
        let account = sanitize_did(did);
        check_segment(&account)?;

        Ok(Self {
            root: out_dir.join(account),
            records_written: 0,
        })
    }

    /// `<out>/<sanitized-did>`
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join(BLOBS_DIR)
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Write a record as compact JSON to `<collection>/<rkey>.json`
    pub async fn write_record(&mut self, record: &ExtractedRecord) -> Result<PathBuf> {
        check_segment(&record.collection)?;
        check_segment(&record.rkey)?;

        let dir = self.root.join(&record.collection);
        ensure_dir(&dir).await?;

        let path = dir.join(format!("{}.json", record.rkey));
        let body = serde_json::to_vec(&record.value)?;
        tokio::fs::write(&path, body).await?;

        debug!(path = %path.display(), "Wrote record");
        self.records_written += 1;
        Ok(path)
    }

    /// Write a blob to `_blobs/<cid>`
    pub async fn write_blob(&self, cid: &str, data: &[u8]) -> Result<PathBuf> {
        check_segment(cid)?;

        let dir = self.blobs_dir();
        ensure_dir(&dir).await?;

        let path = dir.join(cid);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}
