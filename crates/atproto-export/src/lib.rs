//! AT Protocol account exporter
//!
//! Resolves a handle or DID to its PDS, downloads and verifies the signed
//! repository, writes every record as JSON and downloads every blob.

pub mod blobs;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod sink;

pub use blobs::{BlobDownloader, BlobSummary};
pub use cli::Cli;
pub use config::{load_config, ExportConfig};
pub use error::{ExportError, Result};
pub use export::{ExportSummary, Exporter};
pub use sink::{sanitize_did, FileSink};
