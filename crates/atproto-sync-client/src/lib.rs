//! AT Protocol Sync Client
//!
//! Talks to an account's PDS over the `com.atproto.sync` XRPC methods:
//! full repository download as a CAR file, blob listing and blob download.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SyncClient, LIST_BLOBS_PAGE_SIZE};
pub use error::{Result, SyncError};
pub use types::ListBlobsPage;
