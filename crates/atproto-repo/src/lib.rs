//! AT Protocol repository archives
//!
//! Reads a `com.atproto.sync.getRepo` CAR export through `atrium_repo`,
//! checks every block against its CID, verifies the signed commit with the
//! account's key, walks the Merkle Search Tree and decodes records to JSON.

#[cfg(any(test, feature = "test-utils"))]
pub mod builder;
pub mod car;
pub mod commit;
pub mod error;
pub mod record;
pub mod repo;

#[cfg(any(test, feature = "test-utils"))]
pub use builder::RepoBuilder;
pub use car::{cid_for, open_car, CarBlocks, CheckedStore};
pub use commit::Commit;
pub use error::{RepoError, Result};
pub use ipld_core::cid::Cid;
pub use ipld_core::ipld::Ipld;
pub use record::{decode_record, ipld_to_json};
pub use repo::{split_record_key, verify_repo, ExtractedRecord, RecordWrite, VerifiedRepo};
