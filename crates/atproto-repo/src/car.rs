//! Repository CAR files
//!
//! Blocks are read through `atrium_repo`'s `CarStore`. `CheckedStore` sits in
//! front of any block store and refuses blocks whose bytes do not hash to
//! their CID, so everything read through it (commit, MST nodes, records) is
//! content-verified.

use std::io::Cursor;

use atrium_repo::blockstore::{self, AsyncBlockStoreRead, CarStore};
use ipld_core::cid::multihash::Multihash;
use ipld_core::cid::Cid;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{RepoError, Result};

/// Multicodec for DAG-CBOR blocks
pub const DAG_CBOR: u64 = 0x71;
/// Multicodec for raw blocks (blobs)
pub const RAW: u64 = 0x55;
/// Multihash code for sha2-256
pub const SHA2_256: u64 = 0x12;

/// Compute the CIDv1 of a block
pub fn cid_for(codec: u64, data: &[u8]) -> Result<Cid> {
    let digest = Sha256::digest(data);
    let hash = Multihash::<64>::wrap(SHA2_256, &digest)
        .map_err(|e| RepoError::Encode(e.to_string()))?;
    Ok(Cid::new_v1(codec, hash))
}

fn digest_matches(cid: &Cid, block: &[u8]) -> bool {
    let hash = cid.hash();
    hash.code() == SHA2_256 && hash.digest() == Sha256::digest(block).as_slice()
}

/// Blocks of a CAR file held in memory
pub type CarBlocks = CheckedStore<CarStore<Cursor<Vec<u8>>>>;

/// Index an in-memory CAR file. Returns the store and the header's roots.
pub async fn open_car(bytes: Vec<u8>) -> Result<(CarBlocks, Vec<Cid>)> {
    let size = bytes.len();
    let store = CarStore::open(Cursor::new(bytes))
        .await
        .map_err(|e| RepoError::Car(e.to_string()))?;
    let roots: Vec<Cid> = store.roots().collect();

    debug!(bytes = size, roots = roots.len(), "Opened CAR file");
    Ok((CheckedStore::new(store), roots))
}

/// Block store wrapper that checks every block against its sha2-256 CID
#[derive(Debug)]
pub struct CheckedStore<S> {
    inner: S,
    /// First block that failed the check since the last `take_mismatch`
    mismatch: Option<Cid>,
}

impl<S: AsyncBlockStoreRead + Send> CheckedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            mismatch: None,
        }
    }

    /// Read one verified block
    pub async fn get(&mut self, cid: Cid) -> Result<Vec<u8>> {
        match AsyncBlockStoreRead::read_block(self, cid).await {
            Ok(block) => Ok(block),
            Err(e) => Err(self.read_error(cid, e)),
        }
    }

    /// The block that caused the last read failure, if it was a bad digest
    pub(crate) fn take_mismatch(&mut self) -> Option<Cid> {
        self.mismatch.take()
    }

    fn read_error(&mut self, cid: Cid, err: blockstore::Error) -> RepoError {
        if let Some(bad) = self.take_mismatch() {
            return RepoError::BlockDigestMismatch(bad);
        }
        match err {
            blockstore::Error::CidNotFound => RepoError::MissingBlock(cid),
            other => RepoError::Car(other.to_string()),
        }
    }
}

impl<S: AsyncBlockStoreRead + Send> AsyncBlockStoreRead for CheckedStore<S> {
    async fn read_block_into(
        &mut self,
        cid: Cid,
        contents: &mut Vec<u8>,
    ) -> std::result::Result<(), blockstore::Error> {
        self.inner.read_block_into(cid, contents).await?;
        if !digest_matches(&cid, contents) {
            warn!(cid = %cid, "Block content does not match its CID");
            self.mismatch.get_or_insert(cid);
            contents.clear();
            // A block with the wrong bytes is as good as absent
            return Err(blockstore::Error::CidNotFound);
        }
        Ok(())
    }
}
