//! Verified repository snapshots
//!
//! `verify_repo` is the trust boundary: it checks the signed commit and
//! walks the whole MST (through `atrium_repo`'s tree, over digest-checked
//! blocks) before handing out anything. Records are only decoded from a
//! `VerifiedRepo`.

use atproto_identity::PublicKey;
use atrium_repo::mst::Tree;
use futures::stream::{self, Stream};
use futures::TryStreamExt;
use ipld_core::cid::Cid;
use serde_json::Value;
use tracing::{debug, info};

use crate::car::{open_car, CarBlocks};
use crate::commit::{Commit, SUPPORTED_VERSIONS};
use crate::error::{RepoError, Result};
use crate::record::decode_record;

/// One live record in the snapshot, as found in the MST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub collection: String,
    pub rkey: String,
    /// CID of the record block
    pub cid: Cid,
}

impl RecordWrite {
    /// Split an MST key of the form `<collection>/<rkey>`
    pub fn from_key(key: &str, cid: Cid) -> Result<Self> {
        let (collection, rkey) = split_record_key(key)?;
        Ok(Self {
            collection: collection.to_string(),
            rkey: rkey.to_string(),
            cid,
        })
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.rkey)
    }
}

/// Split `<collection>/<rkey>`, rejecting empty or nested parts
pub fn split_record_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('/') {
        Some((collection, rkey))
            if !collection.is_empty() && !rkey.is_empty() && !rkey.contains('/') =>
        {
            Ok((collection, rkey))
        }
        _ => Err(RepoError::InvalidRecordKey(key.to_string())),
    }
}

/// A record decoded to JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub collection: String,
    pub rkey: String,
    pub cid: Cid,
    pub value: Value,
}

/// An archive whose commit signature and tree have been checked
#[derive(Debug)]
pub struct VerifiedRepo {
    store: CarBlocks,
    commit: Commit,
    writes: Vec<RecordWrite>,
}

/// Verify the CAR bytes `car` as the repository of `did` signed by `key`.
///
/// Fails if the archive does not have exactly one root, the commit is
/// malformed, belongs to another account or carries a bad signature, or if
/// any MST node or record block is missing or does not match its CID.
pub async fn verify_repo(car: Vec<u8>, did: &str, key: &PublicKey) -> Result<VerifiedRepo> {
    let (mut store, roots) = open_car(car).await?;
    let root = match roots.as_slice() {
        [root] => *root,
        _ => {
            return Err(RepoError::Verification(format!(
                "expected exactly one root, found {}",
                roots.len()
            )))
        }
    };

    let commit_block = store.get(root).await.map_err(verification)?;
    let commit = Commit::from_block(&commit_block).map_err(verification)?;

    if !SUPPORTED_VERSIONS.contains(&commit.version) {
        return Err(RepoError::Verification(format!(
            "unsupported commit version {}",
            commit.version
        )));
    }
    if commit.did != did {
        return Err(RepoError::Verification(format!(
            "commit is for {}, expected {}",
            commit.did, did
        )));
    }
    if !commit.verify_signature(key)? {
        return Err(RepoError::Verification(format!(
            "commit signature does not match {} key",
            key.algorithm()
        )));
    }
    debug!(did = %did, rev = commit.rev.as_deref().unwrap_or("-"), "Commit signature valid");

    let leaves = mst_leaves(&mut store, commit.data).await.map_err(verification)?;

    let mut writes = Vec::with_capacity(leaves.len());
    let mut last_key: Option<&str> = None;
    for (key, cid) in &leaves {
        if last_key.is_some_and(|last| last >= key.as_str()) {
            return Err(RepoError::Verification(format!(
                "MST keys out of order at {key}"
            )));
        }
        store
            .get(*cid)
            .await
            .map_err(|e| RepoError::Verification(format!("record {key}: {e}")))?;

        writes.push(RecordWrite::from_key(key, *cid)?);
        last_key = Some(key.as_str());
    }

    info!(did = %did, records = writes.len(), "Verified repo");
    Ok(VerifiedRepo {
        store,
        commit,
        writes,
    })
}

/// Every `(key, record CID)` leaf of the MST at `root`, in key order
async fn mst_leaves(store: &mut CarBlocks, root: Cid) -> Result<Vec<(String, Cid)>> {
    let walked = Tree::open(&mut *store, root)
        .entries()
        .try_collect::<Vec<_>>()
        .await;

    walked.map_err(|e| match store.take_mismatch() {
        Some(cid) => RepoError::BlockDigestMismatch(cid),
        None => RepoError::Verification(format!("MST walk failed: {e}")),
    })
}

fn verification(err: RepoError) -> RepoError {
    match err {
        RepoError::Verification(_) => err,
        other => RepoError::Verification(other.to_string()),
    }
}

impl VerifiedRepo {
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Every live record in MST key order
    pub fn writes(&self) -> &[RecordWrite] {
        &self.writes
    }

    /// Decode records lazily, in MST key order. Single pass.
    pub fn records(self) -> impl Stream<Item = Result<ExtractedRecord>> {
        stream::unfold(
            (self.store, self.writes.into_iter()),
            |(mut store, mut writes)| async move {
                let write = writes.next()?;
                let record = match store.get(write.cid).await {
                    Ok(block) => decode_record(&block).map(|value| ExtractedRecord {
                        collection: write.collection,
                        rkey: write.rkey,
                        cid: write.cid,
                        value,
                    }),
                    Err(e) => Err(e),
                };
                Some((record, (store, writes)))
            },
        )
    }
}
