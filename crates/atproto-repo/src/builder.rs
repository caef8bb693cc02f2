//! Assemble signed repository CAR files
//!
//! Fixtures for tests here and in dependent crates (`test-utils` feature).
//! The MST is built with `atrium_repo`'s tree, so roots match what a PDS
//! would produce for the same records.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Cursor;

use atrium_repo::blockstore::{
    AsyncBlockStoreRead, AsyncBlockStoreWrite, CarStore, MemoryBlockStore,
};
use atrium_repo::mst::Tree;
use ipld_core::cid::Cid;
use serde::Serialize;

use crate::car::{cid_for, DAG_CBOR, SHA2_256};
use crate::commit::Commit;
use crate::error::{RepoError, Result};
use crate::repo::split_record_key;

/// Leaf of the tree: its CID and, unless left dangling, the block to store
type Leaf = (Cid, Option<(u64, Vec<u8>)>);

pub struct RepoBuilder {
    did: String,
    rev: String,
    records: BTreeMap<String, Leaf>,
}

impl RepoBuilder {
    pub fn new(did: &str, rev: &str) -> Self {
        Self {
            did: did.to_string(),
            rev: rev.to_string(),
            records: BTreeMap::new(),
        }
    }

    /// Add (or replace) the record at `<collection>/<rkey>`
    pub fn add_record<T: Serialize>(
        &mut self,
        collection: &str,
        rkey: &str,
        value: &T,
    ) -> Result<Cid> {
        let block = serde_ipld_dagcbor::to_vec(value).map_err(encode)?;
        self.add_block(collection, rkey, DAG_CBOR, block)
    }

    /// Point `<collection>/<rkey>` at an arbitrary block
    pub fn add_block(
        &mut self,
        collection: &str,
        rkey: &str,
        codec: u64,
        block: Vec<u8>,
    ) -> Result<Cid> {
        let cid = cid_for(codec, &block)?;
        self.insert(collection, rkey, (cid, Some((codec, block))))?;
        Ok(cid)
    }

    /// Point `<collection>/<rkey>` at a CID whose block is left out of the CAR
    pub fn add_dangling(&mut self, collection: &str, rkey: &str, cid: Cid) -> Result<()> {
        self.insert(collection, rkey, (cid, None))
    }

    fn insert(&mut self, collection: &str, rkey: &str, leaf: Leaf) -> Result<()> {
        let key = format!("{collection}/{rkey}");
        split_record_key(&key)?;
        self.records.insert(key, leaf);
        Ok(())
    }

    /// Build the CAR file. `sign` receives the unsigned commit bytes and
    /// returns a 64-byte compact signature.
    pub async fn build<F>(self, sign: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        // The header needs the commit CID up front, so the tree is built
        // once in memory to learn its root
        let data = self.write_tree(&mut MemoryBlockStore::new()).await?;

        let mut commit = Commit {
            did: self.did.clone(),
            version: 3,
            data,
            rev: Some(self.rev.clone()),
            prev: None,
            sig: Vec::new(),
        };
        commit.sig = sign(&commit.unsigned_bytes()?);
        let commit_block = commit.to_bytes()?;
        let root = cid_for(DAG_CBOR, &commit_block)?;

        let mut out = Cursor::new(Vec::new());
        {
            let mut car = CarStore::create_with_roots(&mut out, [root])
                .await
                .map_err(encode)?;
            car.write_block(DAG_CBOR, SHA2_256, &commit_block)
                .await
                .map_err(encode)?;
            let written = self.write_tree(&mut car).await?;
            if written != data {
                return Err(RepoError::Encode(format!(
                    "MST root changed between passes: {data} vs {written}"
                )));
            }
        }
        Ok(out.into_inner())
    }

    /// Store every record block and the MST; returns the tree root
    async fn write_tree<S>(&self, store: &mut S) -> Result<Cid>
    where
        S: AsyncBlockStoreRead + AsyncBlockStoreWrite,
    {
        for (_, block) in self.records.values() {
            if let Some((codec, bytes)) = block {
                store
                    .write_block(*codec, SHA2_256, bytes)
                    .await
                    .map_err(encode)?;
            }
        }

        let mut tree = Tree::create(&mut *store).await.map_err(encode)?;
        for (key, (cid, _)) in &self.records {
            tree.add(key, *cid).await.map_err(encode)?;
        }
        Ok(tree.root())
    }
}

fn encode<E: Display>(err: E) -> RepoError {
    RepoError::Encode(err.to_string())
}
