//! Signed repository commits

use std::collections::BTreeMap;

use atproto_identity::PublicKey;
use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use serde::Serialize;

use crate::error::{RepoError, Result};

/// Commit versions this reader understands
pub const SUPPORTED_VERSIONS: [i64; 2] = [2, 3];

/// A repository commit as stored at the root of the CAR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub did: String,
    pub version: i64,
    /// Root of the record MST
    pub data: Cid,
    pub rev: Option<String>,
    pub prev: Option<Cid>,
    pub sig: Vec<u8>,
}

/// The bytes that get signed. Fields are declared in DAG-CBOR canonical
/// key order (length first, then bytewise).
#[derive(Serialize)]
struct UnsignedCommit<'a> {
    did: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rev: Option<&'a str>,
    data: Cid,
    prev: Option<Cid>,
    version: i64,
}

#[derive(Serialize)]
struct SignedCommit<'a> {
    did: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rev: Option<&'a str>,
    sig: Ipld,
    data: Cid,
    prev: Option<Cid>,
    version: i64,
}

impl Commit {
    pub fn from_block(block: &[u8]) -> Result<Self> {
        let ipld: Ipld =
            serde_ipld_dagcbor::from_slice(block).map_err(|e| RepoError::Decode(e.to_string()))?;
        let Ipld::Map(map) = ipld else {
            return Err(RepoError::Decode("commit is not a map".to_string()));
        };

        let did = match map.get("did") {
            Some(Ipld::String(did)) => did.clone(),
            _ => return Err(missing("did")),
        };
        let version = match map.get("version") {
            Some(Ipld::Integer(v)) => {
                i64::try_from(*v).map_err(|_| RepoError::Decode("version out of range".into()))?
            }
            _ => return Err(missing("version")),
        };
        let data = match map.get("data") {
            Some(Ipld::Link(cid)) => *cid,
            _ => return Err(missing("data")),
        };
        let rev = match map.get("rev") {
            Some(Ipld::String(rev)) => Some(rev.clone()),
            None | Some(Ipld::Null) => None,
            _ => return Err(missing("rev")),
        };
        let prev = optional_link(&map, "prev")?;
        let sig = match map.get("sig") {
            Some(Ipld::Bytes(sig)) => sig.clone(),
            _ => return Err(missing("sig")),
        };

        Ok(Self {
            did,
            version,
            data,
            rev,
            prev,
            sig,
        })
    }

    /// Canonical DAG-CBOR encoding of the commit without `sig`
    pub fn unsigned_bytes(&self) -> Result<Vec<u8>> {
        let unsigned = UnsignedCommit {
            did: &self.did,
            rev: self.rev.as_deref(),
            data: self.data,
            prev: self.prev,
            version: self.version,
        };
        serde_ipld_dagcbor::to_vec(&unsigned).map_err(|e| RepoError::Encode(e.to_string()))
    }

    /// Canonical DAG-CBOR encoding including `sig`
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let signed = SignedCommit {
            did: &self.did,
            rev: self.rev.as_deref(),
            sig: Ipld::Bytes(self.sig.clone()),
            data: self.data,
            prev: self.prev,
            version: self.version,
        };
        serde_ipld_dagcbor::to_vec(&signed).map_err(|e| RepoError::Encode(e.to_string()))
    }

    /// Check `sig` against the account's signing key
    pub fn verify_signature(&self, key: &PublicKey) -> Result<bool> {
        Ok(key.verify(&self.unsigned_bytes()?, &self.sig))
    }
}

fn optional_link(map: &BTreeMap<String, Ipld>, key: &str) -> Result<Option<Cid>> {
    match map.get(key) {
        Some(Ipld::Link(cid)) => Ok(Some(*cid)),
        None | Some(Ipld::Null) => Ok(None),
        _ => Err(missing(key)),
    }
}

fn missing(field: &str) -> RepoError {
    RepoError::Decode(format!("commit field `{field}` missing or mistyped"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{cid_for, DAG_CBOR};
    use k256::ecdsa::signature::Signer;

    fn signed_commit(signing: &k256::ecdsa::SigningKey) -> Commit {
        let mut commit = Commit {
            did: "did:plc:xyz".to_string(),
            version: 3,
            data: cid_for(DAG_CBOR, b"mst root").unwrap(),
            rev: Some("3l2abcdefgh22".to_string()),
            prev: None,
            sig: Vec::new(),
        };
        let sig: k256::ecdsa::Signature = signing.sign(&commit.unsigned_bytes().unwrap());
        commit.sig = sig.to_bytes().to_vec();
        commit
    }

    #[test]
    fn test_commit_block_decodes() {
        let signing = k256::ecdsa::SigningKey::from_slice(&[5u8; 32]).unwrap();
        let commit = signed_commit(&signing);

        let decoded = Commit::from_block(&commit.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn test_verify_signature() {
        let signing = k256::ecdsa::SigningKey::from_slice(&[5u8; 32]).unwrap();
        let commit = signed_commit(&signing);
        let key = PublicKey::Secp256k1(*signing.verifying_key());
        assert!(commit.verify_signature(&key).unwrap());

        let other = k256::ecdsa::SigningKey::from_slice(&[6u8; 32]).unwrap();
        let other_key = PublicKey::Secp256k1(*other.verifying_key());
        assert!(!commit.verify_signature(&other_key).unwrap());
    }

    #[test]
    fn test_modified_commit_fails_verification() {
        let signing = k256::ecdsa::SigningKey::from_slice(&[5u8; 32]).unwrap();
        let mut commit = signed_commit(&signing);
        commit.data = cid_for(DAG_CBOR, b"another root").unwrap();

        let key = PublicKey::Secp256k1(*signing.verifying_key());
        assert!(!commit.verify_signature(&key).unwrap());
    }

    #[test]
    fn test_commit_missing_sig() {
        let mut map = BTreeMap::new();
        map.insert("did".to_string(), Ipld::String("did:plc:xyz".to_string()));
        map.insert("version".to_string(), Ipld::Integer(3));
        map.insert(
            "data".to_string(),
            Ipld::Link(cid_for(DAG_CBOR, b"x").unwrap()),
        );
        let block = serde_ipld_dagcbor::to_vec(&Ipld::Map(map)).unwrap();

        let err = Commit::from_block(&block).unwrap_err();
        assert!(format!("{}", err).contains("`sig`"));
    }
}
