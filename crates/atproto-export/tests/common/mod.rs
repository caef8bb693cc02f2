//! In-process fake PLC directory, AppView and PDS for export tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atproto_export::ExportConfig;
use atproto_identity::PublicKey;
use atproto_repo::car::RAW;
use atproto_repo::{cid_for, RepoBuilder};
use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde_json::{json, Value};

pub const DID: &str = "did:plc:xyz";
pub const HANDLE: &str = "alice.example";

pub fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[42u8; 32]).unwrap()
}

pub fn other_signing_key() -> SigningKey {
    SigningKey::from_slice(&[43u8; 32]).unwrap()
}

/// Finish `builder` with a commit signed by `key`
pub async fn sign_repo(builder: RepoBuilder, key: &SigningKey) -> Vec<u8> {
    builder
        .build(|bytes: &[u8]| {
            let sig: Signature = key.sign(bytes);
            sig.to_bytes().to_vec()
        })
        .await
        .unwrap()
}

/// Build a signed repo CAR holding `records` as `(collection, rkey, value)`
pub async fn build_repo(did: &str, key: &SigningKey, records: &[(&str, &str, Value)]) -> Vec<u8> {
    let mut builder = RepoBuilder::new(did, "3l2abcdefgh22");
    for (collection, rkey, value) in records {
        builder.add_record(collection, rkey, value).unwrap();
    }
    sign_repo(builder, key).await
}

/// Blobs with real raw-codec CIDs
pub fn make_blobs(count: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let data = format!("blob number {i}").into_bytes();
            (cid_for(RAW, &data).unwrap().to_string(), data)
        })
        .collect()
}

/// What the fake network serves for one account
pub struct Account {
    pub did: String,
    pub handle: String,
    /// Key advertised in the DID document
    pub doc_key: PublicKey,
    pub repo: Vec<u8>,
    pub get_repo_fails: bool,
    pub blobs: Vec<(String, Vec<u8>)>,
    /// Most CIDs a listBlobs page returns, whatever the requested limit
    pub page_cap: usize,
    /// Blob CIDs whose getBlob answers 500
    pub failing_blobs: HashSet<String>,
    pub list_blobs_fails: bool,
}

impl Account {
    pub async fn new(records: &[(&str, &str, Value)]) -> Self {
        let key = signing_key();
        Self {
            did: DID.to_string(),
            handle: HANDLE.to_string(),
            doc_key: PublicKey::Secp256k1(*key.verifying_key()),
            repo: build_repo(DID, &key, records).await,
            get_repo_fails: false,
            blobs: Vec::new(),
            page_cap: 1000,
            failing_blobs: HashSet::new(),
            list_blobs_fails: false,
        }
    }
}

#[derive(Default)]
pub struct Counters {
    pub resolve_handle: AtomicUsize,
    pub did_document: AtomicUsize,
    pub get_repo: AtomicUsize,
    pub list_blobs: AtomicUsize,
    pub get_blob: AtomicUsize,
    /// `(limit, cursor, returned)` per listBlobs call
    pub list_pages: Mutex<Vec<(u32, Option<String>, usize)>>,
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

struct FakeState {
    account: Account,
    base_url: String,
    counters: Arc<Counters>,
}

type Shared = Arc<FakeState>;

/// A running fake network. One server plays PLC directory, AppView and PDS.
pub struct FakeNetwork {
    pub base_url: String,
    pub counters: Arc<Counters>,
}

impl FakeNetwork {
    pub async fn start(account: Account) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let counters = Arc::new(Counters::default());

        let state: Shared = Arc::new(FakeState {
            account,
            base_url: base_url.clone(),
            counters: counters.clone(),
        });

        let router = Router::new()
            .route(
                "/xrpc/com.atproto.identity.resolveHandle",
                get(resolve_handle),
            )
            .route("/xrpc/com.atproto.sync.getRepo", get(get_repo))
            .route("/xrpc/com.atproto.sync.listBlobs", get(list_blobs))
            .route("/xrpc/com.atproto.sync.getBlob", get(get_blob))
            .route("/{did}", get(did_document))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base_url, counters }
    }

    /// Exporter config pointed at this network, well-known lookups off
    pub fn config(&self) -> ExportConfig {
        ExportConfig {
            plc_directory_url: self.base_url.clone(),
            handle_resolver_url: self.base_url.clone(),
            resolve_handle_well_known: false,
            http_timeout: Duration::from_secs(10),
        }
    }
}

type Params = Query<HashMap<String, String>>;

async fn resolve_handle(State(state): State<Shared>, Query(q): Params) -> Response {
    state.counters.resolve_handle.fetch_add(1, Ordering::SeqCst);
    if q.get("handle") == Some(&state.account.handle) {
        Json(json!({ "did": state.account.did })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "InvalidRequest", "message": "Unable to resolve handle"})),
        )
            .into_response()
    }
}

async fn did_document(State(state): State<Shared>, UrlPath(did): UrlPath<String>) -> Response {
    state.counters.did_document.fetch_add(1, Ordering::SeqCst);
    let account = &state.account;
    if did != account.did {
        return StatusCode::NOT_FOUND.into_response();
    }

    Json(json!({
        "@context": ["https://www.w3.org/ns/did/v1"],
        "id": account.did,
        "alsoKnownAs": [format!("at://{}", account.handle)],
        "verificationMethod": [{
            "id": format!("{}#atproto", account.did),
            "type": "Multikey",
            "controller": account.did,
            "publicKeyMultibase": account.doc_key.to_multikey(),
        }],
        "service": [{
            "id": "#atproto_pds",
            "type": "AtprotoPersonalDataServer",
            "serviceEndpoint": state.base_url,
        }],
    }))
    .into_response()
}

async fn get_repo(State(state): State<Shared>, Query(q): Params) -> Response {
    state.counters.get_repo.fetch_add(1, Ordering::SeqCst);
    if state.account.get_repo_fails {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if q.get("did") != Some(&state.account.did) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    state.account.repo.clone().into_response()
}

async fn list_blobs(State(state): State<Shared>, Query(q): Params) -> Response {
    state.counters.list_blobs.fetch_add(1, Ordering::SeqCst);
    let account = &state.account;
    if account.list_blobs_fails || q.get("did") != Some(&account.did) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let limit: u32 = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(500);
    let cursor = q.get("cursor").cloned();
    let start = match &cursor {
        Some(c) => match account.blobs.iter().position(|(cid, _)| cid == c) {
            Some(i) => i + 1,
            None => return StatusCode::BAD_REQUEST.into_response(),
        },
        None => 0,
    };

    let cids: Vec<String> = account
        .blobs
        .iter()
        .skip(start)
        .take((limit as usize).min(account.page_cap))
        .map(|(cid, _)| cid.clone())
        .collect();
    state
        .counters
        .list_pages
        .lock()
        .unwrap()
        .push((limit, cursor, cids.len()));

    // Like a real PDS: the cursor is the last CID of any non-empty page
    match cids.last().cloned() {
        Some(last) => Json(json!({ "cursor": last, "cids": cids })).into_response(),
        None => Json(json!({ "cids": cids })).into_response(),
    }
}

async fn get_blob(State(state): State<Shared>, Query(q): Params) -> Response {
    state.counters.get_blob.fetch_add(1, Ordering::SeqCst);
    let Some(cid) = q.get("cid") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if state.account.failing_blobs.contains(cid) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match state.account.blobs.iter().find(|(c, _)| c == cid) {
        Some((_, data)) => data.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Every file below `root`, as sorted `/`-separated relative paths
pub fn list_files(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
