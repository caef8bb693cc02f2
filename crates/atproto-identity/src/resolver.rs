use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{IdentityError, Result};
use crate::key::PublicKey;
use crate::types::{DidDocument, Identifier, ResolveHandleResponse, ResolvedIdentity};

pub const DEFAULT_PLC_DIRECTORY_URL: &str = "https://plc.directory";
pub const DEFAULT_HANDLE_RESOLVER_URL: &str = "https://public.api.bsky.app";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the resolver looks things up
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base URL of the did:plc directory
    pub plc_directory_url: String,
    /// Service answering `com.atproto.identity.resolveHandle`
    pub handle_resolver_url: String,
    /// Try `https://<handle>/.well-known/atproto-did` before the XRPC service
    pub well_known_handles: bool,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            plc_directory_url: DEFAULT_PLC_DIRECTORY_URL.to_string(),
            handle_resolver_url: DEFAULT_HANDLE_RESOLVER_URL.to_string(),
            well_known_handles: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Resolves handles and DIDs to a hosting service and signing key.
///
/// DID documents are cached for the lifetime of the resolver with no
/// expiry. Create one resolver per export run.
pub struct IdentityResolver {
    client: Client,
    config: ResolverConfig,
    document_cache: Cache<String, Arc<DidDocument>>,
}

impl IdentityResolver {
    /// Create a resolver against the public PLC directory and AppView
    pub fn new() -> Result<Self> {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        let document_cache = Cache::builder().max_capacity(1_000).build();

        Ok(Self {
            client,
            config: ResolverConfig {
                plc_directory_url: config.plc_directory_url.trim_end_matches('/').to_string(),
                handle_resolver_url: config
                    .handle_resolver_url
                    .trim_end_matches('/')
                    .to_string(),
                ..config
            },
            document_cache,
        })
    }

    /// Resolve a handle or DID all the way to a PDS endpoint and signing key.
    /// DIDs skip handle resolution entirely.
    pub async fn resolve(&self, identifier: &Identifier) -> Result<ResolvedIdentity> {
        let did = match identifier {
            Identifier::Did(did) => did.clone(),
            Identifier::Handle(handle) => self
                .resolve_handle(handle)
                .await?
                .ok_or_else(|| IdentityError::HandleNotFound(handle.clone()))?,
        };

        let doc = self.resolve_did(&did).await?;

        let pds_endpoint = doc
            .pds_endpoint()
            .ok_or_else(|| IdentityError::NoHostingService(did.clone()))?
            .trim_end_matches('/')
            .to_string();

        let method = doc
            .signing_method()
            .ok_or_else(|| IdentityError::NoSigningKey(did.clone()))?;
        let signing_key = PublicKey::from_verification_method(method)?;

        let handle = match identifier {
            Identifier::Handle(handle) => Some(handle.clone()),
            Identifier::Did(_) => doc.handle().map(str::to_string),
        };

        info!(
            did = %did,
            handle = handle.as_deref().unwrap_or("-"),
            pds = %pds_endpoint,
            key = signing_key.algorithm(),
            "Resolved identity"
        );

        Ok(ResolvedIdentity {
            did,
            handle,
            pds_endpoint,
            signing_key,
        })
    }

    /// Resolve a handle to a DID. `Ok(None)` means no DID is published.
    pub async fn resolve_handle(&self, handle: &str) -> Result<Option<String>> {
        if self.config.well_known_handles {
            match self.resolve_handle_well_known(handle).await {
                Ok(Some(did)) => return Ok(Some(did)),
                Ok(None) => {}
                Err(e) => debug!("Well-known lookup for {handle} failed: {e}"),
            }
        }

        let url = format!(
            "{}/xrpc/com.atproto.identity.resolveHandle?handle={}",
            self.config.handle_resolver_url,
            urlencoding::encode(handle)
        );
        debug!(url = %url, "Resolving handle via XRPC");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!(
                "Failed to resolve handle {handle}: status {}",
                response.status()
            );
            return Ok(None);
        }

        match response.json::<ResolveHandleResponse>().await {
            Ok(data) if data.did.starts_with("did:") => Ok(Some(data.did)),
            Ok(data) => {
                warn!("Handle resolver returned a non-DID for {handle}: {}", data.did);
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to parse resolve handle response: {e}");
                Ok(None)
            }
        }
    }

    async fn resolve_handle_well_known(&self, handle: &str) -> Result<Option<String>> {
        let url = format!("https://{handle}/.well-known/atproto-did");
        debug!(url = %url, "Resolving handle via well-known");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let body = response.text().await?;
        let did = body.trim();
        Ok(did.starts_with("did:").then(|| did.to_string()))
    }

    /// Fetch (or reuse) the DID document for a DID
    pub async fn resolve_did(&self, did: &str) -> Result<Arc<DidDocument>> {
        if let Some(cached) = self.document_cache.get(did).await {
            debug!(did, "DID document cache hit");
            return Ok(cached);
        }

        let url = self.did_document_url(did)?;
        debug!(did, url = %url, "Fetching DID document");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(IdentityError::DidResolution(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let doc: DidDocument = response
            .json()
            .await
            .map_err(|e| IdentityError::DidResolution(format!("malformed DID document: {e}")))?;

        if doc.id != did {
            return Err(IdentityError::DidMismatch {
                expected: did.to_string(),
                actual: doc.id,
            });
        }

        let doc = Arc::new(doc);
        self.document_cache
            .insert(did.to_string(), doc.clone())
            .await;

        Ok(doc)
    }

    /// Authoritative document location for each supported DID method
    fn did_document_url(&self, did: &str) -> Result<String> {
        if did.starts_with("did:plc:") {
            Ok(format!("{}/{}", self.config.plc_directory_url, did))
        } else if let Some(host) = did.strip_prefix("did:web:") {
            if host.is_empty() || host.contains(':') || host.contains('/') {
                return Err(IdentityError::DidResolution(format!(
                    "Invalid did:web format: {did}"
                )));
            }
            let host = host.replace("%3A", ":");
            Ok(format!("https://{host}/.well-known/did.json"))
        } else {
            Err(IdentityError::UnsupportedDidMethod(did.to_string()))
        }
    }
}
