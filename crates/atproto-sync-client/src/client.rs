//! XRPC calls against a PDS

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::types::ListBlobsPage;

/// Largest page `com.atproto.sync.listBlobs` hands out
pub const LIST_BLOBS_PAGE_SIZE: u32 = 500;

const GET_REPO: &str = "com.atproto.sync.getRepo";
const LIST_BLOBS: &str = "com.atproto.sync.listBlobs";
const GET_BLOB: &str = "com.atproto.sync.getBlob";

/// HTTP client bound to one PDS
pub struct SyncClient {
    client: Client,
    service_url: String,
}

impl SyncClient {
    /// Create a client for the PDS at `service_url`
    pub fn new(service_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            service_url: service_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Download the account's whole repository as CAR bytes
    pub async fn get_repo(&self, did: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/xrpc/{}?did={}",
            self.service_url,
            GET_REPO,
            urlencoding::encode(did)
        );
        debug!(url = %url, "Fetching repo from PDS");

        let response = self.get(GET_REPO, &url).await?;
        let data = response.bytes().await?.to_vec();

        debug!(size = data.len(), "Fetched repo from PDS");
        Ok(data)
    }

    /// Fetch one page of blob CIDs owned by the account
    pub async fn list_blobs(
        &self,
        did: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ListBlobsPage> {
        let mut url = format!(
            "{}/xrpc/{}?did={}&limit={}",
            self.service_url,
            LIST_BLOBS,
            urlencoding::encode(did),
            limit
        );
        if let Some(c) = cursor {
            url.push_str(&format!("&cursor={}", urlencoding::encode(c)));
        }
        debug!(url = %url, "Listing blobs");

        let response = self.get(LIST_BLOBS, &url).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Download a single blob
    pub async fn get_blob(&self, did: &str, cid: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/xrpc/{}?did={}&cid={}",
            self.service_url,
            GET_BLOB,
            urlencoding::encode(did),
            urlencoding::encode(cid)
        );
        debug!(url = %url, "Fetching blob from PDS");

        let response = self.get(GET_BLOB, &url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, method: &'static str, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "XRPC request failed");
            return Err(SyncError::Status {
                method,
                status: response.status(),
            });
        }

        Ok(response)
    }
}
