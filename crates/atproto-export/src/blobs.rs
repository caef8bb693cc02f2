//! Blob enumeration and download

use atproto_sync_client::{SyncClient, LIST_BLOBS_PAGE_SIZE};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sink::{is_safe_segment, FileSink};

/// Outcome of the blob phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSummary {
    pub listed: usize,
    pub downloaded: usize,
    /// CIDs that could not be fetched
    pub failed: Vec<String>,
}

/// Lists an account's blobs and downloads them one at a time
pub struct BlobDownloader<'a> {
    client: &'a SyncClient,
    did: &'a str,
    sink: &'a FileSink,
}

impl<'a> BlobDownloader<'a> {
    pub fn new(client: &'a SyncClient, did: &'a str, sink: &'a FileSink) -> Self {
        Self { client, did, sink }
    }

    /// Every blob CID of the account, following the listing cursor until
    /// it runs out. Pages may be shorter than requested. A failed page
    /// aborts the whole listing.
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut cids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .client
                .list_blobs(self.did, LIST_BLOBS_PAGE_SIZE, cursor.as_deref())
                .await?;
            debug!(
                count = page.cids.len(),
                cursor = page.cursor.as_deref().unwrap_or("-"),
                "Listed blob page"
            );

            if page.cids.is_empty() {
                break;
            }
            cids.extend(page.cids);

            match page.cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    warn!(cursor = %next, "listBlobs returned the same cursor twice, stopping");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(cids)
    }

    /// List and download every blob. Listing failures are fatal; a blob that
    /// cannot be fetched is logged and skipped.
    pub async fn run(&self) -> Result<BlobSummary> {
        let cids = self.list_all().await?;
        let total = cids.len();
        let mut summary = BlobSummary {
            listed: total,
            ..Default::default()
        };

        for (i, cid) in cids.into_iter().enumerate() {
            info!("Downloading {} ({} / {})", cid, i + 1, total);

            if !is_safe_segment(&cid) {
                warn!(cid = %cid, "Blob CID is not a valid file name, skipping");
                summary.failed.push(cid);
                continue;
            }

            match self.client.get_blob(self.did, &cid).await {
                Ok(data) => {
                    self.sink.write_blob(&cid, &data).await?;
                    summary.downloaded += 1;
                }
                Err(e) => {
                    warn!("Could not get blob {}, skipping: {}", cid, e);
                    summary.failed.push(cid);
                }
            }
        }

        Ok(summary)
    }
}
