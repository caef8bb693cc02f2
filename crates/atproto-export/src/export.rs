//! The export pipeline: resolve, fetch, verify, write records, fetch blobs

use std::path::{Path, PathBuf};
use std::pin::pin;

use atproto_identity::{Identifier, IdentityResolver};
use atproto_repo::verify_repo;
use atproto_sync_client::SyncClient;
use futures::TryStreamExt;
use tracing::info;

use crate::blobs::{BlobDownloader, BlobSummary};
use crate::config::ExportConfig;
use crate::error::Result;
use crate::sink::FileSink;

/// What a finished export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub did: String,
    /// `<out>/<sanitized-did>`
    pub account_dir: PathBuf,
    pub records: usize,
    pub blobs: BlobSummary,
}

pub struct Exporter {
    config: ExportConfig,
    resolver: IdentityResolver,
}

impl Exporter {
    /// The resolver, and so its DID document cache, lives as long as the
    /// exporter
    pub fn new(config: ExportConfig) -> Result<Self> {
        let resolver = IdentityResolver::with_config(config.resolver_config())?;
        Ok(Self { config, resolver })
    }

    /// Export one account into `out_dir`. Any error here is fatal; only
    /// individual blob downloads are allowed to fail.
    pub async fn run(&self, handle_or_did: &str, out_dir: &Path) -> Result<ExportSummary> {
        let identifier = Identifier::parse(handle_or_did);
        let identity = self.resolver.resolve(&identifier).await?;
        let did = identity.did.as_str();

        let client = SyncClient::new(&identity.pds_endpoint, self.config.http_timeout)?;
        let mut sink = FileSink::new(out_dir, did)?;

        info!("Downloading repo...");
        let repo_bytes = client.get_repo(did).await?;

        info!("Exporting repo...");
        let verified = verify_repo(repo_bytes, did, &identity.signing_key).await?;
        let mut records = pin!(verified.records());
        while let Some(record) = records.try_next().await? {
            sink.write_record(&record).await?;
        }
        info!(records = sink.records_written(), "Exported records");

        info!("Downloading blobs...");
        let blobs = BlobDownloader::new(&client, did, &sink).run().await?;
        if !blobs.failed.is_empty() {
            info!(
                downloaded = blobs.downloaded,
                failed = blobs.failed.len(),
                "Some blobs could not be downloaded"
            );
        }

        info!("Done!");
        Ok(ExportSummary {
            did: identity.did.clone(),
            account_dir: sink.root().to_path_buf(),
            records: sink.records_written(),
            blobs,
        })
    }
}
