//! com.atproto.sync response types

use serde::Deserialize;

/// One page of `com.atproto.sync.listBlobs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBlobsPage {
    #[serde(default)]
    pub cursor: Option<String>,
    pub cids: Vec<String>,
}
