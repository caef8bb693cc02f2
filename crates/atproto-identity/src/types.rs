use serde::{Deserialize, Serialize};

use crate::key::PublicKey;

/// Service id of the account's hosting PDS in a DID document
pub const PDS_SERVICE_ID: &str = "#atproto_pds";

/// Verification method id of the repo signing key in a DID document
pub const SIGNING_KEY_ID: &str = "#atproto";

/// A handle or a DID, as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Handle(String),
    Did(String),
}

impl Identifier {
    /// Classify user input. Anything starting with `did:` is taken as a DID
    /// as-is; everything else is normalized as a handle.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with("did:") {
            Identifier::Did(input.to_string())
        } else {
            let handle = input.strip_prefix('@').unwrap_or(input);
            Identifier::Handle(handle.to_ascii_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Handle(h) => h,
            Identifier::Did(d) => d,
        }
    }
}

/// Result of resolving a handle or DID down to a hosting service
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub did: String,
    pub handle: Option<String>,
    pub pds_endpoint: String,
    pub signing_key: PublicKey,
}

/// DID Document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: String,
    #[serde(default)]
    pub also_known_as: Option<Vec<String>>,
    #[serde(default)]
    pub verification_method: Option<Vec<VerificationMethod>>,
    #[serde(default)]
    pub service: Option<Vec<DidService>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidService {
    pub id: String,
    pub r#type: String,
    pub service_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    pub r#type: String,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default)]
    pub public_key_multibase: Option<String>,
}

/// Matches both the relative (`#atproto_pds`) and the fully qualified
/// (`did:plc:abc#atproto_pds`) id forms.
fn fragment_matches(id: &str, fragment: &str) -> bool {
    id == fragment
        || (id.ends_with(fragment) && id[..id.len() - fragment.len()].starts_with("did:"))
}

impl DidDocument {
    /// First declared PDS endpoint
    pub fn pds_endpoint(&self) -> Option<&str> {
        self.service
            .as_ref()?
            .iter()
            .find(|s| fragment_matches(&s.id, PDS_SERVICE_ID))
            .map(|s| s.service_endpoint.as_str())
    }

    /// Handle claimed in `alsoKnownAs`
    pub fn handle(&self) -> Option<&str> {
        self.also_known_as
            .as_ref()?
            .iter()
            .find_map(|aka| aka.strip_prefix("at://"))
    }

    /// The `#atproto` verification method
    pub fn signing_method(&self) -> Option<&VerificationMethod> {
        self.verification_method
            .as_ref()?
            .iter()
            .find(|m| fragment_matches(&m.id, SIGNING_KEY_ID))
    }
}

/// Bluesky API response types
#[derive(Debug, Deserialize)]
pub(crate) struct ResolveHandleResponse {
    pub(crate) did: String,
}
