//! AT Protocol Identity Resolver
//!
//! Resolves handles to DIDs and DIDs to their documents, then pulls out the
//! two things an exporter needs: the PDS endpoint and the repo signing key.
//! Supports did:plc (via a PLC directory) and did:web.

pub mod error;
pub mod key;
mod resolver;
pub mod types;

pub use error::{IdentityError, Result};
pub use key::PublicKey;
pub use resolver::{
    IdentityResolver, ResolverConfig, DEFAULT_HANDLE_RESOLVER_URL, DEFAULT_PLC_DIRECTORY_URL,
};
pub use types::{DidDocument, DidService, Identifier, ResolvedIdentity, VerificationMethod};
