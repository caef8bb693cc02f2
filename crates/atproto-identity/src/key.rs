//! Repo signing keys published in DID documents
//!
//! Supports the two curves AT Protocol allows (secp256k1 and NIST P-256),
//! encoded either as `Multikey` (base58btc + multicodec prefix, compressed
//! point) or as the legacy 2019 verification method types (base58btc raw
//! SEC1 point).

use k256::ecdsa::signature::Verifier;
use multibase::Base;

use crate::error::{IdentityError, Result};
use crate::types::VerificationMethod;

/// Multicodec varint for `secp256k1-pub`
const SECP256K1_MULTICODEC: [u8; 2] = [0xe7, 0x01];
/// Multicodec varint for `p256-pub`
const P256_MULTICODEC: [u8; 2] = [0x80, 0x24];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKey {
    Secp256k1(k256::ecdsa::VerifyingKey),
    P256(p256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Parse a `publicKeyMultibase` value of a `Multikey` verification method
    pub fn from_multikey(value: &str) -> Result<Self> {
        let bytes = decode_base58btc(value)?;

        if let Some(point) = bytes.strip_prefix(&SECP256K1_MULTICODEC[..]) {
            k256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::Secp256k1)
                .map_err(|e| IdentityError::InvalidKey(format!("secp256k1: {e}")))
        } else if let Some(point) = bytes.strip_prefix(&P256_MULTICODEC[..]) {
            p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::P256)
                .map_err(|e| IdentityError::InvalidKey(format!("p256: {e}")))
        } else {
            Err(IdentityError::InvalidKey(
                "unrecognized multicodec key prefix".to_string(),
            ))
        }
    }

    /// Parse the key out of a DID document verification method
    pub fn from_verification_method(method: &VerificationMethod) -> Result<Self> {
        let value = method.public_key_multibase.as_deref().ok_or_else(|| {
            IdentityError::InvalidKey(format!("{} has no publicKeyMultibase", method.id))
        })?;

        match method.r#type.as_str() {
            "Multikey" => Self::from_multikey(value),
            "EcdsaSecp256k1VerificationKey2019" => {
                let raw = decode_base58btc(value)?;
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&raw)
                    .map(PublicKey::Secp256k1)
                    .map_err(|e| IdentityError::InvalidKey(format!("secp256k1: {e}")))
            }
            "EcdsaSecp256r1VerificationKey2019" => {
                let raw = decode_base58btc(value)?;
                p256::ecdsa::VerifyingKey::from_sec1_bytes(&raw)
                    .map(PublicKey::P256)
                    .map_err(|e| IdentityError::InvalidKey(format!("p256: {e}")))
            }
            other => Err(IdentityError::InvalidKey(format!(
                "unsupported verification method type: {other}"
            ))),
        }
    }

    /// Encode as a `Multikey` multibase string
    pub fn to_multikey(&self) -> String {
        let mut bytes = Vec::with_capacity(35);
        match self {
            PublicKey::Secp256k1(key) => {
                bytes.extend_from_slice(&SECP256K1_MULTICODEC);
                bytes.extend_from_slice(key.to_encoded_point(true).as_bytes());
            }
            PublicKey::P256(key) => {
                bytes.extend_from_slice(&P256_MULTICODEC);
                bytes.extend_from_slice(key.to_encoded_point(true).as_bytes());
            }
        }
        multibase::encode(Base::Base58Btc, bytes)
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::Secp256k1(_) => "ES256K",
            PublicKey::P256(_) => "ES256",
        }
    }

    /// Verify a 64-byte compact ECDSA signature over `message` (SHA-256 is
    /// applied internally). High-S signatures are rejected.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Secp256k1(key) => {
                let Ok(sig) = k256::ecdsa::Signature::from_slice(signature) else {
                    return false;
                };
                if sig.normalize_s().is_some() {
                    return false;
                }
                key.verify(message, &sig).is_ok()
            }
            PublicKey::P256(key) => {
                let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) else {
                    return false;
                };
                if sig.normalize_s().is_some() {
                    return false;
                }
                key.verify(message, &sig).is_ok()
            }
        }
    }
}

fn decode_base58btc(value: &str) -> Result<Vec<u8>> {
    let (base, bytes) =
        multibase::decode(value).map_err(|e| IdentityError::InvalidKey(e.to_string()))?;
    if base != Base::Base58Btc {
        return Err(IdentityError::InvalidKey(format!(
            "expected base58btc multibase, got {base:?}"
        )));
    }
    Ok(bytes)
}
