use alloy_primitives::hex;
use k256::{ecdsa::VerifyingKey, elliptic_curve::sec1::ToEncodedPoint, PublicKey};

/// Errors raised while handling public keys and chain signatures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The input is not valid hex.
    #[error("public key is not valid hex: {0}")]
    InvalidHex(String),
    /// The bytes do not describe a point on secp256k1.
    #[error("invalid secp256k1 public key")]
    InvalidPublicKey,
    /// A chain signature string could not be decoded.
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
}

/// Formats a verifying key as SEC1 uncompressed hex, `0x04…`.
pub fn uncompressed_public_key(key: &VerifyingKey) -> String {
    hex::encode_prefixed(key.to_encoded_point(false).as_bytes())
}

/// Compresses a SEC1 public key.
///
/// Accepts uncompressed (`04…`) or already compressed (`02…`/`03…`) hex, with or without a `0x`
/// prefix, and returns the 33-byte compressed key as lowercase hex without prefix.
pub fn compress_public_key(public_key: &str) -> Result<String, KeyError> {
    let bytes = hex::decode(public_key.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    let key = PublicKey::from_sec1_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
    Ok(hex::encode(key.to_encoded_point(true).as_bytes()))
}
