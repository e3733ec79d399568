//! Chain identities and their derivation from wallet addresses.

use crate::{Name, NameError};
use alloy_primitives::{hex, keccak256};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// Prefix carried by externally-owned wallet addresses.
pub const ADDRESS_PREFIX: &str = "0x";

/// Alphabet used for derived identities. It is the name charmap without `.`, so every derived
/// identity is a full-length valid [`Name`].
const IDENTITY_ALPHABET: &[u8; 31] = b"12345abcdefghijklmnopqrstuvwxyz";

/// Number of characters in a derived identity.
const IDENTITY_LEN: usize = 12;

/// Number of hex digits in a wallet address.
const ADDRESS_HEX_LEN: usize = 2 * 20;

/// Errors produced by the address codec.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The input is empty or is a malformed wallet address.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
}

/// A chain-native identity: the account name a wallet address maps to.
///
/// Identities compare and hash case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps an identity string without validation.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this identity still looks like a raw wallet address, i.e. it has not been
    /// resolved to a chain name.
    pub fn is_address(&self) -> bool {
        looks_like_address(&self.0)
    }

    /// Converts the identity into a packed chain [`Name`].
    pub fn to_name(&self) -> Result<Name, NameError> {
        self.0.to_ascii_lowercase().parse()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Identity {}

impl PartialEq<str> for Identity {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for Identity {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Name> for Identity {
    fn from(name: Name) -> Self {
        Self(name.to_string())
    }
}

/// Returns `true` if `s` carries the wallet address prefix.
///
/// This is a prefix check only; it does not validate the rest of the string.
pub fn looks_like_address(s: &str) -> bool {
    s.get(..ADDRESS_PREFIX.len()).is_some_and(|p| p.eq_ignore_ascii_case(ADDRESS_PREFIX))
}

/// Derives the chain identity for a wallet address.
///
/// Strings without the address prefix are already identities and are returned unchanged. The
/// derivation is a pure function of the address bytes, so checksum casing does not matter.
pub fn derive_identity(address: &str) -> Result<Identity, IdentityError> {
    if address.is_empty() {
        return Err(IdentityError::InvalidAddress(String::new()));
    }
    if !looks_like_address(address) {
        return Ok(Identity::new(address));
    }

    let digits = &address[ADDRESS_PREFIX.len()..];
    if digits.len() != ADDRESS_HEX_LEN {
        return Err(IdentityError::InvalidAddress(address.to_string()));
    }
    let bytes = hex::decode(digits).map_err(|_| IdentityError::InvalidAddress(address.to_string()))?;

    let hash = keccak256(&bytes);
    let name: String = hash[..IDENTITY_LEN]
        .iter()
        .map(|b| IDENTITY_ALPHABET[*b as usize % IDENTITY_ALPHABET.len()] as char)
        .collect();
    Ok(Identity(name))
}
