//! Core value types shared by every wirelink crate.
//!
//! - [`Name`]: the 64-bit base-32 account name used on chain.
//! - [`Identity`]: a chain-native identity, derived from a wallet address with [`derive_identity`].
//! - [`WireSignature`]: chain-native encoding of secp256k1 wallet signatures.
//! - [`compress_public_key`]: SEC1 compression of recovered wallet keys.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod identity;
mod keys;
mod name;
mod signature;

pub use identity::{derive_identity, looks_like_address, Identity, IdentityError, ADDRESS_PREFIX};
pub use keys::{compress_public_key, uncompressed_public_key, KeyError};
pub use name::{Name, NameError};
pub use signature::{KeyType, WireSignature};
