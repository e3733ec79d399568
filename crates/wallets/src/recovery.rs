//! Public key recovery from personal message signatures.

use crate::{ConnectionState, KeyCache, WalletError};
use alloy_primitives::{eip191_hash_message, Signature};
use std::sync::Arc;
use wirelink_primitives::uncompressed_public_key;

/// Recovers the uncompressed `0x04…` public key that produced a 65-byte `r ∥ s ∥ v` signature
/// over `message`.
pub fn recover_public_key(message: &[u8], signature: &[u8]) -> Result<String, WalletError> {
    let signature =
        Signature::try_from(signature).map_err(|e| WalletError::RecoveryFailed(e.to_string()))?;
    recover_signature_key(message, &signature)
}

/// Like [`recover_public_key`], for an already parsed signature.
pub fn recover_signature_key(message: &[u8], signature: &Signature) -> Result<String, WalletError> {
    let hash = eip191_hash_message(message);
    let key = signature
        .recover_from_prehash(&hash)
        .map_err(|e| WalletError::RecoveryFailed(e.to_string()))?;
    Ok(uncompressed_public_key(&key))
}

/// Learns the public key of the active account.
#[derive(Debug)]
pub struct KeyRecovery {
    connection: Arc<ConnectionState>,
    cache: Arc<KeyCache>,
    message: String,
}

impl KeyRecovery {
    /// Creates a recovery that signs `message` as its challenge.
    pub fn new(connection: Arc<ConnectionState>, cache: Arc<KeyCache>, message: impl Into<String>) -> Self {
        Self { connection, cache, message: message.into() }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Returns the cached key of the active account, without asking the wallet.
    pub fn cached(&self) -> Option<String> {
        self.connection.address().and_then(|address| self.cache.get(&address))
    }

    /// Returns the public key of the active account.
    ///
    /// Cached keys are returned as is. Otherwise the wallet signs the challenge, the key is
    /// recovered from the signature and cached.
    pub async fn retrieve(&self) -> Result<String, WalletError> {
        let address = self.connection.address().ok_or(WalletError::NotConnected)?;
        if let Some(key) = self.cache.get(&address) {
            trace!(%address, "public key cache hit");
            return Ok(key);
        }

        let signature = self.connection.sign_message(self.message.as_bytes()).await?;
        let key = recover_signature_key(self.message.as_bytes(), &signature)?;
        debug!(%address, "recovered public key");
        if let Err(err) = self.cache.put(&address, &key) {
            debug!(%err, "public key not persisted");
        }
        Ok(key)
    }
}
