//! Helpers for building signers and presenting addresses.

use alloy_primitives::{hex::FromHex, B256};
use alloy_signer_local::PrivateKeySigner;
use eyre::Result;

/// Parses a hex private key, with or without `0x`, into a signer.
pub fn create_private_key_signer(private_key: &str) -> Result<PrivateKeySigner> {
    let Ok(bytes) = B256::from_hex(private_key.trim()) else {
        eyre::bail!("Failed to decode private key")
    };
    match PrivateKeySigner::from_bytes(&bytes) {
        Ok(signer) => Ok(signer),
        Err(err) => eyre::bail!("Failed to create wallet from private key: {err}"),
    }
}

/// Shortens an address for display: `0x1234...abcd`.
///
/// Strings too short to shorten are returned unchanged.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_private_keys() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer = create_private_key_signer(key).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(create_private_key_signer(&format!("0x{key}")).unwrap().address(), signer.address());

        assert!(create_private_key_signer("0xzz").is_err());
        assert!(create_private_key_signer(&"00".repeat(32)).is_err());
    }

    #[test]
    fn shortens_addresses() {
        assert_eq!(
            short_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            "0xf39F...2266"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
    }
}
