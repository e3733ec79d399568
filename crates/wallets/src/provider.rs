use crate::ProviderError;
use alloy_primitives::Signature;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// The wallet family a connection was made through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    /// MetaMask, or any injected EIP-1193 provider.
    #[default]
    MetaMask,
    /// WalletConnect.
    WalletConnect,
    /// Coinbase Wallet.
    CoinbaseWallet,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MetaMask => "metamask",
            Self::WalletConnect => "walletconnect",
            Self::CoinbaseWallet => "coinbasewallet",
        })
    }
}

/// An unsolicited notification from the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The authorized account list changed. Empty means the wallet disconnected.
    AccountsChanged(Vec<String>),
    /// The wallet switched networks.
    ChainChanged(u64),
}

/// An injected wallet.
#[async_trait]
pub trait WalletProvider: fmt::Debug + Send + Sync {
    /// Returns the wallet family.
    fn kind(&self) -> WalletKind;

    /// Asks the user to authorize accounts, returning them in wallet order.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Returns the active chain id.
    async fn request_chain_id(&self) -> Result<u64, ProviderError>;

    /// Signs `message` with `address` using the personal message scheme.
    async fn sign_personal_message(
        &self,
        address: &str,
        message: &[u8],
    ) -> Result<Signature, ProviderError>;

    /// Subscribes to wallet events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
