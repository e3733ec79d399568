//! Errors of wallet providers and of the connection built on them.

use wirelink_common::errors::clean_message;

/// JSON-RPC code wallets return when the user dismisses a request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors reported by a [`WalletProvider`](crate::WalletProvider).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The user dismissed the request in the wallet.
    #[error("user rejected the request: {0}")]
    Rejected(String),
    /// The wallet answered with a JSON-RPC error.
    #[error("wallet error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message as reported by the wallet.
        message: String,
    },
    /// The wallet went away.
    #[error("wallet provider is unavailable")]
    Unavailable,
}

impl ProviderError {
    /// Classifies a JSON-RPC error returned by a wallet.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == USER_REJECTED_CODE {
            Self::Rejected(message)
        } else {
            Self::Rpc { code, message }
        }
    }
}

/// Errors raised by wallet connection and key recovery.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// No wallet provider is installed.
    #[error("no wallet provider detected")]
    ProviderUnavailable,
    /// The user rejected the request.
    #[error("request rejected: {0}")]
    UserRejected(String),
    /// The wallet authorized no accounts.
    #[error("the wallet returned no accounts")]
    NoAccounts,
    /// The address is not one of the available accounts.
    #[error("address `{0}` is not an available account")]
    UnknownAddress(String),
    /// No account is selected.
    #[error("no wallet account is selected")]
    NotConnected,
    /// A newer connect or disconnect superseded this request.
    #[error("the connection request was superseded")]
    Superseded,
    /// Any other wallet failure, with its message cleaned.
    #[error("{0}")]
    Provider(String),
    /// The signature does not yield a public key.
    #[error("failed to recover public key: {0}")]
    RecoveryFailed(String),
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(message) => Self::UserRejected(clean_message(&message)),
            ProviderError::Rpc { message, .. } => Self::Provider(clean_message(&message)),
            ProviderError::Unavailable => Self::ProviderUnavailable,
        }
    }
}
