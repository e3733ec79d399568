use wirelink_chain::ChainError;
use wirelink_common::errors::user_message;
use wirelink_primitives::{IdentityError, KeyError, NameError};
use wirelink_wallets::WalletError;

/// Errors raised by account resolution, link lookup and the link protocol.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A wallet operation failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),
    /// The address could not be turned into an identity.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// The identity is not a valid chain name.
    #[error(transparent)]
    Name(#[from] NameError),
    /// The recovered public key is unusable.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// Neither account lookup knows the identity.
    #[error("account `{0}` not found")]
    AccountNotFound(String),
    /// No link record exists for the identity.
    #[error("no link found for `{0}`")]
    LinkNotFound(String),
    /// Authorization was requested before a link was created.
    #[error("no link has been created for `{0}`")]
    LinkNotCreated(String),
    /// A newer request or a reset started while this one was in flight. Its result was dropped.
    #[error("superseded by a newer request")]
    Superseded,
    /// No identity was given and none is resolved.
    #[error("no chain account is resolved")]
    NoIdentity,
    /// Building, signing or submitting a transaction failed.
    #[error("{0}")]
    TransactionFailed(String),
    /// A chain query failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl LinkError {
    /// Returns the message shown to users.
    pub fn message(&self) -> String {
        match self {
            Self::Chain(err) => err.message(),
            Self::TransactionFailed(message) => message.clone(),
            other => user_message(other),
        }
    }
}
