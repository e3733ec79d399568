//! Wallet-side collaborators of the link workflow.
//!
//! A [`WalletProvider`] is whatever injected wallet the user connects: it lists accounts, reports
//! the active chain, signs personal messages and emits [`ProviderEvent`]s. [`ConnectionState`]
//! turns provider responses and events into a single observable [`ConnectionStatus`].
//! [`KeyRecovery`] learns the public key behind the active address by recovering it from a signed
//! challenge, remembering it in a persistent [`KeyCache`].

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod connection;
mod error;
mod key_cache;
mod local;
mod provider;
mod recovery;
pub mod utils;

pub use connection::{
    ConnectedAccount, Connection, ConnectionPhase, ConnectionState, ConnectionStatus,
};
pub use error::{ProviderError, WalletError};
pub use key_cache::KeyCache;
pub use local::LocalWalletProvider;
pub use provider::{ProviderEvent, WalletKind, WalletProvider};
pub use recovery::{recover_public_key, recover_signature_key, KeyRecovery};
