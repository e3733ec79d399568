//! # wirelink
//!
//! Links a browser-style wallet to a chain account.
//!
//! A session ([`WireLink`]) follows the wallet connection, resolves the chain account of the
//! selected address ([`AccountResolver`]), tracks whether that account is linked
//! ([`LinkRegistry`]) and drives the two-step [`LinkProtocol`]: `createlink` binds the wallet's
//! public key to the account, then `linkauth` lets the link authorize settle actions.
//!
//! Account, link and connection state are independent [`watch`](tokio::sync::watch) channels.
//! Subscribers may briefly see a new connection before the matching account or link.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod account;
pub use account::{AccountLookup, AccountResolver, ChainAccountRecord};

mod error;
pub use error::LinkError;

mod protocol;
pub use protocol::{link_message_hash, LinkProtocol, LinkStep};

mod registry;
pub use registry::{LinkRecord, LinkRegistry};

mod selected;
pub use selected::SelectedChain;

mod session;
pub use session::{Reconciler, SyncHandle, WireLink};

mod transaction;
pub use transaction::{ActionData, ActionDescriptor, TransactionSubmitter};

pub use wirelink_config::{ChainConfig, ChainRegistry, LinkConfig};
pub use wirelink_primitives::{derive_identity, Identity};
pub use wirelink_wallets::{ConnectionState, WalletProvider};
