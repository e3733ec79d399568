//! # wirelink-chain
//!
//! Client side of the chain RPC API: the [`ChainApi`] collaborator and its HTTP implementation,
//! ABI-driven encoding of action data, and transaction packing and signing digests.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod abi;
pub mod codec;
pub mod transaction;
pub mod types;

mod api;
pub use api::ChainApi;

mod error;
pub use error::{AbiError, ChainError};

mod http;
pub use http::HttpChainApi;

pub use abi::{Abi, AbiDef};
pub use transaction::{Action, Transaction, TransactionHeader};
pub use types::{Checksum256, PermissionLevel};
