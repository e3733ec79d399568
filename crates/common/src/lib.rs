//! # wirelink-common
//!
//! Observable state, storage capabilities and error helpers shared across wirelink.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod errors;
pub mod observable;
pub mod storage;

pub use observable::{Generation, GenerationGuard, Observable};
pub use storage::{FileStore, KeyValueStore, MemoryStore, NullStore, StorageError};
