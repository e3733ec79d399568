//! Config errors.

use std::{collections::HashSet, fmt::Write};
use wirelink_common::StorageError;

/// Errors raised while loading the config or managing the chain list.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The layered config could not be extracted.
    #[error("{}", display_extract(.0))]
    Extract(Box<figment::Error>),
    /// No chain with this id is configured.
    #[error("unknown chain `{0}`")]
    UnknownChain(String),
    /// The chain list could not be persisted.
    #[error("failed to persist chain list: {0}")]
    Storage(#[from] StorageError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Renders every distinct extraction failure on its own line.
fn display_extract(error: &figment::Error) -> String {
    let mut out = String::from("failed to extract wirelink config:");
    let mut unique = HashSet::with_capacity(error.count());
    for err in error.clone() {
        let line = err.to_string();
        if unique.insert(line.clone()) {
            let _ = write!(out, "\n{line}");
        }
    }
    out
}
