//! # wirelink-config
//!
//! Wirelink configuration.
//!
//! [`LinkConfig`] is layered with [`figment`]: built-in defaults, then `wirelink.toml` in the
//! working directory, then `WIRELINK_*` environment variables.
//!
//! [`ChainRegistry`] holds the list of known chains and the selected one, persisted under
//! [`CHAINS_KEY`](wirelink_common::storage::CHAINS_KEY).

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use wirelink_common::{FileStore, KeyValueStore, NullStore};
use wirelink_primitives::Name;

mod chains;
pub use chains::{ChainConfig, ChainRegistry};

mod error;
pub use error::ConfigError;

/// Wirelink configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Contract holding link records and the `createlink` action.
    pub link_contract: Name,
    /// Table of link records in [`Self::link_contract`].
    pub links_table: Name,
    /// Page size of the secondary-index lookup of link records.
    pub link_page_size: u32,
    /// Contract whose actions the external permission is linked to.
    pub settle_contract: Name,
    /// Actions of [`Self::settle_contract`] authorized by the link, one `linkauth` each.
    pub auth_actions: Vec<Name>,
    /// Permission required by the linked actions.
    pub external_permission: Name,
    /// Permission authorizing link transactions.
    pub active_permission: Name,
    /// Challenge message signed to recover a wallet's public key.
    pub pub_key_message: String,
    /// Seconds until a submitted transaction expires, counted from the head block time.
    pub expire_seconds: u32,
    /// Directory of the persistent store. `None` runs without persistence.
    pub storage_dir: Option<PathBuf>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            link_contract: Self::DEFAULT_LINK_CONTRACT,
            links_table: Name::new("links"),
            link_page_size: 50,
            settle_contract: Name::new("settle.wns"),
            auth_actions: ["initdeposit", "setpending", "canceldep", "utxoxfer", "withdraw"]
                .into_iter()
                .map(Name::new)
                .collect(),
            external_permission: Name::new("auth.ext"),
            active_permission: Name::new("active"),
            pub_key_message: "Retrieve Public Key".to_string(),
            expire_seconds: 120,
            storage_dir: Self::wirelink_dir(),
        }
    }
}

impl LinkConfig {
    /// File name of the config file.
    pub const FILE_NAME: &'static str = "wirelink.toml";

    /// Prefix of environment variables overriding config values.
    pub const ENV_PREFIX: &'static str = "WIRELINK_";

    /// Default contract holding link records.
    pub const DEFAULT_LINK_CONTRACT: Name = Name::new("auth.msg");

    /// Name of the directory holding persisted state, relative to the home directory.
    pub const WIRELINK_DIR_NAME: &'static str = ".wirelink";

    /// Returns the default figment: defaults, then `wirelink.toml`, then `WIRELINK_*` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::FILE_NAME))
            .merge(Env::prefixed(Self::ENV_PREFIX))
    }

    /// Loads the config from the default figment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_provider(Self::figment())
    }

    /// Extracts a config from `provider`.
    pub fn from_provider<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        trace!(target: "wirelink::config", "load config with provider: {:?}", provider.metadata());
        Figment::from(provider).extract().map_err(ConfigError::from)
    }

    /// Returns the path to wirelink's state dir: `~/.wirelink/`.
    pub fn wirelink_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(Self::WIRELINK_DIR_NAME))
    }

    /// Opens the key-value store described by [`Self::storage_dir`].
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        match &self.storage_dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => {
                debug!(target: "wirelink::config", "no storage dir configured, persistence disabled");
                Arc::new(NullStore)
            }
        }
    }
}
