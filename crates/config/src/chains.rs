//! The persisted list of chains and the selected one.

use crate::ConfigError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use wirelink_common::{storage::CHAINS_KEY, KeyValueStore, Observable};

/// Connection settings of one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Display name.
    pub name: String,
    /// Chain id, as hex.
    pub id: String,
    /// RPC endpoint.
    pub endpoint: String,
    /// History endpoint serving the `v2` API, if it differs from [`Self::endpoint`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperion: Option<String>,
    /// State-history websocket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<String>,
    /// Watchdog service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchdawg: Option<String>,
    /// Account owning the system contract.
    pub namespace: String,
    /// Symbol of the core token.
    pub core_symbol: String,
    /// Whether this is the selected chain.
    #[serde(default)]
    pub selected: bool,
}

impl ChainConfig {
    /// Returns the chains known out of the box. The first one is selected.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "Local Chain".to_string(),
                id: "local".to_string(),
                endpoint: "https://det-dev.gitgo.app".to_string(),
                hyperion: None,
                websocket: None,
                watchdawg: None,
                namespace: "sysio".to_string(),
                core_symbol: "SYS".to_string(),
                selected: true,
            },
            Self {
                name: "Wire Testnet".to_string(),
                id: "065dcca2dc758af25bcf3b878260a19dd1b81e4597f2af15a262a0c67f1e0106".to_string(),
                endpoint: "https://testnet-00.wire.foundation".to_string(),
                hyperion: None,
                websocket: Some("ws://testnet-ship.wire.foundation".to_string()),
                watchdawg: Some("https://dawg.wire.foundation".to_string()),
                namespace: "sysio".to_string(),
                core_symbol: "SYS".to_string(),
                selected: false,
            },
        ]
    }

    /// Returns the endpoint serving the `v2` history API.
    pub fn history_endpoint(&self) -> &str {
        self.hyperion.as_deref().unwrap_or(&self.endpoint)
    }
}

/// The known chains, with exactly one selected at any time.
///
/// The list is read from storage once; every selection change rewrites it in full. Storage
/// failures are logged and the registry keeps working from memory.
#[derive(Debug)]
pub struct ChainRegistry {
    store: Arc<dyn KeyValueStore>,
    chains: RwLock<Vec<ChainConfig>>,
    selected: Observable<ChainConfig>,
}

impl ChainRegistry {
    /// Loads the persisted list, seeding the defaults if nothing usable is stored.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let chains = match store.get_json::<Vec<ChainConfig>>(CHAINS_KEY) {
            Ok(Some(chains)) if !chains.is_empty() => chains,
            Ok(_) => {
                let chains = ChainConfig::defaults();
                if let Err(err) = store.set_json(CHAINS_KEY, &chains) {
                    debug!(target: "wirelink::chains", %err, "failed to seed chain list");
                }
                chains
            }
            Err(err) => {
                warn!(target: "wirelink::chains", %err, "failed to load chain list, using defaults");
                ChainConfig::defaults()
            }
        };
        Self::with_chains(store, chains)
    }

    /// Creates a registry over `chains` without reading storage. `chains` must not be empty.
    ///
    /// If no chain or more than one chain is marked selected, the first candidate wins.
    pub fn with_chains(store: Arc<dyn KeyValueStore>, mut chains: Vec<ChainConfig>) -> Self {
        if chains.is_empty() {
            chains = ChainConfig::defaults();
        }
        let index = chains.iter().position(|c| c.selected).unwrap_or(0);
        for (i, chain) in chains.iter_mut().enumerate() {
            chain.selected = i == index;
        }
        let selected = Observable::new(chains[index].clone());
        Self { store, chains: RwLock::new(chains), selected }
    }

    /// Returns the selected chain.
    pub fn selected(&self) -> ChainConfig {
        self.selected.get()
    }

    /// Subscribes to selection changes.
    pub fn subscribe(&self) -> watch::Receiver<ChainConfig> {
        self.selected.subscribe()
    }

    /// Returns the system contract account of the selected chain.
    pub fn namespace(&self) -> String {
        self.selected.with(|c| c.namespace.clone())
    }

    /// Returns every known chain.
    pub fn available(&self) -> Vec<ChainConfig> {
        self.chains.read().clone()
    }

    /// Selects the chain with `id` and persists the list.
    ///
    /// The new selection is published even if persisting fails; the storage error is returned.
    pub fn select_chain(&self, id: &str) -> Result<ChainConfig, ConfigError> {
        let (selected, snapshot) = {
            let mut chains = self.chains.write();
            if !chains.iter().any(|c| c.id == id) {
                return Err(ConfigError::UnknownChain(id.to_string()));
            }
            for chain in chains.iter_mut() {
                chain.selected = chain.id == id;
            }
            let selected = chains.iter().find(|c| c.selected).cloned();
            (selected, chains.clone())
        };
        let selected = selected.ok_or_else(|| ConfigError::UnknownChain(id.to_string()))?;
        debug!(target: "wirelink::chains", id, name = %selected.name, "selected chain");
        self.selected.set(selected.clone());

        match self.store.set_json(CHAINS_KEY, &snapshot) {
            Ok(()) => Ok(selected),
            Err(wirelink_common::StorageError::Unavailable) => Ok(selected),
            Err(err) => Err(err.into()),
        }
    }
}
