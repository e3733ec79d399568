//! Wiring of every component into one session.

use crate::{
    AccountResolver, ChainAccountRecord, LinkError, LinkProtocol, LinkRecord, LinkRegistry,
    SelectedChain, TransactionSubmitter,
};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use wirelink_chain::{types::PushTransactionResponse, ChainApi};
use wirelink_common::KeyValueStore;
use wirelink_config::{ChainRegistry, ConfigError, LinkConfig};
use wirelink_primitives::{derive_identity, Identity};
use wirelink_wallets::{
    ConnectedAccount, Connection, ConnectionState, ConnectionStatus, KeyCache, KeyRecovery,
    ProviderEvent, WalletError, WalletProvider,
};

/// Keeps the account and link state in line with the active wallet address.
#[derive(Clone, Debug)]
pub struct Reconciler {
    accounts: Arc<AccountResolver>,
    links: Arc<LinkRegistry>,
}

impl Reconciler {
    /// Creates a reconciler updating `accounts` and `links`.
    pub fn new(accounts: Arc<AccountResolver>, links: Arc<LinkRegistry>) -> Self {
        Self { accounts, links }
    }

    /// Resolves the account of `address` and checks its link. `None` clears both.
    pub async fn reconcile(&self, address: Option<&str>) {
        let Some(address) = address else {
            self.accounts.clear();
            self.links.clear();
            return;
        };
        match self.accounts.resolve(address).await {
            Ok(record) => self.links.check_link_status(&record.identity()).await,
            // A newer reconcile or a disconnect owns the state now.
            Err(LinkError::Superseded) => debug!(address, "dropping superseded reconcile"),
            Err(err) => {
                debug!(address, err = %err.message(), "no account for address");
                self.links.clear();
            }
        }
    }
}

/// Handle of the task spawned by [`WireLink::spawn_event_listener`]. Dropping it stops the task.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Returns `true` once the task stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A wallet linking session.
#[derive(Debug)]
pub struct WireLink {
    config: LinkConfig,
    chains: Arc<ChainRegistry>,
    connection: Arc<ConnectionState>,
    keys: Arc<KeyRecovery>,
    accounts: Arc<AccountResolver>,
    links: Arc<LinkRegistry>,
    protocol: Arc<LinkProtocol>,
    reconciler: Reconciler,
}

impl WireLink {
    /// Builds a session from its collaborators. `provider` is `None` when no wallet is installed.
    pub fn new(
        config: LinkConfig,
        chain: Arc<dyn ChainApi>,
        provider: Option<Arc<dyn WalletProvider>>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let chains = Arc::new(ChainRegistry::load(store.clone()));
        Self::with_chains(config, chain, provider, store, chains)
    }

    /// Like [`Self::new`], with an explicit chain registry.
    pub fn with_chains(
        config: LinkConfig,
        chain: Arc<dyn ChainApi>,
        provider: Option<Arc<dyn WalletProvider>>,
        store: Arc<dyn KeyValueStore>,
        chains: Arc<ChainRegistry>,
    ) -> Self {
        let connection = Arc::new(ConnectionState::new(provider));
        let cache = Arc::new(KeyCache::load(store));
        let keys = Arc::new(KeyRecovery::new(connection.clone(), cache, config.pub_key_message.clone()));
        let accounts = Arc::new(AccountResolver::new(chain.clone()));
        let links = Arc::new(LinkRegistry::new(chain.clone(), accounts.clone(), &config));
        let submitter =
            Arc::new(TransactionSubmitter::new(chain, connection.clone(), config.expire_seconds));
        let protocol = Arc::new(LinkProtocol::new(
            connection.clone(),
            keys.clone(),
            submitter,
            links.clone(),
            chains.clone(),
            config.clone(),
        ));
        let reconciler = Reconciler::new(accounts.clone(), links.clone());
        Self { config, chains, connection, keys, accounts, links, protocol, reconciler }
    }

    /// Loads [`LinkConfig`] and builds a session from it with [`Self::from_config`].
    pub fn load(provider: Option<Arc<dyn WalletProvider>>) -> Result<Self, ConfigError> {
        Ok(Self::from_config(LinkConfig::load()?, provider))
    }

    /// Builds a session talking to the selected chain over HTTP, persisting state as configured.
    pub fn from_config(config: LinkConfig, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let store = config.store();
        let chains = Arc::new(ChainRegistry::load(store.clone()));
        let chain = SelectedChain::http(chains.clone());
        Self::with_chains(config, Arc::new(chain), provider, store, chains)
    }

    /// Returns the config.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Returns the chain registry.
    pub fn chains(&self) -> &Arc<ChainRegistry> {
        &self.chains
    }

    /// Returns the connection state.
    pub fn connection(&self) -> &Arc<ConnectionState> {
        &self.connection
    }

    /// Returns the key recovery.
    pub fn keys(&self) -> &Arc<KeyRecovery> {
        &self.keys
    }

    /// Returns the account resolver.
    pub fn accounts(&self) -> &Arc<AccountResolver> {
        &self.accounts
    }

    /// Returns the link registry.
    pub fn links(&self) -> &Arc<LinkRegistry> {
        &self.links
    }

    /// Returns the link protocol.
    pub fn protocol(&self) -> &Arc<LinkProtocol> {
        &self.protocol
    }

    /// Connects the wallet.
    pub async fn connect(&self) -> Result<Connection, WalletError> {
        self.connection.connect().await
    }

    /// Disconnects the wallet and forgets account and link state.
    pub fn disconnect(&self) {
        self.connection.disconnect();
        self.accounts.clear();
        self.links.clear();
        self.protocol.reset();
    }

    /// Selects a wallet account. The account and link follow through the event listener or
    /// [`Self::sync`].
    pub fn select_account(&self, address: &str) -> Result<ConnectedAccount, WalletError> {
        self.connection.select_account(address)
    }

    /// Clears the account selection.
    pub fn change_account(&self) {
        self.connection.change_account();
    }

    /// Brings account and link state in line with the selected address.
    pub async fn sync(&self) {
        let address = self.connection.address();
        self.reconciler.reconcile(address.as_deref()).await;
    }

    /// Resolves the chain account of an address or identity.
    pub async fn resolve_account(&self, address_or_identity: &str) -> Result<ChainAccountRecord, LinkError> {
        self.accounts.resolve(address_or_identity).await
    }

    /// Returns the public key of the selected account.
    pub async fn public_key(&self) -> Result<String, LinkError> {
        Ok(self.keys.retrieve().await?)
    }

    /// Refreshes the link state of `identity`.
    pub async fn check_link_status(&self, identity: &Identity) {
        self.links.check_link_status(identity).await;
    }

    /// Looks up the link of `identity`, or of the current account.
    pub async fn check_link(&self, identity: Option<&Identity>) -> Result<LinkRecord, LinkError> {
        self.links.check_link(identity).await
    }

    /// Returns the identity links are created for: the resolved account, else the identity
    /// derived from the selected address.
    pub fn identity(&self) -> Result<Identity, LinkError> {
        if let Some(identity) = self.accounts.identity() {
            return Ok(identity);
        }
        let address = self.connection.address().ok_or(WalletError::NotConnected)?;
        Ok(derive_identity(&address)?)
    }

    /// Creates a link for the current identity.
    pub async fn create_link(&self) -> Result<PushTransactionResponse, LinkError> {
        self.protocol.create_link(&self.identity()?).await
    }

    /// Authorizes the link of the current identity.
    pub async fn authorize_link(&self) -> Result<PushTransactionResponse, LinkError> {
        self.protocol.authorize_link(&self.identity()?).await
    }

    /// Subscribes to connection snapshots.
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe()
    }

    /// Spawns a task applying wallet events and reconciling account and link state whenever the
    /// selected address changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_event_listener(&self) -> SyncHandle {
        let connection = self.connection.clone();
        let reconciler = self.reconciler.clone();
        let mut events = connection.provider_events();
        let mut status = connection.subscribe();
        let mut address = status.borrow_and_update().active_account().map(|a| a.address.clone());

        let task = tokio::spawn(async move {
            reconciler.reconcile(address.as_deref()).await;
            loop {
                tokio::select! {
                    event = next_event(&mut events) => match event {
                        Ok(event) => connection.handle_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "wallet events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("wallet event stream closed");
                            events = None;
                        }
                    },
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current =
                            status.borrow_and_update().active_account().map(|a| a.address.clone());
                        if current != address {
                            address = current;
                            reconciler.reconcile(address.as_deref()).await;
                        }
                    }
                }
            }
        });
        SyncHandle { task }
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<ProviderEvent>>,
) -> Result<ProviderEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
