//! The wallet connection state machine.

use crate::{utils::short_address, ProviderEvent, WalletError, WalletKind, WalletProvider};
use alloy_primitives::Signature;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use wirelink_common::{GenerationGuard, Observable};

/// An account the wallet authorized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectedAccount {
    /// Address as reported by the wallet.
    pub address: String,
    /// Display name, the shortened address.
    pub username: String,
    /// Wallet family the account belongs to.
    pub account_type: WalletKind,
}

impl ConnectedAccount {
    /// Creates an account entry for `address`.
    pub fn new(address: impl Into<String>, account_type: WalletKind) -> Self {
        let address = address.into();
        Self { username: short_address(&address), address, account_type }
    }

    /// Returns `true` if this entry is for `address`, ignoring case.
    pub fn matches(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// An established wallet connection.
///
/// `active_account`, when set, is always an element of `available_accounts`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connection {
    /// Chain the wallet is on.
    pub chain_id: Option<u64>,
    /// Selected account.
    pub active_account: Option<ConnectedAccount>,
    /// Accounts the wallet authorized, in wallet order.
    pub available_accounts: Vec<ConnectedAccount>,
}

impl Connection {
    fn find(&self, address: &str) -> Option<&ConnectedAccount> {
        self.available_accounts.iter().find(|a| a.matches(address))
    }

    /// Replaces the account list, keeping the selection only if it is still listed.
    fn refresh_accounts(&mut self, accounts: Vec<ConnectedAccount>) {
        self.available_accounts = accounts;
        if let Some(active) = self.active_account.take() {
            self.active_account = self.find(&active.address).cloned();
        }
    }
}

/// Coarse state of a [`ConnectionStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No wallet connection.
    Disconnected,
    /// Waiting for the wallet to authorize accounts.
    Connecting,
    /// Connected, no account selected.
    AccountsAvailable,
    /// Connected with a selected account.
    AccountSelected,
}

/// The published connection snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No wallet connection.
    #[default]
    Disconnected,
    /// Waiting for the wallet to authorize accounts.
    Connecting,
    /// Connected.
    Connected(Connection),
}

impl ConnectionStatus {
    /// Returns the coarse phase.
    pub fn phase(&self) -> ConnectionPhase {
        match self {
            Self::Disconnected => ConnectionPhase::Disconnected,
            Self::Connecting => ConnectionPhase::Connecting,
            Self::Connected(c) if c.active_account.is_some() => ConnectionPhase::AccountSelected,
            Self::Connected(_) => ConnectionPhase::AccountsAvailable,
        }
    }

    /// Returns the connection, if established.
    pub fn connection(&self) -> Option<&Connection> {
        match self {
            Self::Connected(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the selected account.
    pub fn active_account(&self) -> Option<&ConnectedAccount> {
        self.connection().and_then(|c| c.active_account.as_ref())
    }
}

/// Single source of truth for the wallet connection.
///
/// Every transition is published to subscribers before the triggering call returns.
#[derive(Debug)]
pub struct ConnectionState {
    provider: Option<Arc<dyn WalletProvider>>,
    status: Observable<ConnectionStatus>,
    generation: GenerationGuard,
}

impl ConnectionState {
    /// Creates a disconnected state. `None` means no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { provider, status: Observable::default(), generation: GenerationGuard::new() }
    }

    /// Returns the wallet provider.
    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    /// Subscribes to wallet events, if a wallet is installed.
    pub fn provider_events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|p| p.subscribe())
    }

    /// Returns the current snapshot.
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Subscribes to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.status.with(ConnectionStatus::phase)
    }

    /// Returns `true` once the wallet authorized accounts.
    pub fn is_connected(&self) -> bool {
        self.status.with(|s| s.connection().is_some())
    }

    /// Returns the current connection.
    pub fn connection(&self) -> Option<Connection> {
        self.status.with(|s| s.connection().cloned())
    }

    /// Returns the selected account.
    pub fn active_account(&self) -> Option<ConnectedAccount> {
        self.status.with(|s| s.active_account().cloned())
    }

    /// Returns the address of the selected account.
    pub fn address(&self) -> Option<String> {
        self.status.with(|s| s.active_account().map(|a| a.address.clone()))
    }

    /// Returns the active chain id.
    pub fn chain_id(&self) -> Option<u64> {
        self.status.with(|s| s.connection().and_then(|c| c.chain_id))
    }

    /// Asks the wallet for accounts and the chain id.
    ///
    /// On success the state is connected with no account selected. Failures return to
    /// disconnected. A disconnect issued while waiting wins: the late answer is dropped and
    /// [`WalletError::Superseded`] is returned.
    pub async fn connect(&self) -> Result<Connection, WalletError> {
        let provider = self.provider.clone().ok_or(WalletError::ProviderUnavailable)?;
        let generation = self.generation.next();
        self.status.set(ConnectionStatus::Connecting);

        let result = async {
            let accounts = provider.request_accounts().await?;
            if accounts.is_empty() {
                return Err(WalletError::NoAccounts);
            }
            let chain_id = provider.request_chain_id().await?;
            Ok::<_, WalletError>((accounts, chain_id))
        }
        .await;

        if !self.generation.is_current(generation) {
            debug!("dropping superseded wallet connection");
            return Err(WalletError::Superseded);
        }

        match result {
            Ok((accounts, chain_id)) => {
                let kind = provider.kind();
                let connection = Connection {
                    chain_id: Some(chain_id),
                    active_account: None,
                    available_accounts: accounts
                        .into_iter()
                        .map(|a| ConnectedAccount::new(a, kind))
                        .collect(),
                };
                debug!(chain_id, accounts = connection.available_accounts.len(), "wallet connected");
                self.status.set(ConnectionStatus::Connected(connection.clone()));
                Ok(connection)
            }
            Err(err) => {
                debug!(%err, "wallet connection failed");
                self.status.set(ConnectionStatus::Disconnected);
                Err(err)
            }
        }
    }

    /// Selects one of the available accounts.
    pub fn select_account(&self, address: &str) -> Result<ConnectedAccount, WalletError> {
        let mut outcome = Err(WalletError::NotConnected);
        self.status.update(|status| {
            let ConnectionStatus::Connected(connection) = status else { return false };
            let Some(account) = connection.find(address).cloned() else {
                outcome = Err(WalletError::UnknownAddress(address.to_string()));
                return false;
            };
            connection.active_account = Some(account.clone());
            outcome = Ok(account);
            true
        });
        if let Ok(account) = &outcome {
            debug!(address = %account.address, "account selected");
        }
        outcome
    }

    /// Clears the selection, keeping the account list.
    pub fn change_account(&self) {
        self.status.update(|status| match status {
            ConnectionStatus::Connected(c) => c.active_account.take().is_some(),
            _ => false,
        });
    }

    /// Drops the connection. Also cancels a pending [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.generation.next();
        if self.status.set_if_changed(ConnectionStatus::Disconnected) {
            debug!("wallet disconnected");
        }
    }

    /// Applies a wallet event.
    ///
    /// Events received while not connected are ignored: they never connect implicitly.
    pub fn handle_event(&self, event: ProviderEvent) {
        let kind = self.provider.as_ref().map(|p| p.kind()).unwrap_or_default();
        match event {
            ProviderEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                if self.is_connected() {
                    self.disconnect();
                }
            }
            ProviderEvent::AccountsChanged(accounts) => {
                let accounts = accounts.into_iter().map(|a| ConnectedAccount::new(a, kind)).collect();
                let changed = self.status.update(|status| match status {
                    ConnectionStatus::Connected(c) => {
                        c.refresh_accounts(accounts);
                        true
                    }
                    _ => false,
                });
                if !changed {
                    debug!("ignoring account change while disconnected");
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                self.status.update(|status| match status {
                    ConnectionStatus::Connected(c) if c.chain_id != Some(chain_id) => {
                        c.chain_id = Some(chain_id);
                        true
                    }
                    _ => false,
                });
            }
        }
    }

    /// Signs `message` with the selected account.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        let address = self.address().ok_or(WalletError::NotConnected)?;
        let provider = self.provider.clone().ok_or(WalletError::ProviderUnavailable)?;
        Ok(provider.sign_personal_message(&address, message).await?)
    }
}
