//! Resolution of wallet addresses to chain accounts.

use crate::LinkError;
use std::sync::Arc;
use tokio::sync::watch;
use wirelink_chain::{
    types::{AccountObject, Permission, V2AccountResponse},
    ChainApi,
};
use wirelink_common::{GenerationGuard, Observable};
use wirelink_primitives::{derive_identity, Identity, Name};

/// An account as returned by one of the two lookups.
#[derive(Clone, Debug, PartialEq)]
pub enum AccountLookup {
    /// Found by `v1/chain/get_account`.
    V1(AccountObject),
    /// Found by the history API.
    V2(V2AccountResponse),
}

impl AccountLookup {
    /// Normalizes the response.
    pub fn into_record(self) -> ChainAccountRecord {
        match self {
            Self::V1(account) => account.into(),
            Self::V2(response) => response.account.into(),
        }
    }
}

/// A resolved chain account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainAccountRecord {
    /// Account name.
    pub account_name: Name,
    /// Creation time.
    pub created: String,
    /// RAM quota in bytes.
    pub ram_quota: i64,
    /// RAM used in bytes.
    pub ram_usage: i64,
    /// Permissions of the account.
    pub permissions: Vec<Permission>,
}

impl ChainAccountRecord {
    /// Returns the account as an identity.
    pub fn identity(&self) -> Identity {
        self.account_name.into()
    }

    /// Returns the permission named `name`.
    pub fn permission(&self, name: Name) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.perm_name == name)
    }
}

impl From<AccountObject> for ChainAccountRecord {
    fn from(account: AccountObject) -> Self {
        Self {
            account_name: account.account_name,
            created: account.created,
            ram_quota: account.ram_quota,
            ram_usage: account.ram_usage,
            permissions: account.permissions,
        }
    }
}

/// Resolves addresses to accounts and publishes the current one.
#[derive(Debug)]
pub struct AccountResolver {
    chain: Arc<dyn ChainApi>,
    account: Observable<Option<ChainAccountRecord>>,
    no_account: Observable<bool>,
    username: Observable<Option<String>>,
    generation: GenerationGuard,
}

impl AccountResolver {
    /// Creates a resolver with no current account.
    pub fn new(chain: Arc<dyn ChainApi>) -> Self {
        Self {
            chain,
            account: Observable::new(None),
            no_account: Observable::new(true),
            username: Observable::new(None),
            generation: GenerationGuard::new(),
        }
    }

    /// Looks `identity` up with `get_account`, falling back to the history API unless
    /// `try_once` is set.
    pub async fn get_account(
        &self,
        identity: &Identity,
        try_once: bool,
    ) -> Result<AccountLookup, LinkError> {
        let not_found = || LinkError::AccountNotFound(identity.to_string());
        let name = identity.to_name().map_err(|_| not_found())?;

        let err = match self.chain.get_account(name).await {
            Ok(account) => return Ok(AccountLookup::V1(account)),
            Err(err) => err,
        };
        debug!(%identity, err = %err.message(), "primary account lookup failed");
        if try_once {
            return Err(not_found());
        }

        match self.chain.get_account_v2(name).await {
            Ok(response) => Ok(AccountLookup::V2(response)),
            Err(err) => {
                debug!(%identity, err = %err.message(), "fallback account lookup failed");
                Err(not_found())
            }
        }
    }

    /// Resolves an address or identity and publishes the result.
    ///
    /// Failures clear the current account. A result that arrives after a newer resolution or a
    /// [`clear`](Self::clear) is dropped and [`LinkError::Superseded`] is returned.
    pub async fn resolve(&self, address_or_identity: &str) -> Result<ChainAccountRecord, LinkError> {
        let generation = self.generation.next();
        let result = match derive_identity(address_or_identity) {
            Ok(identity) => self.get_account(&identity, false).await.map(AccountLookup::into_record),
            Err(err) => Err(err.into()),
        };

        if !self.generation.is_current(generation) {
            debug!(address_or_identity, "dropping superseded account resolution");
            return Err(LinkError::Superseded);
        }
        match &result {
            Ok(record) => {
                debug!(account = %record.account_name, "account resolved");
                self.username.set(Some(record.account_name.to_string()));
                self.no_account.set_if_changed(false);
                self.account.set(Some(record.clone()));
            }
            Err(err) => {
                debug!(address_or_identity, %err, "account resolution failed");
                self.publish_cleared();
            }
        }
        result
    }

    /// Forgets the current account and cancels pending resolutions.
    pub fn clear(&self) {
        self.generation.next();
        self.publish_cleared();
    }

    fn publish_cleared(&self) {
        self.account.set_if_changed(None);
        self.no_account.set_if_changed(true);
        self.username.set_if_changed(None);
    }

    /// Returns the current account.
    pub fn current(&self) -> Option<ChainAccountRecord> {
        self.account.get()
    }

    /// Subscribes to the current account.
    pub fn subscribe(&self) -> watch::Receiver<Option<ChainAccountRecord>> {
        self.account.subscribe()
    }

    /// Returns `true` unless an account is resolved.
    pub fn has_no_account(&self) -> bool {
        self.no_account.get()
    }

    /// Subscribes to the no-account flag.
    pub fn subscribe_no_account(&self) -> watch::Receiver<bool> {
        self.no_account.subscribe()
    }

    /// Returns the display username of the current account.
    pub fn username(&self) -> Option<String> {
        self.username.get()
    }

    /// Subscribes to the username.
    pub fn subscribe_username(&self) -> watch::Receiver<Option<String>> {
        self.username.subscribe()
    }

    /// Returns the identity of the current account.
    pub fn identity(&self) -> Option<Identity> {
        self.username().map(Identity::new)
    }
}
