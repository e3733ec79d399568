//! The two-step link protocol: create the link, then authorize it.

use crate::{ActionDescriptor, LinkError, LinkRegistry, TransactionSubmitter};
use alloy_primitives::{hex, keccak256, B256};
use parking_lot::Mutex;
use serde_json::json;
use std::{fmt, sync::Arc};
use tokio::sync::watch;
use wirelink_chain::{types::PushTransactionResponse, PermissionLevel};
use wirelink_common::Observable;
use wirelink_config::{ChainRegistry, LinkConfig};
use wirelink_primitives::{compress_public_key, Identity, KeyType, Name, WireSignature};
use wirelink_wallets::{ConnectionState, KeyRecovery, WalletError};

const CREATE_LINK: Name = Name::new("createlink");
const LINK_AUTH: Name = Name::new("linkauth");

/// Progress of the link protocol. Only moves forward, except for [`LinkProtocol::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkStep {
    /// Nothing submitted yet.
    #[default]
    NotStarted,
    /// `createlink` was executed.
    LinkCreated,
    /// The `linkauth` actions were executed.
    AuthorizationGranted,
}

/// Hash signed by the wallet to create a link: `keccak256(compressed_key ∥ nonce ∥ identity)`.
pub fn link_message_hash(compressed_key: &str, nonce: u64, identity: &Identity) -> B256 {
    keccak256(format!("{compressed_key}{nonce}{identity}"))
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Drives link creation and authorization for the active wallet account.
pub struct LinkProtocol {
    connection: Arc<ConnectionState>,
    keys: Arc<KeyRecovery>,
    submitter: Arc<TransactionSubmitter>,
    registry: Arc<LinkRegistry>,
    chains: Arc<ChainRegistry>,
    config: LinkConfig,
    step: Observable<LinkStep>,
    /// Identity the last `createlink` was executed for.
    created_for: Mutex<Option<Identity>>,
    clock: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl fmt::Debug for LinkProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkProtocol")
            .field("step", &self.step.get())
            .field("created_for", &*self.created_for.lock())
            .finish_non_exhaustive()
    }
}

impl LinkProtocol {
    /// Creates a protocol at [`LinkStep::NotStarted`].
    pub fn new(
        connection: Arc<ConnectionState>,
        keys: Arc<KeyRecovery>,
        submitter: Arc<TransactionSubmitter>,
        registry: Arc<LinkRegistry>,
        chains: Arc<ChainRegistry>,
        config: LinkConfig,
    ) -> Self {
        Self {
            connection,
            keys,
            submitter,
            registry,
            chains,
            config,
            step: Observable::default(),
            created_for: Mutex::new(None),
            clock: Arc::new(now_millis),
        }
    }

    /// Replaces the nonce source, milliseconds since the epoch by default.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the current step.
    pub fn step(&self) -> LinkStep {
        self.step.get()
    }

    /// Subscribes to the step.
    pub fn subscribe(&self) -> watch::Receiver<LinkStep> {
        self.step.subscribe()
    }

    /// Goes back to [`LinkStep::NotStarted`]. Nothing on chain is undone.
    pub fn reset(&self) {
        *self.created_for.lock() = None;
        self.step.set_if_changed(LinkStep::NotStarted);
    }

    fn advance(&self, step: LinkStep) {
        self.step.update(|current| {
            if *current < step {
                *current = step;
                true
            } else {
                false
            }
        });
    }

    fn active(&self, identity: &Identity) -> Result<PermissionLevel, LinkError> {
        if self.connection.address().is_none() {
            return Err(WalletError::NotConnected.into());
        }
        Ok(PermissionLevel::new(identity.to_name()?, self.config.active_permission))
    }

    /// Creates a link between `identity` and the public key of the active wallet account.
    ///
    /// The key is recovered first unless cached. The wallet signs the link hash, and the
    /// signature is submitted with `createlink`. A failed attempt can simply be retried: every
    /// attempt uses a fresh nonce.
    pub async fn create_link(&self, identity: &Identity) -> Result<PushTransactionResponse, LinkError> {
        let authorization = self.active(identity)?;
        let pub_key = self.keys.retrieve().await?;
        let compressed = compress_public_key(&pub_key)?;
        let nonce = (self.clock)();
        let msg_hash = link_message_hash(&compressed, nonce, identity);
        debug!(%identity, nonce, "creating link");

        let signature = self.connection.sign_message(msg_hash.as_slice()).await?;
        let signature = WireSignature::from_wallet(&signature, KeyType::K1);
        let action = ActionDescriptor::json(
            self.config.link_contract,
            CREATE_LINK,
            vec![authorization],
            json!({
                "sig": signature.to_string(),
                "msg_hash": hex::encode(msg_hash),
                "nonce": nonce,
                "account_name": authorization.actor.to_string(),
            }),
        );
        let response = self.submitter.push(&[action]).await?;

        *self.created_for.lock() = Some(identity.clone());
        self.advance(LinkStep::LinkCreated);
        debug!(%identity, id = %response.transaction_id, "link created");
        Ok(response)
    }

    /// Lets the link's external permission authorize the configured actions of the settle
    /// contract, in one transaction.
    ///
    /// Fails with [`LinkError::LinkNotCreated`] unless a link was created for `identity` in this
    /// session or the registry currently shows one.
    pub async fn authorize_link(&self, identity: &Identity) -> Result<PushTransactionResponse, LinkError> {
        let authorization = self.active(identity)?;
        let created = self.step() == LinkStep::LinkCreated
            && self.created_for.lock().as_ref().is_some_and(|created| created == identity);
        if !created && !self.registry.has_link_for(identity) {
            return Err(LinkError::LinkNotCreated(identity.to_string()));
        }

        let namespace: Name = self.chains.namespace().parse()?;
        let account = authorization.actor.to_string();
        let actions: Vec<_> = self
            .config
            .auth_actions
            .iter()
            .map(|action| {
                ActionDescriptor::json(
                    namespace,
                    LINK_AUTH,
                    vec![authorization],
                    json!({
                        "account": account,
                        "code": self.config.settle_contract.to_string(),
                        "type": action.to_string(),
                        "requirement": self.config.external_permission.to_string(),
                    }),
                )
            })
            .collect();
        debug!(%identity, %namespace, actions = actions.len(), "authorizing link");
        let response = self.submitter.push(&actions).await?;

        self.advance(LinkStep::AuthorizationGranted);
        self.registry.check_link_status(identity).await;
        Ok(response)
    }
}
