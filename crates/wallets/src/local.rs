use crate::{
    utils::create_private_key_signer, ProviderError, ProviderEvent, WalletKind, WalletProvider,
};
use alloy_primitives::{Address, Signature};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;

/// JSON-RPC code for requests naming an account the wallet did not authorize.
const UNAUTHORIZED_CODE: i64 = 4100;

/// A [`WalletProvider`] backed by in-process private keys.
///
/// Useful for headless tools and tests: it behaves like an injected wallet whose user approves
/// everything, unless told to reject.
#[derive(Debug)]
pub struct LocalWalletProvider {
    kind: WalletKind,
    signers: Vec<PrivateKeySigner>,
    /// Accounts currently exposed, a subset of `signers`.
    exposed: Mutex<Vec<Address>>,
    chain_id: AtomicU64,
    rejecting: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWalletProvider {
    /// Creates a provider exposing every signer, in order.
    pub fn new(signers: Vec<PrivateKeySigner>, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        let exposed = signers.iter().map(|s| s.address()).collect();
        Self {
            kind: WalletKind::MetaMask,
            signers,
            exposed: Mutex::new(exposed),
            chain_id: AtomicU64::new(chain_id),
            rejecting: AtomicBool::new(false),
            events,
        }
    }

    /// Creates a provider from hex private keys.
    pub fn from_private_keys(keys: &[&str], chain_id: u64) -> eyre::Result<Self> {
        let signers = keys.iter().map(|key| create_private_key_signer(key)).collect::<eyre::Result<_>>()?;
        Ok(Self::new(signers, chain_id))
    }

    /// Sets the reported wallet family.
    pub fn with_kind(mut self, kind: WalletKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the addresses of every signer.
    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }

    /// Makes every subsequent request fail as if the user dismissed it.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Exposes only `accounts` and notifies subscribers. Unknown addresses are dropped.
    pub fn set_accounts(&self, accounts: &[Address]) {
        let exposed: Vec<Address> = accounts
            .iter()
            .copied()
            .filter(|a| self.signers.iter().any(|s| s.address() == *a))
            .collect();
        *self.exposed.lock() = exposed.clone();
        self.emit(ProviderEvent::AccountsChanged(exposed.iter().map(Address::to_string).collect()));
    }

    /// Switches networks and notifies subscribers.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        self.emit(ProviderEvent::ChainChanged(chain_id));
    }

    /// Sends `event` to every subscriber.
    pub fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn ensure_approved(&self) -> Result<(), ProviderError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected("User rejected the request.".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.ensure_approved()?;
        Ok(self.exposed.lock().iter().map(Address::to_string).collect())
    }

    async fn request_chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn sign_personal_message(
        &self,
        address: &str,
        message: &[u8],
    ) -> Result<Signature, ProviderError> {
        self.ensure_approved()?;
        let address: Address = address
            .parse()
            .map_err(|e| ProviderError::from_rpc(-32602, format!("invalid address: {e}")))?;
        let signer = self
            .signers
            .iter()
            .find(|s| s.address() == address)
            .ok_or_else(|| ProviderError::from_rpc(UNAUTHORIZED_CODE, "unauthorized account"))?;
        trace!(%address, len = message.len(), "signing personal message");
        signer.sign_message(message).await.map_err(|e| ProviderError::from_rpc(-32603, e.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
