//! Building, signing and submitting transactions with the connected wallet.

use crate::LinkError;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use wirelink_chain::{
    types::PushTransactionResponse, Abi, Action, ChainApi, ChainError, PermissionLevel,
    Transaction,
};
use wirelink_common::errors::clean_message;
use wirelink_primitives::{KeyType, Name, WireSignature};
use wirelink_wallets::{ConnectionState, WalletError};

/// Data of an [`ActionDescriptor`].
#[derive(Clone, Debug, PartialEq)]
pub enum ActionData {
    /// JSON data, packed with the contract's ABI.
    Json(Value),
    /// Already packed data.
    Packed(Vec<u8>),
}

/// An action before its data is packed.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDescriptor {
    /// Contract.
    pub account: Name,
    /// Action name.
    pub name: Name,
    /// Authorizing permissions.
    pub authorization: Vec<PermissionLevel>,
    /// Data.
    pub data: ActionData,
}

impl ActionDescriptor {
    /// Creates an action with JSON data.
    pub fn json(account: Name, name: Name, authorization: Vec<PermissionLevel>, data: Value) -> Self {
        Self { account, name, authorization, data: ActionData::Json(data) }
    }

    /// Creates an action with packed data.
    pub fn packed(account: Name, name: Name, authorization: Vec<PermissionLevel>, data: Vec<u8>) -> Self {
        Self { account, name, authorization, data: ActionData::Packed(data) }
    }
}

#[derive(Debug, thiserror::Error)]
enum SubmitError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl SubmitError {
    fn message(&self) -> String {
        match self {
            Self::Chain(err) => err.message(),
            Self::Wallet(err) => clean_message(&err.to_string()),
        }
    }
}

/// Submits transactions signed by the active wallet account.
#[derive(Debug)]
pub struct TransactionSubmitter {
    chain: Arc<dyn ChainApi>,
    connection: Arc<ConnectionState>,
    expire_seconds: u32,
}

impl TransactionSubmitter {
    /// Creates a submitter whose transactions expire `expire_seconds` after the head block.
    pub fn new(chain: Arc<dyn ChainApi>, connection: Arc<ConnectionState>, expire_seconds: u32) -> Self {
        Self { chain, connection, expire_seconds }
    }

    /// Packs the data of every descriptor. Each contract's ABI is fetched at most once.
    pub async fn to_actions(&self, descriptors: &[ActionDescriptor]) -> Result<Vec<Action>, ChainError> {
        let mut abis: HashMap<Name, Option<Abi>> = HashMap::new();
        let mut actions = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let data = match &descriptor.data {
                ActionData::Packed(data) => data.clone(),
                ActionData::Json(value) => {
                    if !abis.contains_key(&descriptor.account) {
                        let abi = self.chain.get_abi(descriptor.account).await?.abi.map(Abi::from);
                        abis.insert(descriptor.account, abi);
                    }
                    let abi = abis
                        .get(&descriptor.account)
                        .and_then(Option::as_ref)
                        .ok_or(ChainError::MissingAbi(descriptor.account))?;
                    abi.encode_action_data(descriptor.name, value)?
                }
            };
            actions.push(Action {
                account: descriptor.account,
                name: descriptor.name,
                authorization: descriptor.authorization.clone(),
                data,
            });
        }
        Ok(actions)
    }

    async fn try_push(&self, descriptors: &[ActionDescriptor]) -> Result<PushTransactionResponse, SubmitError> {
        let actions = self.to_actions(descriptors).await?;
        let info = self.chain.get_info().await?;
        let trx = Transaction::new(info.transaction_header(self.expire_seconds)?, actions);
        let digest = trx.signing_digest(&info.chain_id);
        trace!(%digest, actions = trx.actions.len(), "signing transaction");

        let signature = self.connection.sign_message(digest.as_slice()).await?;
        let packed = trx.into_packed(vec![WireSignature::from_wallet(&signature, KeyType::EM)]);
        Ok(self.chain.push_transaction(&packed).await?)
    }

    /// Packs, signs and submits `descriptors` as one transaction.
    ///
    /// Every failure, including a transaction that was not executed, is reported as
    /// [`LinkError::TransactionFailed`] with a cleaned message.
    pub async fn push(&self, descriptors: &[ActionDescriptor]) -> Result<PushTransactionResponse, LinkError> {
        let response = self.try_push(descriptors).await.map_err(|err| {
            debug!(%err, "transaction failed");
            LinkError::TransactionFailed(err.message())
        })?;
        if !response.is_executed() {
            let status = response.status().unwrap_or("none");
            debug!(id = %response.transaction_id, status, "transaction not executed");
            return Err(LinkError::TransactionFailed(format!(
                "transaction {} was not executed (status: {status})",
                response.transaction_id
            )));
        }
        debug!(id = %response.transaction_id, block = response.processed.block_num, "transaction executed");
        Ok(response)
    }
}
