use crate::{
    types::{
        AccountObject, GetAbiResponse, GetInfoResponse, GetTableRowsParams, GetTableRowsResponse,
        PackedTransaction, PushTransactionResponse, V2AccountResponse,
    },
    ChainError,
};
use async_trait::async_trait;
use std::fmt;
use wirelink_primitives::Name;

/// The chain RPC calls wirelink relies on.
///
/// Implementations decode node errors into [`ChainError::Api`] so that callers never inspect raw
/// response bodies.
#[async_trait]
pub trait ChainApi: fmt::Debug + Send + Sync {
    /// `v1/chain/get_account`.
    async fn get_account(&self, account: Name) -> Result<AccountObject, ChainError>;

    /// `v2/state/get_account`, served by the history API.
    async fn get_account_v2(&self, account: Name) -> Result<V2AccountResponse, ChainError>;

    /// `v1/chain/get_table_rows`.
    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> Result<GetTableRowsResponse, ChainError>;

    /// `v1/chain/get_info`.
    async fn get_info(&self) -> Result<GetInfoResponse, ChainError>;

    /// `v1/chain/get_abi`.
    async fn get_abi(&self, account: Name) -> Result<GetAbiResponse, ChainError>;

    /// `v1/chain/push_transaction`.
    async fn push_transaction(
        &self,
        trx: &PackedTransaction,
    ) -> Result<PushTransactionResponse, ChainError>;
}
