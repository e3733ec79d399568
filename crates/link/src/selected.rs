//! A chain client that follows the chain selected in the [`ChainRegistry`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use wirelink_chain::{
    types::{
        AccountObject, GetAbiResponse, GetInfoResponse, GetTableRowsParams, GetTableRowsResponse,
        PackedTransaction, PushTransactionResponse, V2AccountResponse,
    },
    ChainApi, ChainError, HttpChainApi,
};
use wirelink_config::{ChainConfig, ChainRegistry};
use wirelink_primitives::Name;

type Connector = dyn Fn(&ChainConfig) -> Arc<dyn ChainApi> + Send + Sync;

/// Routes every call to a client for the currently selected chain.
///
/// Clients are built on first use and rebuilt whenever the selection changes, so a call always
/// reaches the endpoint of the chain selected when it was issued.
pub struct SelectedChain {
    chains: Arc<ChainRegistry>,
    connect: Box<Connector>,
    current: Mutex<Option<(ChainConfig, Arc<dyn ChainApi>)>>,
}

impl fmt::Debug for SelectedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.lock();
        f.debug_struct("SelectedChain")
            .field("chain", &current.as_ref().map(|(chain, _)| &chain.id))
            .finish_non_exhaustive()
    }
}

impl SelectedChain {
    /// Creates a router building clients with `connect`.
    pub fn new(
        chains: Arc<ChainRegistry>,
        connect: impl Fn(&ChainConfig) -> Arc<dyn ChainApi> + Send + Sync + 'static,
    ) -> Self {
        Self { chains, connect: Box::new(connect), current: Mutex::new(None) }
    }

    /// Creates a router talking to the selected chain over HTTP.
    pub fn http(chains: Arc<ChainRegistry>) -> Self {
        Self::new(chains, |chain| {
            Arc::new(
                HttpChainApi::new(&chain.endpoint).with_history_endpoint(chain.history_endpoint()),
            )
        })
    }

    /// Returns the client of the selected chain.
    pub fn api(&self) -> Arc<dyn ChainApi> {
        let selected = self.chains.selected();
        let mut current = self.current.lock();
        if let Some((chain, api)) = current.as_ref()
            && *chain == selected
        {
            return api.clone();
        }
        debug!(chain = %selected.name, endpoint = %selected.endpoint, "connecting to chain");
        let api = (self.connect)(&selected);
        *current = Some((selected, api.clone()));
        api
    }
}

#[async_trait]
impl ChainApi for SelectedChain {
    async fn get_account(&self, account: Name) -> Result<AccountObject, ChainError> {
        self.api().get_account(account).await
    }

    async fn get_account_v2(&self, account: Name) -> Result<V2AccountResponse, ChainError> {
        self.api().get_account_v2(account).await
    }

    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> Result<GetTableRowsResponse, ChainError> {
        self.api().get_table_rows(params).await
    }

    async fn get_info(&self) -> Result<GetInfoResponse, ChainError> {
        self.api().get_info().await
    }

    async fn get_abi(&self, account: Name) -> Result<GetAbiResponse, ChainError> {
        self.api().get_abi(account).await
    }

    async fn push_transaction(
        &self,
        trx: &PackedTransaction,
    ) -> Result<PushTransactionResponse, ChainError> {
        self.api().push_transaction(trx).await
    }
}
