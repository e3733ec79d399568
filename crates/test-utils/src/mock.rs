use crate::fixtures;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Notify;
use wirelink_chain::{
    types::{
        AccountObject, GetAbiResponse, GetInfoResponse, GetTableRowsParams, GetTableRowsResponse,
        PackedTransaction, ProcessedTransaction, PushTransactionResponse, TransactionReceipt,
        V2AccountResponse,
    },
    AbiDef, ChainApi, ChainError,
};
use wirelink_primitives::Name;

/// A request received by [`MockChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// `get_account`.
    GetAccount(Name),
    /// `v2/state/get_account`.
    GetAccountV2(Name),
    /// `get_table_rows`.
    GetTableRows(GetTableRowsParams),
    /// `get_info`.
    GetInfo,
    /// `get_abi`.
    GetAbi(Name),
    /// `push_transaction`.
    PushTransaction(PackedTransaction),
}

impl Call {
    /// Returns the method of the call.
    pub fn method(&self) -> Method {
        match self {
            Self::GetAccount(_) => Method::GetAccount,
            Self::GetAccountV2(_) => Method::GetAccountV2,
            Self::GetTableRows(_) => Method::GetTableRows,
            Self::GetInfo => Method::GetInfo,
            Self::GetAbi(_) => Method::GetAbi,
            Self::PushTransaction(_) => Method::PushTransaction,
        }
    }
}

/// A [`ChainApi`] method, used to hold calls open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `get_account`.
    GetAccount,
    /// `v2/state/get_account`.
    GetAccountV2,
    /// `get_table_rows`.
    GetTableRows,
    /// `get_info`.
    GetInfo,
    /// `get_abi`.
    GetAbi,
    /// `push_transaction`.
    PushTransaction,
}

#[derive(Debug)]
struct State {
    accounts: HashMap<Name, AccountObject>,
    v2_accounts: HashMap<Name, AccountObject>,
    /// Rows of every table, with the index key they are found by.
    rows: Vec<(String, Value)>,
    table_error: Option<String>,
    abis: HashMap<Name, AbiDef>,
    info: GetInfoResponse,
    push_status: String,
    push_error: Option<String>,
    calls: Vec<Call>,
    holds: HashMap<Method, Arc<Notify>>,
}

/// An in-memory chain answering from scripted state and recording every call.
#[derive(Debug)]
pub struct MockChain {
    state: Mutex<State>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Creates a chain with no accounts, answering `get_info` with [`fixtures::chain_info`] and
    /// executing every pushed transaction.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                accounts: HashMap::new(),
                v2_accounts: HashMap::new(),
                rows: Vec::new(),
                table_error: None,
                abis: HashMap::new(),
                info: fixtures::chain_info(),
                push_status: "executed".to_string(),
                push_error: None,
                calls: Vec::new(),
                holds: HashMap::new(),
            }),
        }
    }

    /// Makes `name` resolvable through `get_account`.
    pub fn add_account(&self, name: &str) {
        let account = fixtures::account(name);
        self.state.lock().accounts.insert(account.account_name, account);
    }

    /// Makes `name` resolvable through the history API only.
    pub fn add_v2_account(&self, name: &str) {
        let account = fixtures::account(name);
        self.state.lock().v2_accounts.insert(account.account_name, account);
    }

    /// Sets the ABI of `account`.
    pub fn add_abi(&self, account: &str, abi: AbiDef) {
        self.state.lock().abis.insert(Name::new(account), abi);
    }

    /// Adds a table row found by index key `key`.
    pub fn add_row(&self, key: &str, row: Value) {
        self.state.lock().rows.push((key.to_string(), row));
    }

    /// Removes every table row.
    pub fn clear_rows(&self) {
        self.state.lock().rows.clear();
    }

    /// Makes `get_table_rows` fail with `message`, or succeed again with `None`.
    pub fn fail_table_rows(&self, message: Option<&str>) {
        self.state.lock().table_error = message.map(str::to_string);
    }

    /// Sets the receipt status of pushed transactions.
    pub fn set_push_status(&self, status: &str) {
        self.state.lock().push_status = status.to_string();
    }

    /// Makes `push_transaction` fail with `message`, or succeed again with `None`.
    pub fn fail_push(&self, message: Option<&str>) {
        self.state.lock().push_error = message.map(str::to_string);
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Returns the number of calls matching `f`.
    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| f(call)).count()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Returns every transaction pushed so far.
    pub fn pushed(&self) -> Vec<PackedTransaction> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::PushTransaction(trx) => Some(trx.clone()),
                _ => None,
            })
            .collect()
    }

    /// Holds every later call of `method` open after it is recorded. Each `notify_one` on the
    /// returned handle lets one held call proceed.
    pub fn hold(&self, method: Method) -> Arc<Notify> {
        self.state.lock().holds.entry(method).or_default().clone()
    }

    /// Stops holding new calls of `method`. Calls already held keep waiting on their handle.
    pub fn unhold(&self, method: Method) {
        self.state.lock().holds.remove(&method);
    }

    /// Waits until at least `n` calls of `method` were recorded.
    pub async fn wait_for_calls(&self, method: Method, n: usize) {
        while self.count(|call| call.method() == method) < n {
            tokio::task::yield_now().await;
        }
    }

    async fn record(&self, call: Call) {
        trace!(?call, "mock chain call");
        let hold = {
            let mut state = self.state.lock();
            let hold = state.holds.get(&call.method()).cloned();
            state.calls.push(call);
            hold
        };
        if let Some(hold) = hold {
            hold.notified().await;
        }
    }
}

fn api_error(name: &str, detail: impl Into<String>) -> ChainError {
    ChainError::Api { code: 500, name: name.to_string(), details: vec![detail.into()] }
}

#[async_trait]
impl ChainApi for MockChain {
    async fn get_account(&self, account: Name) -> Result<AccountObject, ChainError> {
        self.record(Call::GetAccount(account)).await;
        self.state.lock().accounts.get(&account).cloned().ok_or_else(|| {
            api_error("account_query_exception", format!("Error: unknown key (name): {account}"))
        })
    }

    async fn get_account_v2(&self, account: Name) -> Result<V2AccountResponse, ChainError> {
        self.record(Call::GetAccountV2(account)).await;
        let state = self.state.lock();
        let account = state
            .v2_accounts
            .get(&account)
            .or_else(|| state.accounts.get(&account))
            .cloned()
            .ok_or_else(|| api_error("Not Found", "Account not found!"))?;
        Ok(V2AccountResponse { account, tokens: vec![], links: vec![] })
    }

    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> Result<GetTableRowsResponse, ChainError> {
        self.record(Call::GetTableRows(params.clone())).await;
        let state = self.state.lock();
        if let Some(message) = &state.table_error {
            return Err(api_error("contract_table_query_exception", message.clone()));
        }
        let rows = state
            .rows
            .iter()
            .filter(|(key, _)| params.lower_bound.as_ref().is_none_or(|bound| bound == key))
            .map(|(_, row)| row.clone())
            .take(params.limit as usize)
            .collect();
        Ok(GetTableRowsResponse { rows, more: false, next_key: None })
    }

    async fn get_info(&self) -> Result<GetInfoResponse, ChainError> {
        self.record(Call::GetInfo).await;
        Ok(self.state.lock().info.clone())
    }

    async fn get_abi(&self, account: Name) -> Result<GetAbiResponse, ChainError> {
        self.record(Call::GetAbi(account)).await;
        let abi = self.state.lock().abis.get(&account).cloned();
        Ok(GetAbiResponse { account_name: account, abi })
    }

    async fn push_transaction(
        &self,
        trx: &PackedTransaction,
    ) -> Result<PushTransactionResponse, ChainError> {
        self.record(Call::PushTransaction(trx.clone())).await;
        let state = self.state.lock();
        if let Some(message) = &state.push_error {
            return Err(api_error("eosio_assert_message_exception", message.clone()));
        }
        let id = trx.transaction().map(|t| t.id().to_string()).unwrap_or_default();
        Ok(PushTransactionResponse {
            transaction_id: id.clone(),
            processed: ProcessedTransaction {
                id,
                block_num: state.info.head_block_num + 1,
                receipt: Some(TransactionReceipt {
                    status: state.push_status.clone(),
                    cpu_usage_us: 100,
                    net_usage_words: 16,
                }),
                except: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirelink_chain::types::IndexPosition;

    fn params(bound: &str) -> GetTableRowsParams {
        GetTableRowsParams {
            code: Name::new("auth.msg"),
            scope: "auth.msg".into(),
            table: Name::new("links"),
            json: true,
            index_position: IndexPosition::Secondary,
            key_type: Some("name".into()),
            lower_bound: Some(bound.into()),
            upper_bound: Some(bound.into()),
            limit: 50,
            reverse: false,
        }
    }

    #[tokio::test]
    async fn scripted_accounts_and_rows() {
        let chain = MockChain::new();
        chain.add_account("alice");
        chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_x", fixtures::ALICE_ADDRESS));

        assert_eq!(chain.get_account(Name::new("alice")).await.unwrap().account_name, Name::new("alice"));
        assert!(chain.get_account(Name::new("bob")).await.is_err());
        assert_eq!(chain.get_table_rows(&params("alice")).await.unwrap().rows.len(), 1);
        assert!(chain.get_table_rows(&params("bob")).await.unwrap().rows.is_empty());

        chain.fail_table_rows(Some("Error: boom"));
        assert!(chain.get_table_rows(&params("alice")).await.is_err());
        assert_eq!(chain.count(|c| matches!(c, Call::GetTableRows(_))), 3);
    }

    #[tokio::test]
    async fn held_calls_wait_for_release() {
        let chain = MockChain::new();
        chain.add_account("alice");
        let gate = chain.hold(Method::GetAccount);

        let (account, ()) = tokio::join!(chain.get_account(Name::new("alice")), async {
            chain.wait_for_calls(Method::GetAccount, 1).await;
            chain.unhold(Method::GetAccount);
            // New calls pass while the first one is still held.
            assert!(chain.get_account(Name::new("bob")).await.is_err());
            gate.notify_one();
        });
        assert_eq!(account.unwrap().account_name, Name::new("alice"));
        assert_eq!(chain.count(|c| c.method() == Method::GetAccount), 2);
    }
}
