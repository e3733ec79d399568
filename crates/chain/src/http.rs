use crate::{
    api::ChainApi,
    types::{
        AccountObject, ApiErrorResponse, GetAbiResponse, GetInfoResponse, GetTableRowsParams,
        GetTableRowsResponse, PackedTransaction, PushTransactionResponse, V2AccountResponse,
    },
    ChainError,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use wirelink_primitives::Name;

/// [`ChainApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChainApi {
    client: Client,
    endpoint: String,
    history_endpoint: String,
}

impl HttpChainApi {
    /// Creates a client for `endpoint`, which also serves the history API.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client: Client::new(), history_endpoint: endpoint.clone(), endpoint }
    }

    /// Serves the history API from `endpoint` instead.
    pub fn with_history_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.history_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Uses `client` for every request.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the RPC endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync + ?Sized),
    ) -> Result<T, ChainError> {
        let url = format!("{}/v1/chain/{path}", self.endpoint);
        trace!(target: "wirelink::chain", %url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        decode_response(status, &body)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ChainError> {
        trace!(target: "wirelink::chain", %url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        decode_response(status, &body)
    }
}

/// Decodes a response body, turning error statuses and error bodies into [`ChainError::Api`].
///
/// The history API reports some failures with a success status and a `statusCode` field.
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, ChainError> {
    debug!(target: "wirelink::chain", %status, bytes = body.len(), "received response");
    trace!(target: "wirelink::chain", body = %String::from_utf8_lossy(body), "response body");

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ChainError::Api {
                code: i64::from(status.as_u16()),
                name: status.canonical_reason().unwrap_or("HTTP error").to_string(),
                details: vec![String::from_utf8_lossy(body).into_owned()],
            });
        }
        Err(err) => return Err(err.into()),
    };

    let error_status = value.get("statusCode").and_then(Value::as_u64).is_some_and(|c| c >= 400);
    if !status.is_success() || error_status {
        return Err(match serde_json::from_value::<ApiErrorResponse>(value) {
            Ok(err) => err.into(),
            Err(_) => ChainError::Api {
                code: i64::from(status.as_u16()),
                name: status.canonical_reason().unwrap_or("HTTP error").to_string(),
                details: vec![],
            },
        });
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl ChainApi for HttpChainApi {
    async fn get_account(&self, account: Name) -> Result<AccountObject, ChainError> {
        self.post("get_account", &json!({ "account_name": account })).await
    }

    async fn get_account_v2(&self, account: Name) -> Result<V2AccountResponse, ChainError> {
        let url = format!("{}/v2/state/get_account?account={account}", self.history_endpoint);
        self.get(&url).await
    }

    async fn get_table_rows(
        &self,
        params: &GetTableRowsParams,
    ) -> Result<GetTableRowsResponse, ChainError> {
        self.post("get_table_rows", params).await
    }

    async fn get_info(&self) -> Result<GetInfoResponse, ChainError> {
        self.post("get_info", &json!({})).await
    }

    async fn get_abi(&self, account: Name) -> Result<GetAbiResponse, ChainError> {
        self.post("get_abi", &json!({ "account_name": account })).await
    }

    async fn push_transaction(
        &self,
        trx: &PackedTransaction,
    ) -> Result<PushTransactionResponse, ChainError> {
        self.post("push_transaction", trx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success() {
        let body = br#"{"account_name":"alice","ram_quota":-1}"#;
        let account: AccountObject = decode_response(StatusCode::OK, body).unwrap();
        assert_eq!(account.account_name, Name::new("alice"));
        assert_eq!(account.ram_quota, -1);
    }

    #[test]
    fn decodes_node_error_status() {
        let body = br#"{"code":500,"message":"Internal Service Error","error":{"code":0,"name":"exception","what":"unspecified","details":[{"message":"unknown key (boost::tuples::tuple<bool, eosio::chain::name, ...>): ","file":"http_plugin.cpp","line_number":1,"method":"handle_exception"}]}}"#;
        let err = decode_response::<AccountObject>(StatusCode::INTERNAL_SERVER_ERROR, body)
            .unwrap_err();
        assert!(err.message().starts_with("unknown key"), "{err}");
    }

    #[test]
    fn history_status_code_in_body_is_an_error() {
        let body = br#"{"statusCode":500,"error":"Internal Server Error","message":"Account not found"}"#;
        let err = decode_response::<V2AccountResponse>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ChainError::Api { code: 500, .. }));
        assert_eq!(err.message(), "Account not found");
    }

    #[test]
    fn non_json_error_keeps_body() {
        let err = decode_response::<AccountObject>(StatusCode::BAD_GATEWAY, b"upstream down")
            .unwrap_err();
        assert_eq!(err.message(), "upstream down");
    }

    #[test]
    fn malformed_success_is_a_decode_error() {
        let err = decode_response::<AccountObject>(StatusCode::OK, b"{}").unwrap_err();
        assert!(matches!(err, ChainError::Decode(_)));
    }

    #[test]
    fn trims_trailing_slash() {
        let api = HttpChainApi::new("https://testnet-00.wire.foundation/");
        assert_eq!(api.endpoint(), "https://testnet-00.wire.foundation");
    }
}
