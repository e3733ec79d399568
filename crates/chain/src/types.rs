//! Request and response types of the chain RPC API.

use crate::{abi::AbiDef, transaction::TransactionHeader, ChainError};
use alloy_primitives::{hex, B256};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{fmt, str::FromStr};
use wirelink_primitives::{Name, WireSignature};

/// Format of block timestamps returned by the node.
const BLOCK_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A 32-byte digest, serialized as hex without prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Checksum256(pub B256);

impl Checksum256 {
    /// Returns the digest bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<B256> for Checksum256 {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Checksum256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

impl Serialize for Checksum256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Response of `get_info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    /// Version of the node software.
    #[serde(default)]
    pub server_version: String,
    /// Chain id, mixed into every signing digest.
    pub chain_id: Checksum256,
    /// Head block number.
    pub head_block_num: u32,
    /// Last irreversible block number.
    pub last_irreversible_block_num: u32,
    /// Last irreversible block id.
    pub last_irreversible_block_id: Checksum256,
    /// Head block id.
    pub head_block_id: Checksum256,
    /// Head block timestamp, UTC, without zone suffix.
    pub head_block_time: String,
    /// Head block producer.
    #[serde(default)]
    pub head_block_producer: Option<Name>,
}

impl GetInfoResponse {
    /// Returns the head block time in seconds since the epoch.
    pub fn head_block_timestamp(&self) -> Result<i64, ChainError> {
        NaiveDateTime::parse_from_str(&self.head_block_time, BLOCK_TIME_FORMAT)
            .map(|time| time.and_utc().timestamp())
            .map_err(|e| {
                ChainError::InvalidResponse(format!(
                    "invalid head_block_time `{}`: {e}",
                    self.head_block_time
                ))
            })
    }

    /// Builds a transaction header referencing the last irreversible block, expiring
    /// `expire_seconds` after the head block.
    pub fn transaction_header(&self, expire_seconds: u32) -> Result<TransactionHeader, ChainError> {
        let expiration = self.head_block_timestamp()? + i64::from(expire_seconds);
        let expiration = u32::try_from(expiration)
            .map_err(|_| ChainError::InvalidResponse(format!("expiration {expiration} overflows")))?;
        let id = self.last_irreversible_block_id.as_slice();
        Ok(TransactionHeader {
            expiration,
            ref_block_num: (self.last_irreversible_block_num & 0xffff) as u16,
            ref_block_prefix: u32::from_le_bytes([id[8], id[9], id[10], id[11]]),
            ..Default::default()
        })
    }
}

/// A permission level: `actor@permission`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    /// Authorizing account.
    pub actor: Name,
    /// Permission of the account.
    pub permission: Name,
}

impl PermissionLevel {
    /// Creates a permission level.
    pub const fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

/// A weighted key of an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    /// Public key, in the chain's text encoding.
    pub key: String,
    /// Weight.
    pub weight: u16,
}

/// A weighted account permission of an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
    /// Permission level.
    pub permission: PermissionLevel,
    /// Weight.
    pub weight: u16,
}

/// A weighted delay of an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitWeight {
    /// Delay in seconds.
    pub wait_sec: u32,
    /// Weight.
    pub weight: u16,
}

/// Threshold authority of a permission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    /// Weight required to satisfy the authority.
    pub threshold: u32,
    /// Keys.
    #[serde(default)]
    pub keys: Vec<KeyWeight>,
    /// Account permissions.
    #[serde(default)]
    pub accounts: Vec<PermissionLevelWeight>,
    /// Delays.
    #[serde(default)]
    pub waits: Vec<WaitWeight>,
}

/// A named permission of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission name.
    pub perm_name: Name,
    /// Parent permission, empty for `owner`.
    pub parent: Name,
    /// Authority required by the permission.
    pub required_auth: Authority,
}

/// An account as returned by `v1/chain/get_account`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountObject {
    /// Account name.
    pub account_name: Name,
    /// Creation time.
    #[serde(default)]
    pub created: String,
    /// RAM quota in bytes, `-1` if unlimited.
    #[serde(default)]
    pub ram_quota: i64,
    /// RAM used in bytes.
    #[serde(default)]
    pub ram_usage: i64,
    /// Permissions of the account.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Response of `v2/state/get_account`: the account wrapped with indexed extras.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct V2AccountResponse {
    /// The account.
    pub account: AccountObject,
    /// Token balances.
    #[serde(default)]
    pub tokens: Vec<Value>,
    /// Permission links.
    #[serde(default)]
    pub links: Vec<Value>,
}

/// Index of a table used by a range query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPosition {
    /// The primary key.
    #[default]
    Primary,
    /// First secondary index.
    Secondary,
    /// Second secondary index.
    Tertiary,
    /// Third secondary index.
    Fourth,
    /// Fourth secondary index.
    Fifth,
    /// Fifth secondary index.
    Sixth,
    /// Sixth secondary index.
    Seventh,
    /// Seventh secondary index.
    Eighth,
    /// Eighth secondary index.
    Ninth,
    /// Ninth secondary index.
    Tenth,
}

/// Parameters of `get_table_rows`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTableRowsParams {
    /// Contract owning the table.
    pub code: Name,
    /// Table scope.
    pub scope: String,
    /// Table name.
    pub table: Name,
    /// Whether rows are decoded to JSON.
    pub json: bool,
    /// Index used for the range.
    pub index_position: IndexPosition,
    /// Key type of the index, e.g. `name` or `i64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    /// Maximum number of rows.
    pub limit: u32,
    /// Whether rows are returned in descending key order.
    #[serde(default)]
    pub reverse: bool,
}

/// Response of `get_table_rows`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTableRowsResponse {
    /// Rows in index order.
    pub rows: Vec<Value>,
    /// Whether more rows are in range.
    #[serde(default)]
    pub more: bool,
    /// Lower bound of the next page.
    #[serde(default)]
    pub next_key: Option<String>,
}

/// Response of `get_abi`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetAbiResponse {
    /// Contract account.
    pub account_name: Name,
    /// ABI of the contract, absent if none is set.
    #[serde(default)]
    pub abi: Option<AbiDef>,
}

/// A signed transaction as accepted by `push_transaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedTransaction {
    /// Signatures over the signing digest.
    pub signatures: Vec<WireSignature>,
    /// Compression of `packed_trx`; always `0`.
    pub compression: u8,
    /// Packed context-free data, hex.
    pub packed_context_free_data: String,
    /// Packed transaction, hex.
    pub packed_trx: String,
}

/// Receipt of an applied transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// `executed`, `soft_fail`, `hard_fail`, `delayed` or `expired`.
    pub status: String,
    /// Billed CPU.
    #[serde(default)]
    pub cpu_usage_us: u32,
    /// Billed NET.
    #[serde(default)]
    pub net_usage_words: u32,
}

/// Trace of a pushed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    /// Transaction id.
    pub id: String,
    /// Block the transaction was included in.
    pub block_num: u32,
    /// Receipt, absent if the transaction was not applied.
    #[serde(default)]
    pub receipt: Option<TransactionReceipt>,
    /// Exception raised while applying the transaction.
    #[serde(default)]
    pub except: Option<Value>,
}

/// Response of `push_transaction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionResponse {
    /// Transaction id.
    pub transaction_id: String,
    /// Trace of the transaction.
    pub processed: ProcessedTransaction,
}

impl PushTransactionResponse {
    /// Returns the receipt status, if any.
    pub fn status(&self) -> Option<&str> {
        self.processed.receipt.as_ref().map(|r| r.status.as_str())
    }

    /// Returns `true` if the transaction was executed.
    pub fn is_executed(&self) -> bool {
        self.status() == Some("executed")
    }
}

/// One detail of a node error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Message.
    pub message: String,
    /// Source file.
    #[serde(default)]
    pub file: String,
    /// Source line.
    #[serde(default)]
    pub line_number: u32,
    /// Source method.
    #[serde(default)]
    pub method: String,
}

/// Structured error of a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code.
    pub code: i64,
    /// Error name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub what: String,
    /// Details, most relevant first.
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

/// Error bodies returned by the node and by the history API.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorResponse {
    /// `v1` node error.
    Node {
        /// HTTP status.
        code: u16,
        /// HTTP reason.
        message: String,
        /// Structured error.
        error: ErrorInfo,
    },
    /// `v2` history error.
    History {
        /// HTTP status.
        #[serde(rename = "statusCode")]
        status_code: u16,
        /// HTTP reason.
        #[serde(default)]
        error: Option<String>,
        /// Message.
        #[serde(default)]
        message: Option<String>,
    },
}

impl From<ApiErrorResponse> for ChainError {
    fn from(err: ApiErrorResponse) -> Self {
        match err {
            ApiErrorResponse::Node { error, .. } => {
                let details = error.details.into_iter().map(|d| d.message).collect::<Vec<_>>();
                let details = if details.is_empty() && !error.what.is_empty() {
                    vec![error.what]
                } else {
                    details
                };
                Self::Api { code: error.code, name: error.name, details }
            }
            ApiErrorResponse::History { status_code, error, message } => Self::Api {
                code: i64::from(status_code),
                name: error.unwrap_or_else(|| format!("HTTP {status_code}")),
                details: message.into_iter().collect(),
            },
        }
    }
}
