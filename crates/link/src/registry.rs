//! Lookup of link records.

use crate::{AccountResolver, LinkError};
use alloy_primitives::hex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use wirelink_chain::{
    types::{GetTableRowsParams, IndexPosition},
    ChainApi, ChainError,
};
use wirelink_common::{GenerationGuard, Observable};
use wirelink_config::LinkConfig;
use wirelink_primitives::{Identity, Name};

/// A row of the links table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Primary key.
    #[serde(rename = "key", default)]
    pub primary_key: u64,
    /// Linked account.
    #[serde(rename = "account_name")]
    pub identity: Identity,
    /// Public key the link grants authority to.
    pub pub_key: String,
    /// Address of the linked wallet.
    #[serde(rename = "eth_address", default, deserialize_with = "deserialize_address_bytes")]
    pub address_bytes: Vec<u8>,
    /// Address of the linked wallet, if the contract stores it as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Compressed form of [`Self::pub_key`].
    #[serde(rename = "comp_key", default)]
    pub compressed_key: String,
}

/// Address bytes come back either as a byte array or as hex.
fn deserialize_address_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bytes(Vec<u8>),
        Hex(String),
    }
    match Repr::deserialize(deserializer)? {
        Repr::Bytes(bytes) => Ok(bytes),
        Repr::Hex(s) => hex::decode(s).map_err(serde::de::Error::custom),
    }
}

/// Publishes whether the current identity has a link.
#[derive(Debug)]
pub struct LinkRegistry {
    chain: Arc<dyn ChainApi>,
    accounts: Arc<AccountResolver>,
    contract: Name,
    table: Name,
    page_size: u32,
    link: Observable<Option<LinkRecord>>,
    exists: Observable<bool>,
    generation: GenerationGuard,
}

impl LinkRegistry {
    /// Creates a registry reading the links table named by `config`.
    pub fn new(chain: Arc<dyn ChainApi>, accounts: Arc<AccountResolver>, config: &LinkConfig) -> Self {
        Self {
            chain,
            accounts,
            contract: config.link_contract,
            table: config.links_table,
            page_size: config.link_page_size,
            link: Observable::new(None),
            exists: Observable::new(false),
            generation: GenerationGuard::new(),
        }
    }

    fn params(&self, identity: &Identity) -> GetTableRowsParams {
        let bound = identity.as_str().to_ascii_lowercase();
        GetTableRowsParams {
            code: self.contract,
            scope: self.contract.to_string(),
            table: self.table,
            json: true,
            index_position: IndexPosition::Secondary,
            key_type: Some("name".to_string()),
            lower_bound: Some(bound.clone()),
            upper_bound: Some(bound),
            limit: self.page_size,
            reverse: false,
        }
    }

    async fn query(&self, identity: &Identity) -> Result<Option<LinkRecord>, ChainError> {
        let response = self.chain.get_table_rows(&self.params(identity)).await?;
        trace!(%identity, rows = response.rows.len(), "link rows");
        match response.rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Refreshes the link state of `identity`.
    ///
    /// Raw addresses are never queried and count as unlinked. Query failures are logged and
    /// clear the state.
    pub async fn check_link_status(&self, identity: &Identity) {
        let generation = self.generation.next();
        if identity.as_str().is_empty() || identity.is_address() {
            debug!(%identity, "not a resolved identity, skipping link check");
            self.publish(None);
            return;
        }

        let result = self.query(identity).await;
        if !self.generation.is_current(generation) {
            debug!(%identity, "dropping superseded link check");
            return;
        }
        match result {
            Ok(record) => {
                debug!(%identity, exists = record.is_some(), "link checked");
                self.publish(record);
            }
            Err(err) => {
                warn!(%identity, err = %err.message(), "link check failed");
                self.publish(None);
            }
        }
    }

    /// Looks up the link of `identity`, or of the current account if `None`.
    ///
    /// Unlike [`Self::check_link_status`], failures are returned. The link state is published
    /// either way.
    pub async fn check_link(&self, identity: Option<&Identity>) -> Result<LinkRecord, LinkError> {
        let identity = match identity {
            Some(identity) => identity.clone(),
            None => self.accounts.identity().ok_or(LinkError::NoIdentity)?,
        };
        let generation = self.generation.next();
        if identity.is_address() {
            self.publish(None);
            return Err(LinkError::LinkNotFound(identity.to_string()));
        }

        let result = self.query(&identity).await;
        let current = self.generation.is_current(generation);
        match result {
            Ok(Some(record)) => {
                if current {
                    self.publish(Some(record.clone()));
                }
                Ok(record)
            }
            Ok(None) => {
                if current {
                    self.publish(None);
                }
                Err(LinkError::LinkNotFound(identity.to_string()))
            }
            Err(err) => {
                if current {
                    self.publish(None);
                }
                Err(err.into())
            }
        }
    }

    /// Forgets the link state and cancels pending checks.
    pub fn clear(&self) {
        self.generation.next();
        self.publish(None);
    }

    fn publish(&self, record: Option<LinkRecord>) {
        self.exists.set_if_changed(record.is_some());
        self.link.set_if_changed(record);
    }

    /// Returns `true` if the last check found a link.
    pub fn link_exists(&self) -> bool {
        self.exists.get()
    }

    /// Returns the link found by the last check.
    pub fn current_link(&self) -> Option<LinkRecord> {
        self.link.get()
    }

    /// Returns `true` if the current link belongs to `identity`.
    pub fn has_link_for(&self, identity: &Identity) -> bool {
        self.link.with(|link| link.as_ref().is_some_and(|l| l.identity == *identity))
    }

    /// Subscribes to the current link.
    pub fn subscribe(&self) -> watch::Receiver<Option<LinkRecord>> {
        self.link.subscribe()
    }

    /// Subscribes to the link-exists flag.
    pub fn subscribe_exists(&self) -> watch::Receiver<bool> {
        self.exists.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirelink_test_utils::{fixtures, Call, Method, MockChain, ALICE_ADDRESS, BOB_ADDRESS};

    fn registry() -> (Arc<MockChain>, LinkRegistry) {
        let chain = Arc::new(MockChain::new());
        let accounts = Arc::new(AccountResolver::new(chain.clone()));
        let registry = LinkRegistry::new(chain.clone(), accounts, &LinkConfig::default());
        (chain, registry)
    }

    #[test]
    fn decodes_rows() {
        let record: LinkRecord =
            serde_json::from_value(fixtures::link_row("alice", "PUB_EM_x", ALICE_ADDRESS)).unwrap();
        assert_eq!(record.identity, "alice");
        assert_eq!(record.address_bytes.len(), 20);

        let record: LinkRecord = serde_json::from_value(serde_json::json!({
            "key": 7,
            "account_name": "bob",
            "pub_key": "PUB_EM_y",
            "eth_address": [1, 2, 3],
            "comp_key": "02ab"
        }))
        .unwrap();
        assert_eq!(record.primary_key, 7);
        assert_eq!(record.address_bytes, vec![1, 2, 3]);
        assert_eq!(record.compressed_key, "02ab");
    }

    #[tokio::test]
    async fn queries_secondary_index() {
        let (chain, registry) = registry();
        registry.check_link_status(&Identity::new("alice")).await;
        let calls = chain.calls();
        let [Call::GetTableRows(params)] = calls.as_slice() else {
            panic!("expected one table query");
        };
        assert_eq!(params.index_position, IndexPosition::Secondary);
        assert_eq!(params.key_type.as_deref(), Some("name"));
        assert_eq!(params.lower_bound.as_deref(), Some("alice"));
        assert_eq!(params.upper_bound.as_deref(), Some("alice"));
        assert_eq!(params.limit, 50);
        assert_eq!(params.code, Name::new("auth.msg"));
        assert_eq!(params.table, Name::new("links"));
    }

    #[tokio::test]
    async fn failures_clear_state() {
        let (chain, registry) = registry();
        chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_x", ALICE_ADDRESS));
        registry.check_link_status(&Identity::new("alice")).await;
        assert!(registry.link_exists());

        chain.fail_table_rows(Some("Error: table query failed"));
        registry.check_link_status(&Identity::new("alice")).await;
        assert!(!registry.link_exists());
        assert_eq!(registry.current_link(), None);

        let err = registry.check_link(Some(&Identity::new("alice"))).await.unwrap_err();
        assert_eq!(err.message(), "table query failed");
    }

    #[tokio::test]
    async fn imperative_lookup() {
        let (chain, registry) = registry();
        assert!(matches!(registry.check_link(None).await, Err(LinkError::NoIdentity)));

        let err = registry.check_link(Some(&Identity::new("bob"))).await.unwrap_err();
        assert!(matches!(err, LinkError::LinkNotFound(ref id) if id == "bob"));

        chain.add_row("bob", fixtures::link_row("bob", "PUB_EM_y", ALICE_ADDRESS));
        let record = registry.check_link(Some(&Identity::new("BOB"))).await.unwrap();
        assert_eq!(record.identity, "bob");
        assert!(registry.has_link_for(&Identity::new("bob")));
    }

    #[tokio::test]
    async fn late_check_is_dropped() {
        let (chain, registry) = registry();
        chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_x", ALICE_ADDRESS));
        chain.add_row("bob", fixtures::link_row("bob", "PUB_EM_y", BOB_ADDRESS));
        let gate = chain.hold(Method::GetTableRows);

        let alice = Identity::new("alice");
        tokio::join!(registry.check_link_status(&alice), async {
            chain.wait_for_calls(Method::GetTableRows, 1).await;
            chain.unhold(Method::GetTableRows);
            registry.check_link_status(&Identity::new("bob")).await;
            gate.notify_one();
        });
        assert_eq!(registry.current_link().unwrap().identity, "bob");
    }

    #[tokio::test]
    async fn clear_cancels_pending_check() {
        let (chain, registry) = registry();
        chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_x", ALICE_ADDRESS));
        let gate = chain.hold(Method::GetTableRows);

        let alice = Identity::new("alice");
        tokio::join!(registry.check_link_status(&alice), async {
            chain.wait_for_calls(Method::GetTableRows, 1).await;
            registry.clear();
            gate.notify_one();
        });
        assert!(!registry.link_exists());
        assert_eq!(registry.current_link(), None);
    }
}
