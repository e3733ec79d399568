use crate::utils::{connected, harness};
use wirelink::{derive_identity, Identity, LinkError};
use wirelink_chain::types::IndexPosition;
use wirelink_test_utils::{fixtures, Call, ALICE_ADDRESS};

#[tokio::test]
async fn status_follows_table() {
    let h = harness();
    h.chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_alice", ALICE_ADDRESS));

    h.link.check_link_status(&Identity::new("alice")).await;
    assert!(h.link.links().link_exists());
    let record = h.link.links().current_link().unwrap();
    assert_eq!(record.identity, "alice");
    assert_eq!(record.pub_key, "PUB_EM_alice");
    assert_eq!(record.address_bytes.len(), 20);

    h.link.check_link_status(&Identity::new("bob")).await;
    assert!(!h.link.links().link_exists());
    assert!(h.link.links().current_link().is_none());
}

#[tokio::test]
async fn lookup_uses_secondary_index() {
    let h = harness();
    h.link.check_link_status(&Identity::new("Alice")).await;

    let calls = h.chain.calls();
    let [Call::GetTableRows(params)] = calls.as_slice() else { panic!("unexpected calls: {calls:?}") };
    assert_eq!(params.code.to_string(), "auth.msg");
    assert_eq!(params.table.to_string(), "links");
    assert_eq!(params.index_position, IndexPosition::Secondary);
    assert_eq!(params.key_type.as_deref(), Some("name"));
    assert_eq!(params.lower_bound.as_deref(), Some("alice"));
    assert_eq!(params.upper_bound.as_deref(), Some("alice"));
    assert_eq!(params.limit, 50);
}

#[tokio::test]
async fn raw_address_is_never_queried() {
    let h = harness();
    h.link.check_link_status(&Identity::new(ALICE_ADDRESS)).await;
    assert!(!h.link.links().link_exists());

    let err = h.link.check_link(Some(&Identity::new(ALICE_ADDRESS))).await.unwrap_err();
    assert!(matches!(err, LinkError::LinkNotFound(_)), "{err:?}");
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn query_failure_reads_as_unlinked() {
    let h = harness();
    h.chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_alice", ALICE_ADDRESS));
    h.link.check_link_status(&Identity::new("alice")).await;
    assert!(h.link.links().link_exists());

    h.chain.fail_table_rows(Some("Error: table query failed"));
    h.link.check_link_status(&Identity::new("alice")).await;
    assert!(!h.link.links().link_exists());

    let err = h.link.check_link(Some(&Identity::new("alice"))).await.unwrap_err();
    assert!(matches!(err, LinkError::Chain(_)), "{err:?}");
    assert_eq!(err.message(), "table query failed");
}

#[tokio::test]
async fn check_link_defaults_to_resolved_account() {
    let h = connected().await;
    assert!(matches!(h.link.check_link(None).await, Err(LinkError::NoIdentity)));

    let identity = derive_identity(ALICE_ADDRESS).unwrap();
    h.chain.add_account(identity.as_str());
    h.chain.add_row(identity.as_str(), fixtures::link_row(identity.as_str(), "PUB_EM_x", ALICE_ADDRESS));
    h.link.sync().await;
    assert!(h.link.links().link_exists());

    let record = h.link.check_link(None).await.unwrap();
    assert_eq!(record.identity, identity);
}
