use crate::utils::{config, harness};
use std::sync::Arc;
use wirelink::{derive_identity, WireLink};
use wirelink_common::NullStore;
use wirelink_test_utils::{MockChain, ALICE_ADDRESS, BOB_ADDRESS};
use wirelink_wallets::{ConnectionPhase, ConnectionStatus, WalletError};

#[tokio::test]
async fn select_first_of_two_accounts() {
    let h = harness();
    let connection = h.link.connect().await.unwrap();
    assert_eq!(connection.chain_id, Some(1));
    let addresses: Vec<_> =
        connection.available_accounts.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(addresses, [ALICE_ADDRESS, BOB_ADDRESS]);

    h.link.select_account(ALICE_ADDRESS).unwrap();
    let connection = h.link.connection().connection().unwrap();
    assert_eq!(connection.active_account.unwrap().address, ALICE_ADDRESS);
    assert_eq!(connection.available_accounts.len(), 2);
}

#[tokio::test]
async fn disconnect_twice() {
    let h = harness();
    h.link.connect().await.unwrap();
    h.link.select_account(BOB_ADDRESS).unwrap();

    h.link.disconnect();
    assert_eq!(h.link.connection().status(), ConnectionStatus::Disconnected);
    h.link.disconnect();
    assert_eq!(h.link.connection().status(), ConnectionStatus::Disconnected);
    assert!(h.link.accounts().has_no_account());
    assert!(!h.link.links().link_exists());
}

#[tokio::test]
async fn no_wallet_installed() {
    let link = WireLink::new(config(), Arc::new(MockChain::new()), None, Arc::new(NullStore));
    assert_eq!(link.connect().await, Err(WalletError::ProviderUnavailable));
    assert_eq!(link.connection().phase(), ConnectionPhase::Disconnected);
}

#[tokio::test]
async fn identity_derivation_is_offline() {
    let h = harness();
    let address = "0x0000000000000000000000000000000000000001";
    let first = derive_identity(address).unwrap();
    let second = derive_identity(address).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), second.as_str());
    assert!(first.to_name().is_ok());
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn sync_resolves_selected_address() {
    let h = harness();
    let identity = derive_identity(ALICE_ADDRESS).unwrap();
    h.chain.add_account(identity.as_str());
    h.link.connect().await.unwrap();
    h.link.select_account(ALICE_ADDRESS).unwrap();

    h.link.sync().await;
    assert_eq!(h.link.accounts().username().as_deref(), Some(identity.as_str()));
    assert_eq!(h.link.identity().unwrap(), identity);
    assert!(!h.link.links().link_exists());

    h.link.change_account();
    h.link.sync().await;
    assert!(h.link.accounts().has_no_account());
}
