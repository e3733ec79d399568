use crate::utils::harness;
use alloy_primitives::Address;
use std::time::Duration;
use tokio::{sync::watch, time::timeout};
use wirelink::derive_identity;
use wirelink_test_utils::{fixtures, ALICE_ADDRESS, BOB_ADDRESS};
use wirelink_wallets::ConnectionPhase;

async fn wait_for<T>(rx: &mut watch::Receiver<T>, f: impl FnMut(&T) -> bool) {
    timeout(Duration::from_secs(5), rx.wait_for(f)).await.unwrap().unwrap();
}

#[tokio::test]
async fn selection_drives_account_and_link() {
    let h = harness();
    let alice = derive_identity(ALICE_ADDRESS).unwrap();
    h.chain.add_account(alice.as_str());
    h.chain.add_row(alice.as_str(), fixtures::link_row(alice.as_str(), "PUB_EM_x", ALICE_ADDRESS));

    let handle = h.link.spawn_event_listener();
    h.link.connect().await.unwrap();
    h.link.select_account(ALICE_ADDRESS).unwrap();

    let mut username = h.link.accounts().subscribe_username();
    wait_for(&mut username, |name| name.as_deref() == Some(alice.as_str())).await;
    let mut exists = h.link.links().subscribe_exists();
    wait_for(&mut exists, |exists| *exists).await;

    // Bob has no chain account.
    h.link.select_account(BOB_ADDRESS).unwrap();
    let mut no_account = h.link.accounts().subscribe_no_account();
    wait_for(&mut no_account, |none| *none).await;
    wait_for(&mut exists, |exists| !*exists).await;

    drop(handle);
}

#[tokio::test]
async fn wallet_events_update_connection() {
    let h = harness();
    let handle = h.link.spawn_event_listener();
    h.link.connect().await.unwrap();
    h.link.select_account(ALICE_ADDRESS).unwrap();
    let mut status = h.link.subscribe_connection();

    h.provider.set_chain_id(5);
    wait_for(&mut status, |s| s.connection().and_then(|c| c.chain_id) == Some(5)).await;
    assert_eq!(h.link.connection().address().as_deref(), Some(ALICE_ADDRESS));

    // The selected account is no longer exposed.
    h.provider.set_accounts(&[BOB_ADDRESS.parse::<Address>().unwrap()]);
    wait_for(&mut status, |s| {
        s.connection().is_some_and(|c| c.active_account.is_none() && c.available_accounts.len() == 1)
    })
    .await;

    h.provider.set_accounts(&[]);
    wait_for(&mut status, |s| s.phase() == ConnectionPhase::Disconnected).await;

    assert!(!handle.is_finished());
    drop(handle);
}
