use crate::utils::connected;
use wirelink::derive_identity;
use wirelink_test_utils::{fixtures, Method, ALICE_ADDRESS, BOB_ADDRESS};

#[tokio::test]
async fn disconnect_drops_pending_sync() {
    let h = connected().await;
    let alice = derive_identity(ALICE_ADDRESS).unwrap();
    h.chain.add_account(alice.as_str());
    h.chain.add_row(alice.as_str(), fixtures::link_row(alice.as_str(), "PUB_EM_x", ALICE_ADDRESS));
    let gate = h.chain.hold(Method::GetAccount);

    tokio::join!(h.link.sync(), async {
        h.chain.wait_for_calls(Method::GetAccount, 1).await;
        h.link.disconnect();
        gate.notify_one();
    });

    assert!(h.link.accounts().has_no_account());
    assert_eq!(h.link.accounts().username(), None);
    assert!(!h.link.links().link_exists());
    assert_eq!(h.link.links().current_link(), None);
    assert_eq!(h.chain.count(|c| c.method() == Method::GetTableRows), 0);
}

#[tokio::test]
async fn newer_selection_wins_over_pending_sync() {
    let h = connected().await;
    let alice = derive_identity(ALICE_ADDRESS).unwrap();
    let bob = derive_identity(BOB_ADDRESS).unwrap();
    h.chain.add_account(alice.as_str());
    h.chain.add_account(bob.as_str());
    h.chain.add_row(alice.as_str(), fixtures::link_row(alice.as_str(), "PUB_EM_x", ALICE_ADDRESS));
    let gate = h.chain.hold(Method::GetAccount);

    tokio::join!(h.link.sync(), async {
        h.chain.wait_for_calls(Method::GetAccount, 1).await;
        h.chain.unhold(Method::GetAccount);
        h.link.select_account(BOB_ADDRESS).unwrap();
        h.link.sync().await;
        gate.notify_one();
    });

    assert_eq!(h.link.accounts().username().as_deref(), Some(bob.as_str()));
    assert!(!h.link.links().link_exists());
    assert_eq!(h.link.links().current_link(), None);
}
