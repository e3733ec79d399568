use crate::utils::connected;
use wirelink::{Identity, LinkError, LinkStep};
use wirelink_chain::Abi;
use wirelink_primitives::Name;
use wirelink_test_utils::{fixtures, Call, ALICE_ADDRESS};

#[tokio::test]
async fn fails_fast_before_createlink() {
    let h = connected().await;
    let err = h.link.protocol().authorize_link(&Identity::new("alice")).await.unwrap_err();
    assert!(matches!(err, LinkError::LinkNotCreated(_)), "{err:?}");
    assert_eq!(h.link.protocol().step(), LinkStep::NotStarted);
    assert!(h.chain.calls().is_empty());
}

#[tokio::test]
async fn created_link_is_bound_to_its_identity() {
    let h = connected().await;
    h.link.protocol().create_link(&Identity::new("alice")).await.unwrap();

    let err = h.link.protocol().authorize_link(&Identity::new("bob")).await.unwrap_err();
    assert!(matches!(err, LinkError::LinkNotCreated(_)), "{err:?}");
    assert_eq!(h.link.protocol().step(), LinkStep::LinkCreated);
}

#[tokio::test]
async fn grants_every_auth_action() {
    let h = connected().await;
    let alice = Identity::new("alice");
    h.link.protocol().create_link(&alice).await.unwrap();
    h.chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_alice", ALICE_ADDRESS));
    h.chain.clear_calls();

    let response = h.link.protocol().authorize_link(&alice).await.unwrap();
    assert!(response.is_executed());
    assert_eq!(h.link.protocol().step(), LinkStep::AuthorizationGranted);

    let pushed = h.chain.pushed();
    assert_eq!(pushed.len(), 1);
    let trx = pushed[0].transaction().unwrap();
    let abi = Abi::from(fixtures::system_abi());
    let types: Vec<String> = trx
        .actions
        .iter()
        .map(|action| {
            assert_eq!(action.account, Name::new("sysio"));
            assert_eq!(action.name, Name::new("linkauth"));
            let data = abi.decode_action_data(action.name, &action.data).unwrap();
            assert_eq!(data["account"], "alice");
            assert_eq!(data["code"], "settle.wns");
            assert_eq!(data["requirement"], "auth.ext");
            data["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types, ["initdeposit", "setpending", "canceldep", "utxoxfer", "withdraw"]);

    // The link state is refreshed afterwards.
    assert_eq!(h.chain.count(|c| matches!(c, Call::GetTableRows(_))), 1);
    assert!(h.link.links().link_exists());
}

#[tokio::test]
async fn observed_link_allows_authorization() {
    let h = connected().await;
    let alice = Identity::new("alice");
    h.chain.add_row("alice", fixtures::link_row("alice", "PUB_EM_alice", ALICE_ADDRESS));
    h.link.check_link_status(&alice).await;

    h.link.protocol().authorize_link(&alice).await.unwrap();
    assert_eq!(h.link.protocol().step(), LinkStep::AuthorizationGranted);
}

#[tokio::test]
async fn failed_authorization_keeps_step() {
    let h = connected().await;
    let alice = Identity::new("alice");
    h.link.protocol().create_link(&alice).await.unwrap();
    h.chain.fail_push(Some("Error: missing authority of alice"));

    let err = h.link.protocol().authorize_link(&alice).await.unwrap_err();
    assert_eq!(err.message(), "missing authority of alice");
    assert_eq!(h.link.protocol().step(), LinkStep::LinkCreated);

    h.link.disconnect();
    assert_eq!(h.link.protocol().step(), LinkStep::NotStarted);
}
