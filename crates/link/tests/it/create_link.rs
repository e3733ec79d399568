use crate::utils::connected;
use alloy_primitives::{hex, Address, B256};
use wirelink::{link_message_hash, Identity, LinkError, LinkStep};
use wirelink_chain::{Abi, PermissionLevel};
use wirelink_primitives::{compress_public_key, Name, WireSignature};
use wirelink_test_utils::{fixtures, Call, ALICE_ADDRESS};

#[tokio::test]
async fn createlink_signs_the_link_hash() {
    let h = connected().await;
    let alice = Identity::new("alice");

    let response = h.link.protocol().create_link(&alice).await.unwrap();
    assert!(response.is_executed());
    assert_eq!(h.link.protocol().step(), LinkStep::LinkCreated);

    let pushed = h.chain.pushed();
    assert_eq!(pushed.len(), 1);
    let trx = pushed[0].transaction().unwrap();
    assert_eq!(trx.actions.len(), 1);
    let action = &trx.actions[0];
    assert_eq!(action.account, Name::new("auth.msg"));
    assert_eq!(action.name, Name::new("createlink"));
    similar_asserts::assert_eq!(
        action.authorization,
        vec![PermissionLevel::new(Name::new("alice"), Name::new("active"))]
    );

    let data = Abi::from(fixtures::auth_msg_abi())
        .decode_action_data(Name::new("createlink"), &action.data)
        .unwrap();
    assert_eq!(data["account_name"], "alice");
    let nonce = data["nonce"].as_u64().unwrap();
    let msg_hash = B256::from_slice(&hex::decode(data["msg_hash"].as_str().unwrap()).unwrap());

    // The key was recovered through the wallet and cached for the address.
    let key = h.link.keys().cached().unwrap();
    let compressed = compress_public_key(&key).unwrap();
    assert_eq!(msg_hash, link_message_hash(&compressed, nonce, &alice));

    let sig: WireSignature = data["sig"].as_str().unwrap().parse().unwrap();
    assert!(sig.to_string().starts_with("SIG_K1_"));
    let signer = sig.to_wallet().unwrap().recover_address_from_msg(msg_hash.as_slice()).unwrap();
    assert_eq!(signer, ALICE_ADDRESS.parse::<Address>().unwrap());
}

#[tokio::test]
async fn transaction_signature_recovers_to_wallet() {
    let h = connected().await;
    h.link.protocol().create_link(&Identity::new("alice")).await.unwrap();

    let pushed = h.chain.pushed();
    let packed = &pushed[0];
    assert_eq!(packed.signatures.len(), 1);
    assert!(packed.signatures[0].to_string().starts_with("SIG_EM_"));

    let chain_id = fixtures::chain_info().chain_id;
    let digest = packed.transaction().unwrap().signing_digest(&chain_id);
    let signer = packed.signatures[0]
        .to_wallet()
        .unwrap()
        .recover_address_from_msg(digest.as_slice())
        .unwrap();
    assert_eq!(signer, ALICE_ADDRESS.parse::<Address>().unwrap());
}

#[tokio::test]
async fn retries_reuse_key_and_abi() {
    let h = connected().await;
    let alice = Identity::new("alice");
    let key = h.link.public_key().await.unwrap();

    h.chain.fail_push(Some("deadline exceeded"));
    h.link.protocol().create_link(&alice).await.unwrap_err();
    h.chain.fail_push(None);
    h.link.protocol().create_link(&alice).await.unwrap();

    assert_eq!(h.link.keys().cached(), Some(key));
    assert_eq!(h.link.keys().cache().len(), 1);
    assert_eq!(h.chain.count(|c| matches!(c, Call::GetAbi(_))), 2);

    assert_eq!(h.chain.pushed().len(), 2);
}

#[tokio::test]
async fn rejected_transaction_keeps_step() {
    let h = connected().await;
    h.chain.set_push_status("soft_fail");

    let err = h.link.protocol().create_link(&Identity::new("alice")).await.unwrap_err();
    let LinkError::TransactionFailed(message) = &err else { panic!("unexpected error: {err:?}") };
    assert!(message.contains("soft_fail"), "{message}");
    assert_eq!(h.link.protocol().step(), LinkStep::NotStarted);
}

#[tokio::test]
async fn node_error_is_flattened() {
    let h = connected().await;
    h.chain.fail_push(Some("Error: assertion failure with message: link already exists"));

    let err = h.link.protocol().create_link(&Identity::new("alice")).await.unwrap_err();
    assert_eq!(err.message(), "assertion failure with message: link already exists");
    assert_eq!(h.link.protocol().step(), LinkStep::NotStarted);
}

#[tokio::test]
async fn wallet_rejection_surfaces() {
    let h = connected().await;
    h.link.public_key().await.unwrap();
    h.provider.set_rejecting(true);

    let err = h.link.protocol().create_link(&Identity::new("alice")).await.unwrap_err();
    assert!(matches!(err, LinkError::Wallet(_)), "{err:?}");
    assert!(h.chain.pushed().is_empty());
}
