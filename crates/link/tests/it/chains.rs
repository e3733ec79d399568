use crate::utils::config;
use std::sync::Arc;
use wirelink::{ChainConfig, ChainRegistry, Identity, SelectedChain, WireLink};
use wirelink_chain::ChainApi;
use wirelink_common::{KeyValueStore, MemoryStore};
use wirelink_primitives::Name;
use wirelink_test_utils::{fixtures, init_tracing, Call, MockChain, ALICE_ADDRESS, ALICE_KEY};
use wirelink_wallets::{LocalWalletProvider, WalletProvider};

const TESTNET: &str = "065dcca2dc758af25bcf3b878260a19dd1b81e4597f2af15a262a0c67f1e0106";

fn mock(namespace: &str) -> Arc<MockChain> {
    let chain = Arc::new(MockChain::new());
    chain.add_abi("auth.msg", fixtures::auth_msg_abi());
    chain.add_abi(namespace, fixtures::system_abi());
    chain
}

#[tokio::test]
async fn session_follows_selected_chain() {
    init_tracing();
    let mut chains = ChainConfig::defaults();
    chains[1].namespace = "wire".to_string();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let registry = Arc::new(ChainRegistry::with_chains(store.clone(), chains));

    let local = mock("sysio");
    let testnet = mock("wire");
    let router = {
        let (local, testnet) = (local.clone(), testnet.clone());
        SelectedChain::new(registry.clone(), move |chain| {
            let api = match chain.endpoint.as_str() {
                "https://testnet-00.wire.foundation" => testnet.clone(),
                _ => local.clone(),
            };
            api as Arc<dyn ChainApi>
        })
    };
    let provider = Arc::new(LocalWalletProvider::from_private_keys(&[ALICE_KEY], 1).unwrap());
    let link = WireLink::with_chains(
        config(),
        Arc::new(router),
        Some(provider as Arc<dyn WalletProvider>),
        store,
        registry.clone(),
    );
    link.connect().await.unwrap();
    link.select_account(ALICE_ADDRESS).unwrap();

    link.sync().await;
    assert!(!local.calls().is_empty());
    assert!(testnet.calls().is_empty());
    local.clear_calls();

    registry.select_chain(TESTNET).unwrap();
    let alice = Identity::new("alice");
    testnet.add_account("alice");
    link.resolve_account("alice").await.unwrap();
    link.protocol().create_link(&alice).await.unwrap();
    testnet.add_row("alice", fixtures::link_row("alice", "PUB_EM_alice", ALICE_ADDRESS));
    link.protocol().authorize_link(&alice).await.unwrap();

    assert!(local.calls().is_empty(), "{:?}", local.calls());
    assert!(testnet.count(|c| matches!(c, Call::GetAccount(_))) >= 1);

    let pushed = testnet.pushed();
    assert_eq!(pushed.len(), 2);
    let linkauth = pushed[1].transaction().unwrap();
    assert!(!linkauth.actions.is_empty());
    for action in &linkauth.actions {
        assert_eq!(action.account, Name::new("wire"));
        assert_eq!(action.name, Name::new("linkauth"));
    }
}
