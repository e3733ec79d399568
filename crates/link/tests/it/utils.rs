use std::sync::Arc;
use wirelink::{LinkConfig, WireLink};
use wirelink_common::{KeyValueStore, MemoryStore};
use wirelink_test_utils::{fixtures, init_tracing, MockChain, ALICE_ADDRESS, ALICE_KEY, BOB_KEY};
use wirelink_wallets::{LocalWalletProvider, WalletProvider};

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub provider: Arc<LocalWalletProvider>,
    pub link: WireLink,
}

pub fn config() -> LinkConfig {
    LinkConfig { storage_dir: None, ..Default::default() }
}

/// A session over a mock chain with the link and system ABIs, and a wallet holding alice and bob.
pub fn harness() -> Harness {
    init_tracing();
    let chain = Arc::new(MockChain::new());
    chain.add_abi("auth.msg", fixtures::auth_msg_abi());
    chain.add_abi("sysio", fixtures::system_abi());
    let provider = Arc::new(LocalWalletProvider::from_private_keys(&[ALICE_KEY, BOB_KEY], 1).unwrap());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let link = WireLink::new(
        config(),
        chain.clone(),
        Some(provider.clone() as Arc<dyn WalletProvider>),
        store,
    );
    Harness { chain, provider, link }
}

/// Like [`harness`], connected with alice selected.
pub async fn connected() -> Harness {
    let h = harness();
    h.link.connect().await.unwrap();
    h.link.select_account(ALICE_ADDRESS).unwrap();
    h
}
