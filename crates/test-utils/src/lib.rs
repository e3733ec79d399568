//! Test helpers shared by the wirelink crates.

#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

pub mod fixtures;
pub use fixtures::{ALICE_ADDRESS, ALICE_KEY, BOB_ADDRESS, BOB_KEY};

mod mock;
pub use mock::{Call, Method, MockChain};

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
