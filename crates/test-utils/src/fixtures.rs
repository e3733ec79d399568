//! Well-known keys, ABIs and chain responses.

use serde_json::{json, Value};
use wirelink_chain::{
    types::{AccountObject, GetInfoResponse},
    AbiDef,
};

/// First development key.
pub const ALICE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Checksummed address of [`ALICE_KEY`].
pub const ALICE_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Second development key.
pub const BOB_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
/// Checksummed address of [`BOB_KEY`].
pub const BOB_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Chain id reported by [`chain_info`].
pub const CHAIN_ID: &str = "8a34ec7df1b8cd06ff4a8abbaa7cc50300823350cadc59ab296cb00d104d2b8f";

/// Head block time reported by [`chain_info`], in seconds since the epoch.
pub const HEAD_BLOCK_TIMESTAMP: u32 = 1_714_564_800;

/// A `get_info` response with a fixed head block.
pub fn chain_info() -> GetInfoResponse {
    serde_json::from_value(json!({
        "server_version": "d1bc8d3",
        "chain_id": CHAIN_ID,
        "head_block_num": 4_470,
        "last_irreversible_block_num": 4_464,
        "last_irreversible_block_id": "00001170a1b2c3d4e5f60718293a4b5c6d7e8f90112233445566778899aabbcc",
        "head_block_id": "00001176ffeeddccbbaa99887766554433221100ffeeddccbbaa998877665544",
        "head_block_time": "2024-05-01T12:00:00.000",
        "head_block_producer": "sysio"
    }))
    .unwrap()
}

/// ABI of the link contract.
pub fn auth_msg_abi() -> AbiDef {
    serde_json::from_value(json!({
        "version": "sysio::abi/1.2",
        "types": [{ "new_type_name": "account_name", "type": "name" }],
        "structs": [
            {
                "name": "createlink",
                "base": "",
                "fields": [
                    { "name": "sig", "type": "signature" },
                    { "name": "msg_hash", "type": "checksum256" },
                    { "name": "nonce", "type": "uint64" },
                    { "name": "account_name", "type": "account_name" }
                ]
            },
            {
                "name": "link",
                "base": "",
                "fields": [
                    { "name": "key", "type": "uint64" },
                    { "name": "account_name", "type": "name" },
                    { "name": "pub_key", "type": "string" },
                    { "name": "eth_address", "type": "checksum160" }
                ]
            }
        ],
        "actions": [{ "name": "createlink", "type": "createlink", "ricardian_contract": "" }],
        "tables": [{
            "name": "links",
            "index_type": "i64",
            "key_names": [],
            "key_types": [],
            "type": "link"
        }]
    }))
    .unwrap()
}

/// ABI of the system contract, reduced to `linkauth`.
pub fn system_abi() -> AbiDef {
    serde_json::from_value(json!({
        "version": "sysio::abi/1.2",
        "structs": [{
            "name": "linkauth",
            "base": "",
            "fields": [
                { "name": "account", "type": "name" },
                { "name": "code", "type": "name" },
                { "name": "type", "type": "name" },
                { "name": "requirement", "type": "name" }
            ]
        }],
        "actions": [{ "name": "linkauth", "type": "linkauth" }]
    }))
    .unwrap()
}

/// A `get_account` response for `name` with `owner` and `active` permissions.
pub fn account(name: &str) -> AccountObject {
    let authority = json!({
        "threshold": 1,
        "keys": [{ "key": "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63", "weight": 1 }],
        "accounts": [],
        "waits": []
    });
    serde_json::from_value(json!({
        "account_name": name,
        "created": "2024-04-30T08:15:00.000",
        "ram_quota": 8_192,
        "ram_usage": 2_996,
        "permissions": [
            { "perm_name": "active", "parent": "owner", "required_auth": authority },
            { "perm_name": "owner", "parent": "", "required_auth": authority }
        ]
    }))
    .unwrap()
}

/// A row of the links table binding `account_name` to `pub_key`.
pub fn link_row(account_name: &str, pub_key: &str, eth_address: &str) -> Value {
    json!({
        "key": 0,
        "account_name": account_name,
        "pub_key": pub_key,
        "eth_address": eth_address.trim_start_matches("0x").to_lowercase(),
    })
}
