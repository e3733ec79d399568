//! Transactions, their binary layout and signing digest.

use crate::{
    codec::{Decoder, Encoder, Pack},
    types::{Checksum256, PackedTransaction, PermissionLevel},
    AbiError,
};
use alloy_primitives::{hex, B256};
use sha2::{Digest, Sha256};
use wirelink_primitives::{Name, WireSignature};

/// An action with its data already packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    /// Contract executing the action.
    pub account: Name,
    /// Action name.
    pub name: Name,
    /// Permissions authorizing the action.
    pub authorization: Vec<PermissionLevel>,
    /// Packed action data.
    pub data: Vec<u8>,
}

impl Pack for PermissionLevel {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_name(self.actor);
        enc.write_name(self.permission);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        Ok(Self { actor: dec.read_name()?, permission: dec.read_name()? })
    }
}

impl Pack for Action {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_name(self.account);
        enc.write_name(self.name);
        self.authorization.pack(enc);
        enc.write_bytes(&self.data);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        Ok(Self {
            account: dec.read_name()?,
            name: dec.read_name()?,
            authorization: Vec::unpack(dec)?,
            data: dec.read_bytes()?.to_vec(),
        })
    }
}

/// Fields shared by every transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionHeader {
    /// Expiration, seconds since the epoch.
    pub expiration: u32,
    /// Low 16 bits of the referenced block number.
    pub ref_block_num: u16,
    /// Bytes 8..12 of the referenced block id.
    pub ref_block_prefix: u32,
    /// NET limit in 8-byte words, `0` for no limit.
    pub max_net_usage_words: u32,
    /// CPU limit in milliseconds, `0` for no limit.
    pub max_cpu_usage_ms: u8,
    /// Delay in seconds.
    pub delay_sec: u32,
}

impl Pack for TransactionHeader {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u32(self.expiration);
        enc.write_u16(self.ref_block_num);
        enc.write_u32(self.ref_block_prefix);
        enc.write_varuint32(self.max_net_usage_words);
        enc.write_u8(self.max_cpu_usage_ms);
        enc.write_varuint32(self.delay_sec);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        Ok(Self {
            expiration: dec.read_u32()?,
            ref_block_num: dec.read_u16()?,
            ref_block_prefix: dec.read_u32()?,
            max_net_usage_words: dec.read_varuint32()?,
            max_cpu_usage_ms: dec.read_u8()?,
            delay_sec: dec.read_varuint32()?,
        })
    }
}

/// A transaction extension: type tag and opaque data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionExtension {
    /// Extension type.
    pub ty: u16,
    /// Extension data.
    pub data: Vec<u8>,
}

impl Pack for TransactionExtension {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u16(self.ty);
        enc.write_bytes(&self.data);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        Ok(Self { ty: dec.read_u16()?, data: dec.read_bytes()?.to_vec() })
    }
}

/// An unsigned transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Header.
    pub header: TransactionHeader,
    /// Actions without authorization.
    pub context_free_actions: Vec<Action>,
    /// Actions.
    pub actions: Vec<Action>,
    /// Extensions.
    pub transaction_extensions: Vec<TransactionExtension>,
}

impl Pack for Transaction {
    fn pack(&self, enc: &mut Encoder) {
        self.header.pack(enc);
        self.context_free_actions.pack(enc);
        self.actions.pack(enc);
        self.transaction_extensions.pack(enc);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        Ok(Self {
            header: TransactionHeader::unpack(dec)?,
            context_free_actions: Vec::unpack(dec)?,
            actions: Vec::unpack(dec)?,
            transaction_extensions: Vec::unpack(dec)?,
        })
    }
}

impl Transaction {
    /// Creates a transaction carrying `actions`.
    pub fn new(header: TransactionHeader, actions: Vec<Action>) -> Self {
        Self { header, actions, ..Default::default() }
    }

    /// Returns the packed transaction.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.pack(&mut enc);
        enc.into_bytes()
    }

    /// Decodes a packed transaction, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AbiError> {
        let mut dec = Decoder::new(bytes);
        let trx = Self::unpack(&mut dec)?;
        if !dec.is_empty() {
            return Err(AbiError::invalid(
                "transaction",
                format!("{} trailing bytes", dec.remaining()),
            ));
        }
        Ok(trx)
    }

    /// Returns the transaction id: the sha256 of the packed transaction.
    pub fn id(&self) -> B256 {
        B256::from_slice(&Sha256::digest(self.to_bytes()))
    }

    /// Returns the digest signed by every authorizer: `sha256(chain_id ∥ packed_trx ∥ cfd)`, where
    /// `cfd` is 32 zero bytes as no context-free data is ever attached.
    pub fn signing_digest(&self, chain_id: &Checksum256) -> B256 {
        let digest = Sha256::new()
            .chain_update(chain_id.as_slice())
            .chain_update(self.to_bytes())
            .chain_update([0u8; 32])
            .finalize();
        B256::from_slice(&digest)
    }

    /// Attaches `signatures`, producing the body of `push_transaction`.
    pub fn into_packed(self, signatures: Vec<WireSignature>) -> PackedTransaction {
        PackedTransaction {
            signatures,
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(self.to_bytes()),
        }
    }
}

impl PackedTransaction {
    /// Decodes the packed transaction.
    pub fn transaction(&self) -> Result<Transaction, AbiError> {
        let bytes = hex::decode(&self.packed_trx)
            .map_err(|e| AbiError::invalid("packed_trx", e.to_string()))?;
        Transaction::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        let header = TransactionHeader {
            expiration: 0x6632_2e78,
            ref_block_num: 0x1170,
            ref_block_prefix: 0xd4c3_b2a1,
            ..Default::default()
        };
        let action = Action {
            account: Name::new("auth.msg"),
            name: Name::new("createlink"),
            authorization: vec![PermissionLevel::new(Name::new("alice"), Name::new("active"))],
            data: vec![0xde, 0xad],
        };
        Transaction::new(header, vec![action])
    }

    #[test]
    fn packs_header_then_actions() {
        let bytes = sample().to_bytes();
        // expiration, ref_block_num, ref_block_prefix
        assert_eq!(&bytes[..10], &[0x78, 0x2e, 0x32, 0x66, 0x70, 0x11, 0xa1, 0xb2, 0xc3, 0xd4]);
        // max_net_usage_words, max_cpu_usage_ms, delay_sec, no context-free actions, one action
        assert_eq!(&bytes[10..15], &[0, 0, 0, 0, 1]);
        assert_eq!(&bytes[15..23], &Name::new("auth.msg").as_u64().to_le_bytes());
        // one authorization, then data length and data, then no extensions
        assert_eq!(bytes[31], 1);
        assert_eq!(&bytes[bytes.len() - 4..], &[2, 0xde, 0xad, 0]);
        assert_eq!(bytes.len(), 15 + 8 + 8 + 1 + 16 + 1 + 2 + 1);
    }

    #[test]
    fn unpack_inverts_pack() {
        let trx = sample();
        similar_asserts::assert_eq!(Transaction::from_bytes(&trx.to_bytes()).unwrap(), trx);

        let mut bytes = trx.to_bytes();
        bytes.push(0);
        assert!(Transaction::from_bytes(&bytes).is_err());
        assert!(Transaction::from_bytes(&trx.to_bytes()[..20]).is_err());
    }

    #[test]
    fn digest_binds_chain_id() {
        let trx = sample();
        let a = Checksum256(B256::repeat_byte(1));
        let b = Checksum256(B256::repeat_byte(2));
        assert_ne!(trx.signing_digest(&a), trx.signing_digest(&b));

        let mut preimage = a.as_slice().to_vec();
        preimage.extend(trx.to_bytes());
        preimage.extend([0u8; 32]);
        assert_eq!(trx.signing_digest(&a).as_slice(), Sha256::digest(&preimage).as_slice());
    }

    #[test]
    fn packed_form_roundtrips() {
        let trx = sample();
        let packed = trx.clone().into_packed(vec![]);
        assert_eq!(packed.compression, 0);
        assert_eq!(packed.packed_context_free_data, "");
        similar_asserts::assert_eq!(packed.transaction().unwrap(), trx);
    }
}
