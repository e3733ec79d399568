use crate::KeyError;
use alloy_primitives::Signature;
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Length of the signature payload for every supported key type.
const SIGNATURE_LEN: usize = 65;

/// Length of the ripemd160 checksum appended before base58 encoding.
const CHECKSUM_LEN: usize = 4;

/// Compact recovery header offset used by `K1` signatures (27 + 4 for compressed keys).
const K1_HEADER_OFFSET: u8 = 27 + 4;

/// Key types understood by the chain, in their on-wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// secp256k1, chain-native.
    K1,
    /// secp256r1.
    R1,
    /// WebAuthn.
    WA,
    /// secp256k1 produced by an Ethereum-style wallet (`personal_sign`).
    EM,
    /// ed25519.
    ED,
}

impl KeyType {
    /// Returns the textual suffix used in string encodings.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::K1 => "K1",
            Self::R1 => "R1",
            Self::WA => "WA",
            Self::EM => "EM",
            Self::ED => "ED",
        }
    }

    /// Returns the on-wire discriminant.
    pub const fn index(&self) -> u8 {
        match self {
            Self::K1 => 0,
            Self::R1 => 1,
            Self::WA => 2,
            Self::EM => 3,
            Self::ED => 4,
        }
    }

    fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => Self::K1,
            1 => Self::R1,
            2 => Self::WA,
            3 => Self::EM,
            4 => Self::ED,
            _ => return None,
        })
    }
}

impl FromStr for KeyType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "K1" => Ok(Self::K1),
            "R1" => Ok(Self::R1),
            "WA" => Ok(Self::WA),
            "EM" => Ok(Self::EM),
            "ED" => Ok(Self::ED),
            other => Err(KeyError::InvalidSignature(format!("unknown key type `{other}`"))),
        }
    }
}

/// A signature in the chain-native encoding: `SIG_<type>_<base58(data ∥ checksum)>`.
#[derive(Clone, PartialEq, Eq)]
pub struct WireSignature {
    key_type: KeyType,
    data: [u8; SIGNATURE_LEN],
}

impl WireSignature {
    /// Creates a signature from its raw parts.
    pub const fn new(key_type: KeyType, data: [u8; SIGNATURE_LEN]) -> Self {
        Self { key_type, data }
    }

    /// Converts a wallet signature into the chain encoding for `key_type`.
    ///
    /// `K1` re-packs the signature as `[header, r, s]` with a compact recovery header. Every other
    /// key type keeps the wallet layout `r ∥ s ∥ v` with `v` in `{27, 28}`.
    pub fn from_wallet(signature: &Signature, key_type: KeyType) -> Self {
        let wallet = signature.as_bytes();
        let data = match key_type {
            KeyType::K1 => {
                let mut data = [0u8; SIGNATURE_LEN];
                data[0] = K1_HEADER_OFFSET + signature.v() as u8;
                data[1..].copy_from_slice(&wallet[..64]);
                data
            }
            _ => wallet,
        };
        Self { key_type, data }
    }

    /// Returns the key type.
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the 65 signature bytes, without the key type.
    pub const fn data(&self) -> &[u8; SIGNATURE_LEN] {
        &self.data
    }

    /// Returns the binary form used in packed action data: key type byte followed by the data.
    pub fn to_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + SIGNATURE_LEN);
        out.push(self.key_type.index());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decodes the binary form produced by [`Self::to_packed`].
    pub fn from_packed(bytes: &[u8]) -> Result<Self, KeyError> {
        let (&index, rest) =
            bytes.split_first().ok_or_else(|| KeyError::InvalidSignature("empty".into()))?;
        let key_type = KeyType::from_index(index)
            .ok_or_else(|| KeyError::InvalidSignature(format!("unknown key type index {index}")))?;
        let data = rest
            .try_into()
            .map_err(|_| KeyError::InvalidSignature(format!("expected {SIGNATURE_LEN} bytes")))?;
        Ok(Self { key_type, data })
    }

    /// Recovers the wallet signature from an `EM` or `K1` encoded signature.
    pub fn to_wallet(&self) -> Result<Signature, KeyError> {
        let mut wallet = [0u8; SIGNATURE_LEN];
        match self.key_type {
            KeyType::K1 => {
                let parity = self.data[0].checked_sub(K1_HEADER_OFFSET).filter(|p| *p <= 1);
                let parity = parity
                    .ok_or_else(|| KeyError::InvalidSignature("bad recovery header".into()))?;
                wallet[..64].copy_from_slice(&self.data[1..]);
                wallet[64] = 27 + parity;
            }
            KeyType::EM => wallet = self.data,
            other => {
                return Err(KeyError::InvalidSignature(format!(
                    "{} signatures are not secp256k1 wallet signatures",
                    other.as_str()
                )));
            }
        }
        Signature::try_from(&wallet[..]).map_err(|e| KeyError::InvalidSignature(e.to_string()))
    }
}

fn checksum(data: &[u8], key_type: KeyType) -> [u8; CHECKSUM_LEN] {
    let digest = Ripemd160::new().chain_update(data).chain_update(key_type.as_str()).finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

impl fmt::Display for WireSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(SIGNATURE_LEN + CHECKSUM_LEN);
        payload.extend_from_slice(&self.data);
        payload.extend_from_slice(&checksum(&self.data, self.key_type));
        write!(f, "SIG_{}_{}", self.key_type.as_str(), bs58::encode(payload).into_string())
    }
}

impl fmt::Debug for WireSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for WireSignature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeyError::InvalidSignature(format!("{reason}: `{s}`"));

        let rest = s.strip_prefix("SIG_").ok_or_else(|| invalid("missing `SIG_` prefix"))?;
        let (kind, encoded) = rest.split_once('_').ok_or_else(|| invalid("missing key type"))?;
        let key_type: KeyType = kind.parse()?;

        let payload = bs58::decode(encoded).into_vec().map_err(|_| invalid("invalid base58"))?;
        if payload.len() != SIGNATURE_LEN + CHECKSUM_LEN {
            return Err(invalid("unexpected length"));
        }
        let (data, check) = payload.split_at(SIGNATURE_LEN);
        if check != checksum(data, key_type) {
            return Err(invalid("checksum mismatch"));
        }

        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(data);
        Ok(Self { key_type, data: out })
    }
}

impl Serialize for WireSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WireSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};

    fn wallet_signature(parity: bool) -> Signature {
        Signature::new(U256::from(0xdead_beefu64), U256::from(0xcafe_babeu64), parity)
    }

    #[test]
    fn k1_uses_compact_header() {
        let sig = WireSignature::from_wallet(&wallet_signature(true), KeyType::K1);
        assert_eq!(sig.data()[0], 32);
        let sig = WireSignature::from_wallet(&wallet_signature(false), KeyType::K1);
        assert_eq!(sig.data()[0], 31);
        assert_eq!(&sig.data()[1..33], B256::from(U256::from(0xdead_beefu64)).as_slice());
    }

    #[test]
    fn em_keeps_wallet_layout() {
        let wallet = wallet_signature(true);
        let sig = WireSignature::from_wallet(&wallet, KeyType::EM);
        assert_eq!(sig.data(), &wallet.as_bytes());
        assert_eq!(sig.data()[64], 28);
    }

    #[test]
    fn string_form_roundtrips_with_checksum() {
        for key_type in [KeyType::K1, KeyType::EM] {
            let sig = WireSignature::from_wallet(&wallet_signature(false), key_type);
            let encoded = sig.to_string();
            assert!(encoded.starts_with(&format!("SIG_{}_", key_type.as_str())));
            assert_eq!(encoded.parse::<WireSignature>().unwrap(), sig);
        }
    }

    #[test]
    fn rejects_tampered_strings() {
        let sig = WireSignature::from_wallet(&wallet_signature(false), KeyType::EM).to_string();
        // Same payload announced as a different key type fails the checksum.
        let retyped = sig.replacen("SIG_EM_", "SIG_K1_", 1);
        assert!(retyped.parse::<WireSignature>().is_err());
        assert!("SIG_XX_abc".parse::<WireSignature>().is_err());
        assert!("PUB_K1_abc".parse::<WireSignature>().is_err());
    }

    #[test]
    fn converts_back_to_wallet_signature() {
        let wallet = wallet_signature(true);
        for key_type in [KeyType::K1, KeyType::EM] {
            let sig = WireSignature::from_wallet(&wallet, key_type);
            assert_eq!(sig.to_wallet().unwrap(), wallet);
            assert_eq!(WireSignature::from_packed(&sig.to_packed()).unwrap(), sig);
        }
    }
}
