use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Character map of the base-32 name encoding; the index of a character is its symbol value.
const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Maximum length of a name string; the 13th character only carries 4 bits.
const MAX_LEN: usize = 13;

/// Errors that can occur when parsing a [`Name`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The string is longer than 13 characters.
    #[error("name `{0}` is longer than 13 characters")]
    TooLong(String),
    /// The string contains a character outside of `.12345a-z`.
    #[error("name `{name}` contains invalid character `{ch}`")]
    InvalidCharacter {
        /// The rejected input.
        name: String,
        /// The offending character.
        ch: char,
    },
    /// The 13th character is outside of `.12345a-j`.
    #[error("the 13th character of name `{0}` must be one of `.12345abcdefghij`")]
    InvalidLastCharacter(String),
}

/// A chain account, contract, action or permission name packed into 64 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    /// Wraps a raw packed value.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Returns the packed value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Packs a name known at compile time.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid name; in a `const` item this is a compile error. Parse
    /// untrusted input with [`str::parse`] instead.
    pub const fn new(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() <= MAX_LEN, "name is longer than 13 characters");
        let mut value = 0u64;
        let mut i = 0;
        while i < bytes.len() {
            let Some(sym) = symbol(bytes[i]) else { panic!("invalid name character") };
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                assert!(sym <= 0x0f, "invalid 13th name character");
                value |= sym;
            }
            i += 1;
        }
        Self(value)
    }

    /// Returns `true` for the empty name.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

const fn symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_LEN {
            return Err(NameError::TooLong(s.to_string()));
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let sym = symbol(c).ok_or_else(|| NameError::InvalidCharacter {
                name: s.to_string(),
                ch: c as char,
            })?;
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if sym > 0x0f {
                    return Err(NameError::InvalidLastCharacter(s.to_string()));
                }
                value |= sym;
            }
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_LEN {
            let mask = if i == 0 { 0x0f } else { 0x1f };
            out[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let end = out.iter().rposition(|&c| c != b'.').map_or(0, |pos| pos + 1);
        // The charmap is ASCII, so every prefix is valid UTF-8.
        f.write_str(std::str::from_utf8(&out[..end]).map_err(|_| fmt::Error)?)
    }
}

impl From<Name> for u64 {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_common_names() {
        for s in ["auth.msg", "sysio", "settle.wns", "linkauth", "createlink", "a", "zzzzzzzzzzzzj"] {
            let name: Name = s.parse().unwrap();
            assert_eq!(name.to_string(), s);
        }
    }

    #[test]
    fn known_packed_values() {
        // `eosio` and `active` have well-known packed representations.
        assert_eq!("eosio".parse::<Name>().unwrap().as_u64(), 6138663577826885632);
        assert_eq!("active".parse::<Name>().unwrap().as_u64(), 3617214756542218240);
    }

    #[test]
    fn const_constructor_matches_parser() {
        const AUTH_MSG: Name = Name::new("auth.msg");
        assert_eq!(AUTH_MSG, "auth.msg".parse().unwrap());
        assert_eq!(Name::new("zzzzzzzzzzzzj"), "zzzzzzzzzzzzj".parse().unwrap());
    }

    #[test]
    fn empty_name_is_zero() {
        let name: Name = "".parse().unwrap();
        assert!(name.is_empty());
        assert_eq!(name.to_string(), "");
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!("Alice".parse::<Name>(), Err(NameError::InvalidCharacter { ch: 'A', .. })));
        assert!(matches!("alice6".parse::<Name>(), Err(NameError::InvalidCharacter { ch: '6', .. })));
        assert!(matches!("aaaaaaaaaaaaaa".parse::<Name>(), Err(NameError::TooLong(_))));
        assert!(matches!("aaaaaaaaaaaaz".parse::<Name>(), Err(NameError::InvalidLastCharacter(_))));
    }
}
