//! Binary serialization used by the chain: little-endian integers, LEB128 `varuint32` lengths.

use crate::AbiError;
use wirelink_primitives::Name;

/// Appends values in the chain's binary format.
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the encoder, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Appends raw bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends a byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Appends a `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a `u64`.
    pub fn write_u64(&mut self, value: u64) {
        self.write_raw(&value.to_le_bytes());
    }

    /// Appends a LEB128 encoded `u32`.
    pub fn write_varuint32(&mut self, mut value: u32) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(byte);
                return;
            }
            self.write_u8(byte | 0x80);
        }
    }

    /// Appends a zigzag LEB128 encoded `i32`.
    pub fn write_varint32(&mut self, value: i32) {
        self.write_varuint32(((value << 1) ^ (value >> 31)) as u32);
    }

    /// Appends a length-prefixed byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varuint32(bytes.len() as u32);
        self.write_raw(bytes);
    }

    /// Appends a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Appends a name as its packed `u64`.
    pub fn write_name(&mut self, name: Name) {
        self.write_u64(name.as_u64());
    }
}

/// Reads values in the chain's binary format.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns `true` once every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], AbiError> {
        if self.remaining() < len {
            return Err(AbiError::UnexpectedEnd { needed: len, remaining: self.remaining() });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], AbiError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Reads a byte.
    pub fn read_u8(&mut self) -> Result<u8, AbiError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a `u16`.
    pub fn read_u16(&mut self) -> Result<u16, AbiError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a `u32`.
    pub fn read_u32(&mut self) -> Result<u32, AbiError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a `u64`.
    pub fn read_u64(&mut self) -> Result<u64, AbiError> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads `N` bytes into an array.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], AbiError> {
        self.read_array()
    }

    /// Reads a LEB128 encoded `u32`.
    pub fn read_varuint32(&mut self) -> Result<u32, AbiError> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(AbiError::InvalidValue {
                    ty: "varuint32".into(),
                    reason: "too many bytes".into(),
                });
            }
        }
        u32::try_from(value).map_err(|_| AbiError::InvalidValue {
            ty: "varuint32".into(),
            reason: format!("{value} overflows u32"),
        })
    }

    /// Reads a zigzag LEB128 encoded `i32`.
    pub fn read_varint32(&mut self) -> Result<i32, AbiError> {
        let raw = self.read_varuint32()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], AbiError> {
        let len = self.read_varuint32()? as usize;
        self.read_raw(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, AbiError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| AbiError::InvalidValue {
            ty: "string".into(),
            reason: e.to_string(),
        })
    }

    /// Reads a packed name.
    pub fn read_name(&mut self) -> Result<Name, AbiError> {
        self.read_u64().map(Name::from_u64)
    }
}

/// Types with a fixed binary layout.
pub trait Pack: Sized {
    /// Appends `self` to `enc`.
    fn pack(&self, enc: &mut Encoder);

    /// Reads a value from `dec`.
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError>;
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_varuint32(self.len() as u32);
        for item in self {
            item.pack(enc);
        }
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        let len = dec.read_varuint32()? as usize;
        // Every element takes at least one byte.
        let mut out = Vec::with_capacity(len.min(dec.remaining()));
        for _ in 0..len {
            out.push(T::unpack(dec)?);
        }
        Ok(out)
    }
}

impl Pack for Name {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_name(*self);
    }

    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, AbiError> {
        dec.read_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn varuint32_known_encodings() {
        for (value, expected) in [
            (0u32, &[0x00][..]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (300, &[0xac, 0x02]),
            (u32::MAX, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ] {
            let mut enc = Encoder::new();
            enc.write_varuint32(value);
            assert_eq!(enc.as_bytes(), expected, "{value}");
        }
    }

    #[test]
    fn varint32_zigzag() {
        let mut enc = Encoder::new();
        enc.write_varint32(-1);
        enc.write_varint32(1);
        enc.write_varint32(-64);
        assert_eq!(enc.as_bytes(), &[0x01, 0x02, 0x7f]);
    }

    #[test]
    fn reports_truncated_input() {
        let mut dec = Decoder::new(&[0x01, 0x02]);
        let err = dec.read_u32().unwrap_err();
        assert!(matches!(err, AbiError::UnexpectedEnd { needed: 4, remaining: 2 }));

        let mut dec = Decoder::new(&[0x05, b'a']);
        assert!(dec.read_string().is_err());
    }

    proptest! {
        #[test]
        fn varints_decode_what_they_encode(u in any::<u32>(), i in any::<i32>()) {
            let mut enc = Encoder::new();
            enc.write_varuint32(u);
            enc.write_varint32(i);
            let bytes = enc.into_bytes();
            let mut dec = Decoder::new(&bytes);
            prop_assert_eq!(dec.read_varuint32().unwrap(), u);
            prop_assert_eq!(dec.read_varint32().unwrap(), i);
            prop_assert!(dec.is_empty());
        }
    }
}
