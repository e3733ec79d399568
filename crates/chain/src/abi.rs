//! Contract ABIs and ABI-driven encoding of JSON action data.

use crate::{
    codec::{Decoder, Encoder},
    AbiError,
};
use alloy_primitives::hex;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use wirelink_primitives::{Name, WireSignature};

/// Alias and struct chains longer than this are rejected.
const MAX_DEPTH: usize = 32;

const TIME_POINT_SEC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIME_POINT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// A type alias declared by an ABI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTypeDef {
    /// Alias.
    pub new_type_name: String,
    /// Aliased type.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A struct field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiField {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A struct, optionally extending a base struct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiStruct {
    /// Struct name.
    pub name: String,
    /// Base struct, empty for none.
    #[serde(default)]
    pub base: String,
    /// Fields, after the base fields.
    pub fields: Vec<AbiField>,
}

/// An action and the struct of its data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiAction {
    /// Action name.
    pub name: Name,
    /// Data type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Ricardian contract.
    #[serde(default)]
    pub ricardian_contract: String,
}

/// A table and the struct of its rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTable {
    /// Table name.
    pub name: Name,
    /// Primary index type.
    #[serde(default)]
    pub index_type: String,
    /// Key names.
    #[serde(default)]
    pub key_names: Vec<String>,
    /// Key types.
    #[serde(default)]
    pub key_types: Vec<String>,
    /// Row type.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A tagged union.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiVariant {
    /// Variant name.
    pub name: String,
    /// Alternatives, in tag order.
    pub types: Vec<String>,
}

/// A contract ABI as served by `get_abi`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiDef {
    /// ABI version, e.g. `eosio::abi/1.2`.
    pub version: String,
    /// Type aliases.
    pub types: Vec<AbiTypeDef>,
    /// Structs.
    pub structs: Vec<AbiStruct>,
    /// Actions.
    pub actions: Vec<AbiAction>,
    /// Tables.
    pub tables: Vec<AbiTable>,
    /// Variants.
    pub variants: Vec<AbiVariant>,
}

/// An ABI indexed for encoding.
#[derive(Clone, Debug, Default)]
pub struct Abi {
    aliases: HashMap<String, String>,
    structs: HashMap<String, AbiStruct>,
    variants: HashMap<String, Vec<String>>,
    actions: HashMap<Name, String>,
}

impl From<AbiDef> for Abi {
    fn from(def: AbiDef) -> Self {
        Self {
            aliases: def.types.into_iter().map(|t| (t.new_type_name, t.ty)).collect(),
            structs: def.structs.into_iter().map(|s| (s.name.clone(), s)).collect(),
            variants: def.variants.into_iter().map(|v| (v.name, v.types)).collect(),
            actions: def.actions.into_iter().map(|a| (a.name, a.ty)).collect(),
        }
    }
}

impl Abi {
    /// Returns the data type of `action`.
    pub fn action_type(&self, action: Name) -> Result<&str, AbiError> {
        self.actions.get(&action).map(String::as_str).ok_or(AbiError::UnknownAction(action))
    }

    /// Packs the JSON data of `action`.
    pub fn encode_action_data(&self, action: Name, data: &Value) -> Result<Vec<u8>, AbiError> {
        let ty = self.action_type(action)?;
        let mut enc = Encoder::new();
        self.encode(ty, data, &mut enc)?;
        Ok(enc.into_bytes())
    }

    /// Unpacks the data of `action` into JSON.
    pub fn decode_action_data(&self, action: Name, data: &[u8]) -> Result<Value, AbiError> {
        let ty = self.action_type(action)?;
        let mut dec = Decoder::new(data);
        let value = self.decode(ty, &mut dec)?;
        if !dec.is_empty() {
            return Err(AbiError::invalid(ty, format!("{} trailing bytes", dec.remaining())));
        }
        Ok(value)
    }

    /// Follows aliases until a non-alias type is reached.
    fn resolve<'a>(&'a self, mut ty: &'a str) -> Result<&'a str, AbiError> {
        for _ in 0..MAX_DEPTH {
            match self.aliases.get(ty) {
                Some(target) => ty = target,
                None => return Ok(ty),
            }
        }
        Err(AbiError::TooDeep(ty.to_string()))
    }

    /// Appends `value` encoded as `ty`.
    pub fn encode(&self, ty: &str, value: &Value, enc: &mut Encoder) -> Result<(), AbiError> {
        self.encode_at(ty, value, enc, 0)
    }

    fn encode_at(
        &self,
        ty: &str,
        value: &Value,
        enc: &mut Encoder,
        depth: usize,
    ) -> Result<(), AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(ty.to_string()));
        }
        if let Some(inner) = ty.strip_suffix('$') {
            if value.is_null() {
                return Ok(());
            }
            return self.encode_at(inner, value, enc, depth + 1);
        }
        if let Some(inner) = ty.strip_suffix('?') {
            if value.is_null() {
                enc.write_u8(0);
                return Ok(());
            }
            enc.write_u8(1);
            return self.encode_at(inner, value, enc, depth + 1);
        }
        if let Some(inner) = ty.strip_suffix("[]") {
            let items = value.as_array().ok_or_else(|| AbiError::invalid(ty, "expected an array"))?;
            enc.write_varuint32(items.len() as u32);
            for item in items {
                self.encode_at(inner, item, enc, depth + 1)?;
            }
            return Ok(());
        }

        let resolved = self.resolve(ty)?;
        if resolved != ty {
            return self.encode_at(resolved, value, enc, depth + 1);
        }
        if encode_builtin(ty, value, enc)? {
            return Ok(());
        }
        if let Some(def) = self.structs.get(ty) {
            let object =
                value.as_object().ok_or_else(|| AbiError::invalid(ty, "expected an object"))?;
            return self.encode_struct(def, object, enc, depth + 1);
        }
        if let Some(alternatives) = self.variants.get(ty) {
            let (tag, inner) = variant_parts(ty, value)?;
            let index = alternatives
                .iter()
                .position(|alt| alt == tag)
                .ok_or_else(|| AbiError::invalid(ty, format!("unknown alternative `{tag}`")))?;
            enc.write_varuint32(index as u32);
            return self.encode_at(tag, inner, enc, depth + 1);
        }
        Err(AbiError::UnsupportedType(ty.to_string()))
    }

    fn encode_struct(
        &self,
        def: &AbiStruct,
        object: &Map<String, Value>,
        enc: &mut Encoder,
        depth: usize,
    ) -> Result<(), AbiError> {
        if !def.base.is_empty() {
            let base = self.resolve(&def.base)?;
            let base = self
                .structs
                .get(base)
                .ok_or_else(|| AbiError::UnsupportedType(def.base.clone()))?;
            if depth > MAX_DEPTH {
                return Err(AbiError::TooDeep(def.name.clone()));
            }
            self.encode_struct(base, object, enc, depth + 1)?;
        }
        let mut extension_missing = false;
        for field in &def.fields {
            match object.get(&field.name) {
                Some(value) if !extension_missing => {
                    self.encode_at(&field.ty, value, enc, depth + 1)?
                }
                // Binary extensions may only be omitted from the end.
                Some(_) => {
                    return Err(AbiError::invalid(
                        &def.name,
                        format!("field `{}` follows an omitted extension", field.name),
                    ));
                }
                None if field.ty.ends_with('$') => extension_missing = true,
                None => {
                    return Err(AbiError::MissingField {
                        ty: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reads a value of type `ty` as JSON.
    pub fn decode(&self, ty: &str, dec: &mut Decoder<'_>) -> Result<Value, AbiError> {
        self.decode_at(ty, dec, 0)
    }

    fn decode_at(&self, ty: &str, dec: &mut Decoder<'_>, depth: usize) -> Result<Value, AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(ty.to_string()));
        }
        if let Some(inner) = ty.strip_suffix('$') {
            if dec.is_empty() {
                return Ok(Value::Null);
            }
            return self.decode_at(inner, dec, depth + 1);
        }
        if let Some(inner) = ty.strip_suffix('?') {
            return match dec.read_u8()? {
                0 => Ok(Value::Null),
                _ => self.decode_at(inner, dec, depth + 1),
            };
        }
        if let Some(inner) = ty.strip_suffix("[]") {
            let len = dec.read_varuint32()? as usize;
            let mut items = Vec::with_capacity(len.min(dec.remaining()));
            for _ in 0..len {
                items.push(self.decode_at(inner, dec, depth + 1)?);
            }
            return Ok(Value::Array(items));
        }

        let resolved = self.resolve(ty)?;
        if resolved != ty {
            return self.decode_at(resolved, dec, depth + 1);
        }
        if let Some(value) = decode_builtin(ty, dec)? {
            return Ok(value);
        }
        if let Some(def) = self.structs.get(ty) {
            let mut object = Map::new();
            self.decode_struct(def, dec, &mut object, depth + 1)?;
            return Ok(Value::Object(object));
        }
        if let Some(alternatives) = self.variants.get(ty) {
            let index = dec.read_varuint32()? as usize;
            let tag = alternatives
                .get(index)
                .ok_or_else(|| AbiError::invalid(ty, format!("unknown alternative {index}")))?;
            let inner = self.decode_at(tag, dec, depth + 1)?;
            return Ok(Value::Array(vec![Value::String(tag.clone()), inner]));
        }
        Err(AbiError::UnsupportedType(ty.to_string()))
    }

    fn decode_struct(
        &self,
        def: &AbiStruct,
        dec: &mut Decoder<'_>,
        object: &mut Map<String, Value>,
        depth: usize,
    ) -> Result<(), AbiError> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(def.name.clone()));
        }
        if !def.base.is_empty() {
            let base = self.resolve(&def.base)?;
            let base = self
                .structs
                .get(base)
                .ok_or_else(|| AbiError::UnsupportedType(def.base.clone()))?;
            self.decode_struct(base, dec, object, depth + 1)?;
        }
        for field in &def.fields {
            if field.ty.ends_with('$') && dec.is_empty() {
                break;
            }
            let value = self.decode_at(&field.ty, dec, depth + 1)?;
            object.insert(field.name.clone(), value);
        }
        Ok(())
    }
}

/// Splits a variant value given as `["type", value]` or `{"type": .., "value": ..}`.
fn variant_parts<'a>(ty: &str, value: &'a Value) -> Result<(&'a str, &'a Value), AbiError> {
    let parts = match value {
        Value::Array(pair) if pair.len() == 2 => pair[0].as_str().map(|tag| (tag, &pair[1])),
        Value::Object(object) => object
            .get("type")
            .and_then(Value::as_str)
            .zip(object.get("value")),
        _ => None,
    };
    parts.ok_or_else(|| AbiError::invalid(ty, "expected `[type, value]`"))
}

fn as_u64(ty: &str, value: &Value) -> Result<u64, AbiError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AbiError::invalid(ty, format!("expected an unsigned integer, got {value}")))
}

fn as_i64(ty: &str, value: &Value) -> Result<i64, AbiError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AbiError::invalid(ty, format!("expected an integer, got {value}")))
}

fn as_f64(ty: &str, value: &Value) -> Result<f64, AbiError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AbiError::invalid(ty, format!("expected a number, got {value}")))
}

fn as_str<'a>(ty: &str, value: &'a Value) -> Result<&'a str, AbiError> {
    value.as_str().ok_or_else(|| AbiError::invalid(ty, format!("expected a string, got {value}")))
}

fn unsigned<T: TryFrom<u64>>(ty: &str, value: &Value) -> Result<T, AbiError> {
    let raw = as_u64(ty, value)?;
    T::try_from(raw).map_err(|_| AbiError::invalid(ty, format!("{raw} is out of range")))
}

fn signed<T: TryFrom<i64>>(ty: &str, value: &Value) -> Result<T, AbiError> {
    let raw = as_i64(ty, value)?;
    T::try_from(raw).map_err(|_| AbiError::invalid(ty, format!("{raw} is out of range")))
}

fn hex_bytes(ty: &str, value: &Value, len: Option<usize>) -> Result<Vec<u8>, AbiError> {
    let bytes = hex::decode(as_str(ty, value)?).map_err(|e| AbiError::invalid(ty, e.to_string()))?;
    match len {
        Some(len) if bytes.len() != len => {
            Err(AbiError::invalid(ty, format!("expected {len} bytes, got {}", bytes.len())))
        }
        _ => Ok(bytes),
    }
}

fn parse_time(ty: &str, value: &Value, format: &str) -> Result<NaiveDateTime, AbiError> {
    let s = as_str(ty, value)?;
    NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), format)
        .map_err(|e| AbiError::invalid(ty, format!("`{s}`: {e}")))
}

/// Encodes a built-in type. Returns `false` if `ty` is not built in.
fn encode_builtin(ty: &str, value: &Value, enc: &mut Encoder) -> Result<bool, AbiError> {
    match ty {
        "bool" => {
            let flag = value.as_bool().ok_or_else(|| AbiError::invalid(ty, "expected a bool"))?;
            enc.write_u8(flag.into());
        }
        "int8" => enc.write_raw(&signed::<i8>(ty, value)?.to_le_bytes()),
        "int16" => enc.write_raw(&signed::<i16>(ty, value)?.to_le_bytes()),
        "int32" => enc.write_raw(&signed::<i32>(ty, value)?.to_le_bytes()),
        "int64" => enc.write_raw(&as_i64(ty, value)?.to_le_bytes()),
        "uint8" => enc.write_u8(unsigned(ty, value)?),
        "uint16" => enc.write_u16(unsigned(ty, value)?),
        "uint32" => enc.write_u32(unsigned(ty, value)?),
        "uint64" => enc.write_u64(as_u64(ty, value)?),
        "varuint32" => enc.write_varuint32(unsigned(ty, value)?),
        "varint32" => enc.write_varint32(signed(ty, value)?),
        "float32" => enc.write_raw(&(as_f64(ty, value)? as f32).to_le_bytes()),
        "float64" => enc.write_raw(&as_f64(ty, value)?.to_le_bytes()),
        "name" => enc.write_name(as_str(ty, value)?.parse()?),
        "string" => enc.write_string(as_str(ty, value)?),
        "bytes" => enc.write_bytes(&hex_bytes(ty, value, None)?),
        "checksum160" => enc.write_raw(&hex_bytes(ty, value, Some(20))?),
        "checksum256" => enc.write_raw(&hex_bytes(ty, value, Some(32))?),
        "checksum512" => enc.write_raw(&hex_bytes(ty, value, Some(64))?),
        "time_point_sec" => {
            let secs = match value {
                Value::Number(_) => as_i64(ty, value)?,
                _ => parse_time(ty, value, TIME_POINT_SEC_FORMAT)?.and_utc().timestamp(),
            };
            let secs =
                u32::try_from(secs).map_err(|_| AbiError::invalid(ty, "out of range"))?;
            enc.write_u32(secs);
        }
        "time_point" => {
            let micros = match value {
                Value::Number(_) => as_i64(ty, value)?,
                _ => parse_time(ty, value, TIME_POINT_FORMAT)?.and_utc().timestamp_micros(),
            };
            enc.write_raw(&micros.to_le_bytes());
        }
        "signature" => {
            let signature: WireSignature = as_str(ty, value)?.parse()?;
            enc.write_raw(&signature.to_packed());
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Decodes a built-in type. Returns `None` if `ty` is not built in.
fn decode_builtin(ty: &str, dec: &mut Decoder<'_>) -> Result<Option<Value>, AbiError> {
    let value: Value = match ty {
        "bool" => Value::Bool(dec.read_u8()? != 0),
        "int8" => i8::from_le_bytes(dec.read_fixed()?).into(),
        "int16" => i16::from_le_bytes(dec.read_fixed()?).into(),
        "int32" => i32::from_le_bytes(dec.read_fixed()?).into(),
        "int64" => i64::from_le_bytes(dec.read_fixed()?).into(),
        "uint8" => dec.read_u8()?.into(),
        "uint16" => dec.read_u16()?.into(),
        "uint32" => dec.read_u32()?.into(),
        "uint64" => dec.read_u64()?.into(),
        "varuint32" => dec.read_varuint32()?.into(),
        "varint32" => dec.read_varint32()?.into(),
        "float32" => f32::from_le_bytes(dec.read_fixed()?).into(),
        "float64" => f64::from_le_bytes(dec.read_fixed()?).into(),
        "name" => dec.read_name()?.to_string().into(),
        "string" => dec.read_string()?.into(),
        "bytes" => hex::encode(dec.read_bytes()?).into(),
        "checksum160" => hex::encode(dec.read_raw(20)?).into(),
        "checksum256" => hex::encode(dec.read_raw(32)?).into(),
        "checksum512" => hex::encode(dec.read_raw(64)?).into(),
        "time_point_sec" => {
            let secs = dec.read_u32()?;
            DateTime::from_timestamp(i64::from(secs), 0)
                .ok_or_else(|| AbiError::invalid(ty, "out of range"))?
                .format(TIME_POINT_SEC_FORMAT)
                .to_string()
                .into()
        }
        "time_point" => {
            let micros = i64::from_le_bytes(dec.read_fixed()?);
            DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| AbiError::invalid(ty, "out of range"))?
                .format(TIME_POINT_FORMAT)
                .to_string()
                .into()
        }
        "signature" => {
            let key_type = dec.read_u8()?;
            let data = dec.read_raw(65)?;
            let mut packed = Vec::with_capacity(66);
            packed.push(key_type);
            packed.extend_from_slice(data);
            WireSignature::from_packed(&packed)?.to_string().into()
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}
