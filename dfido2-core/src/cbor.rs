//! CBOR encoding and decoding using cbor4ii
//!
//! [`Value`] is `cbor4ii::core::Value`; its maps are entry vectors, so
//! entries keep the order they were inserted in. Emitting them unchanged is
//! the default ([`MapOrdering::Insertion`]); [`MapOrdering::Canonical`]
//! sorts every map by the CTAP2 canonical rule (shorter encoded key first,
//! then bytewise) before encoding.
//!
//! Spec: <https://www.rfc-editor.org/rfc/rfc8949.html>
//!
//! # Usage
//!
//! ```
//! use dfido2_core::cbor::{MapBuilder, MapParser};
//!
//! let bytes = MapBuilder::new()
//!     .insert(1, 2)?
//!     .insert_bytes(-2, &[0xAA; 4])?
//!     .build()?;
//!
//! let parser = MapParser::from_bytes(&bytes)?;
//! assert_eq!(parser.get_int(1)?, 2);
//! assert_eq!(parser.get_bytes(-2)?, &[0xAA; 4]);
//! # Ok::<(), dfido2_core::Error>(())
//! ```

use crate::status::{Error, Result};

use cbor4ii::core::dec::Decode;
use cbor4ii::core::utils::SliceReader;
use core::cmp::Ordering;
use serde::{Deserialize, Serialize};

/// Type alias for CBOR Value
pub type Value = cbor4ii::core::Value;

/// Map entries in encoding order
pub type Map = Vec<(Value, Value)>;

/// Nested containers deeper than this are rejected while decoding
const MAX_DEPTH: usize = 16;

/// Map entry ordering used when encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapOrdering {
    /// Emit entries in the order they were inserted
    #[default]
    Insertion,
    /// CTAP2 canonical ordering
    Canonical,
}

/// Map key: integers for COSE structures, text for WebAuthn structures
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Text(String),
}

impl MapKey {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Integer((*i).into()),
            Self::Text(t) => Value::Text(t.clone()),
        }
    }

    /// True when `key` is the CBOR form of this key
    pub fn matches(&self, key: &Value) -> bool {
        match (self, key) {
            (Self::Int(a), Value::Integer(b)) => i128::from(*a) == *b,
            (Self::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }

    pub fn from_value(key: &Value) -> Option<Self> {
        match key {
            Value::Integer(i) => i64::try_from(*i).ok().map(Self::Int),
            Value::Text(t) => Some(Self::Text(t.clone())),
            _ => None,
        }
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MapKey {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl core::fmt::Display for MapKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// Keyed access to [`Map`] entries
pub trait MapExt {
    fn lookup(&self, key: impl Into<MapKey>) -> Option<&Value>;

    /// Insert or replace an entry, keeping the original position on replace
    fn put(&mut self, key: impl Into<MapKey>, value: Value);

    fn contains_key(&self, key: impl Into<MapKey>) -> bool {
        self.lookup(key).is_some()
    }

    fn lookup_bytes(&self, key: impl Into<MapKey>) -> Option<&[u8]> {
        self.lookup(key).and_then(as_bytes)
    }

    fn lookup_text(&self, key: impl Into<MapKey>) -> Option<&str> {
        self.lookup(key).and_then(as_text)
    }

    fn lookup_int(&self, key: impl Into<MapKey>) -> Option<i64> {
        self.lookup(key).and_then(as_int)
    }
}

impl MapExt for Map {
    fn lookup(&self, key: impl Into<MapKey>) -> Option<&Value> {
        let key = key.into();
        self.iter().find(|(k, _)| key.matches(k)).map(|(_, v)| v)
    }

    fn put(&mut self, key: impl Into<MapKey>, value: Value) {
        let key = key.into();
        match self.iter_mut().find(|(k, _)| key.matches(k)) {
            Some(entry) => entry.1 = value,
            None => self.push((key.to_value(), value)),
        }
    }
}

pub fn as_bytes(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

pub fn as_text(value: &Value) -> Option<&str> {
    match value {
        Value::Text(t) => Some(t),
        _ => None,
    }
}

pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => i64::try_from(*i).ok(),
        _ => None,
    }
}

pub fn as_map(value: &Value) -> Option<&Map> {
    match value {
        Value::Map(m) => Some(m),
        _ => None,
    }
}

/// Encode a value with insertion ordering
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    cbor4ii::serde::to_writer(&mut out, value)
        .map_err(|err| Error::bad_data(format!("CBOR encoding failed: {err:?}")))?;
    Ok(out)
}

/// Encode a value with the given map ordering
pub fn encode_with(value: &Value, ordering: MapOrdering) -> Result<Vec<u8>> {
    match ordering {
        MapOrdering::Insertion => encode(value),
        MapOrdering::Canonical => encode(&canonicalize(value)?),
    }
}

/// Convert a serializable value to a CBOR value
pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    let mut out = Vec::new();
    cbor4ii::serde::to_writer(&mut out, value)
        .map_err(|err| Error::bad_data(format!("CBOR encoding failed: {err:?}")))?;
    cbor4ii::serde::from_slice(&out)
        .map_err(|err| Error::bad_data(format!("invalid CBOR: {err:?}")))
}

/// Copy of `value` with every map sorted into CTAP2 canonical order
pub fn canonicalize(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Map(entries) => {
            let mut keyed = entries
                .iter()
                .map(|(k, v)| Ok((encode(k)?, k.clone(), canonicalize(v)?)))
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|(a, _, _), (b, _, _)| canonical_cmp(a, b));
            Value::Map(keyed.into_iter().map(|(_, k, v)| (k, v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect::<Result<_>>()?),
        other => other.clone(),
    })
}

/// CTAP2 canonical key order: shorter encoding first, then lexicographic
fn canonical_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Decode exactly one data item; trailing bytes are an error
pub fn decode(data: &[u8]) -> Result<Value> {
    let (value, consumed) = decode_prefix(data)?;
    if consumed != data.len() {
        return Err(Error::bad_data(format!(
            "{} trailing bytes after CBOR item",
            data.len() - consumed
        )));
    }
    Ok(value)
}

/// Decode the first data item and report how many bytes it used
///
/// The item must be in preferred serialization: the consumed length is the
/// length of its re-encoding, and the input must start with exactly those
/// bytes.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize)> {
    let mut reader = SliceReader::new(data);
    let value = Value::decode(&mut reader)
        .map_err(|err| Error::bad_data(format!("invalid CBOR: {err:?}")))?;
    check(&value, 0)?;

    let encoded = encode(&value)?;
    if !data.starts_with(&encoded) {
        return Err(Error::bad_data("CBOR item is not in preferred serialization"));
    }
    Ok((value, encoded.len()))
}

/// Restrict decoded items to what WebAuthn structures use
fn check(value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::bad_data("CBOR nesting too deep"));
    }
    match value {
        Value::Integer(i) if i64::try_from(*i).is_err() => {
            Err(Error::bad_data("CBOR integer out of range"))
        }
        Value::Integer(_) | Value::Bytes(_) | Value::Text(_) | Value::Bool(_) => Ok(()),
        Value::Array(items) => items.iter().try_for_each(|item| check(item, depth + 1)),
        Value::Map(entries) => {
            let mut seen: Vec<MapKey> = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = MapKey::from_value(k)
                    .ok_or_else(|| Error::bad_data("unsupported CBOR map key type"))?;
                if seen.contains(&key) {
                    return Err(Error::bad_data(format!("duplicate CBOR map key {key}")));
                }
                seen.push(key);
                check(v, depth + 1)?;
            }
            Ok(())
        }
        other => Err(Error::bad_data(format!("unsupported CBOR item {other:?}"))),
    }
}

/// Builder for CBOR maps
///
/// Rejects duplicate keys.
#[derive(Debug, Default)]
pub struct MapBuilder {
    entries: Map,
}

impl MapBuilder {
    /// Create a new empty map builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a serializable value
    pub fn insert<T: Serialize>(self, key: impl Into<MapKey>, value: T) -> Result<Self> {
        self.insert_value(key, to_value(&value)?)
    }

    /// Insert an optional value (only if Some)
    pub fn insert_opt<T: Serialize>(self, key: impl Into<MapKey>, value: Option<T>) -> Result<Self> {
        match value {
            Some(v) => self.insert(key, v),
            None => Ok(self),
        }
    }

    /// Insert bytes directly (encodes as CBOR byte string)
    pub fn insert_bytes(self, key: impl Into<MapKey>, bytes: &[u8]) -> Result<Self> {
        self.insert_value(key, Value::Bytes(bytes.to_vec()))
    }

    /// Insert an already built value
    pub fn insert_value(mut self, key: impl Into<MapKey>, value: Value) -> Result<Self> {
        let key = key.into();
        if self.entries.contains_key(key.clone()) {
            return Err(Error::bad_data(format!("duplicate map key {key}")));
        }
        self.entries.push((key.to_value(), value));
        Ok(self)
    }

    /// Build the map entries
    pub fn build_value(self) -> Map {
        self.entries
    }

    /// Encode the map with insertion ordering
    pub fn build(self) -> Result<Vec<u8>> {
        self.build_with(MapOrdering::Insertion)
    }

    pub fn build_with(self, ordering: MapOrdering) -> Result<Vec<u8>> {
        encode_with(&Value::Map(self.entries), ordering)
    }
}

/// Typed accessors over a decoded map
///
/// Missing or mistyped entries are reported as `badData`, prefixed with the
/// structure name when one was given through [`with_context`](Self::with_context).
#[derive(Debug, Clone)]
pub struct MapParser {
    map: Map,
    context: Option<&'static str>,
}

impl MapParser {
    /// Parse from CBOR bytes; the item must be a map
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_value(decode(data)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(map) => Ok(Self { map, context: None }),
            _ => Err(Error::bad_data("expected CBOR map")),
        }
    }

    /// Name used in error details, e.g. `PublicKeyCredentialSource`
    pub fn with_context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    fn missing(&self, key: &MapKey) -> Error {
        match self.context {
            Some(ctx) => Error::bad_data(format!("<{ctx}> {key} not found")),
            None => Error::bad_data(format!("missing map key {key}")),
        }
    }

    pub fn get(&self, key: impl Into<MapKey>) -> Result<&Value> {
        let key = key.into();
        self.map.lookup(key.clone()).ok_or_else(|| self.missing(&key))
    }

    pub fn get_opt(&self, key: impl Into<MapKey>) -> Option<&Value> {
        self.map.lookup(key)
    }

    pub fn contains_key(&self, key: impl Into<MapKey>) -> bool {
        self.map.contains_key(key)
    }

    pub fn get_bytes(&self, key: impl Into<MapKey>) -> Result<&[u8]> {
        let key = key.into();
        self.map
            .lookup_bytes(key.clone())
            .ok_or_else(|| self.missing(&key))
    }

    pub fn get_text(&self, key: impl Into<MapKey>) -> Result<&str> {
        let key = key.into();
        self.map
            .lookup_text(key.clone())
            .ok_or_else(|| self.missing(&key))
    }

    pub fn get_int(&self, key: impl Into<MapKey>) -> Result<i64> {
        let key = key.into();
        self.map.lookup_int(key.clone()).ok_or_else(|| self.missing(&key))
    }

    pub fn get_map(&self, key: impl Into<MapKey>) -> Result<&Map> {
        let key = key.into();
        self.map
            .lookup(key.clone())
            .and_then(as_map)
            .ok_or_else(|| self.missing(&key))
    }

    pub fn into_map(self) -> Map {
        self.map
    }
}
