//! Generic Lexicon Values
//!
//! The decoded form of `unknown`-typed data. Besides plain JSON it knows two
//! special objects: `{"$link": cid}` for content links and `{"$bytes": b64}`
//! for raw bytes.
//!
//! In binary form a leading `0x00` byte marks the remainder as raw CID bytes;
//! anything else is plain bytes.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::union::DecodeError;

const LINK_KEY: &str = "$link";
const BYTES_KEY: &str = "$bytes";

/// Leading byte of a CID in binary form
pub const CID_SENTINEL: u8 = 0x00;

/// Multibase prefix of base32 (lowercase, unpadded) link strings
const BASE32_PREFIX: char = 'b';
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum LexValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Bytes(Vec<u8>),
    CidLink(String),
    Array(Vec<LexValue>),
    Object(BTreeMap<String, LexValue>),
}

impl LexValue {
    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .ok_or_else(|| DecodeError::invalid(format!("'{}' is not an integer", n))),
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(map) => Self::from_object(map),
        }
    }

    fn from_object(map: Map<String, Value>) -> Result<Self, DecodeError> {
        if map.len() == 1 {
            if let Some(Value::String(link)) = map.get(LINK_KEY) {
                return Ok(Self::CidLink(link.clone()));
            }
            if let Some(Value::String(encoded)) = map.get(BYTES_KEY) {
                return decode_base64(encoded).map(Self::Bytes);
            }
        }
        map.into_iter()
            .map(|(key, value)| Ok((key, Self::from_json(value)?)))
            .collect::<Result<BTreeMap<_, _>, DecodeError>>()
            .map(Self::Object)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(n) => Value::from(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(bytes) => single(BYTES_KEY, STANDARD_NO_PAD.encode(bytes)),
            Self::CidLink(link) => single(LINK_KEY, link.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Classify a binary value: sentinel-prefixed data is a CID, the rest bytes
    pub fn from_binary(data: &[u8]) -> Self {
        match data.split_first() {
            Some((&CID_SENTINEL, cid)) => Self::CidLink(format!("{}{}", BASE32_PREFIX, base32_encode(cid))),
            _ => Self::Bytes(data.to_vec()),
        }
    }

    /// Binary form of bytes and links; `None` for every other value
    pub fn to_binary(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes.clone()),
            Self::CidLink(link) => {
                let cid = base32_decode(link.strip_prefix(BASE32_PREFIX)?)?;
                let mut out = Vec::with_capacity(cid.len() + 1);
                out.push(CID_SENTINEL);
                out.extend(cid);
                Some(out)
            }
            _ => None,
        }
    }
}

impl TryFrom<Value> for LexValue {
    type Error = DecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl From<LexValue> for Value {
    fn from(value: LexValue) -> Self {
        value.to_json()
    }
}

fn single(key: &str, value: String) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value));
    Value::Object(map)
}

/// Accepts padded and unpadded standard base64
fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = encoded.trim_end_matches('=');
    STANDARD_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(encoded))
        .map_err(|e| DecodeError::invalid(format!("invalid $bytes: {}", e)))
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(encoded: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in encoded.bytes() {
        let index = BASE32_ALPHABET.iter().position(|&a| a == c)? as u32;
        buffer = (buffer << 5) | index;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_special_objects() {
        let value: LexValue = serde_json::from_value(json!({
            "img": { "$bytes": "aGVsbG8" },
            "ref": { "$link": "bafyabc" },
            "plain": { "$link": "x", "other": 1 }
        }))
        .unwrap();

        let LexValue::Object(map) = &value else {
            panic!("Expected object, got {:?}", value);
        };
        assert_eq!(map["img"], LexValue::Bytes(b"hello".to_vec()));
        assert_eq!(map["ref"], LexValue::CidLink("bafyabc".into()));
        assert!(matches!(map["plain"], LexValue::Object(_)));

        assert_eq!(serde_json::to_value(&value).unwrap()["img"], json!({"$bytes": "aGVsbG8"}));
    }

    #[test]
    fn test_floats_are_rejected() {
        assert!(LexValue::from_json(json!(1.5)).is_err());
    }

    #[test]
    fn test_binary_sentinel_marks_cid() {
        let cid = LexValue::from_binary(&[0x00, 0x01, 0x71]);
        assert_eq!(cid, LexValue::CidLink("bafyq".into()));
        assert_eq!(cid.to_binary(), Some(vec![0x00, 0x01, 0x71]));

        let bytes = LexValue::from_binary(b"hi");
        assert_eq!(bytes, LexValue::Bytes(b"hi".to_vec()));
        assert_eq!(LexValue::String("s".into()).to_binary(), None);
    }
}
