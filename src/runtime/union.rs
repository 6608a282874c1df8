//! Discriminated Unions and Enumerations
//!
//! Decode rules of the generated types: unions dispatch on the `$type` wire
//! field and keep anything unrecognized as an [`UnknownRecord`]; closed
//! enumerations reject unknown literals; open enumerations never fail.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire key carrying a record's or union member's type id
pub const TYPE_TAG_FIELD: &str = "$type";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Value '{value}' not recognized for {type_name}")]
    UnrecognizedValue { type_name: String, value: String },

    #[error("Missing '{field}' discriminator")]
    MissingTypeTag { field: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl DecodeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}

/// The `$type` discriminator of an object value
pub fn type_tag(value: &Value) -> Option<&str> {
    value.get(TYPE_TAG_FIELD).and_then(Value::as_str)
}

// =============================================================================
// Unknown Records
// =============================================================================

/// Payload of a union's catch-all case.
///
/// Keeps the type id and every other field in input order, so an unknown
/// member survives a decode/encode cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownRecord {
    pub type_id: String,
    pub fields: Map<String, Value>,
}

impl UnknownRecord {
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::invalid("union member is not an object"));
        };
        let type_id = match fields.shift_remove(TYPE_TAG_FIELD) {
            Some(Value::String(type_id)) => type_id,
            _ => {
                return Err(DecodeError::MissingTypeTag {
                    field: TYPE_TAG_FIELD.to_string(),
                })
            }
        };
        Ok(Self { type_id, fields })
    }

    pub fn to_value(&self) -> Value {
        Value::Object(with_type_tag(&self.type_id, self.fields.clone()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl Serialize for UnknownRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UnknownRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// `$type` first, then the remaining fields in their existing order
fn with_type_tag(type_id: &str, fields: Map<String, Value>) -> Map<String, Value> {
    let mut tagged = Map::with_capacity(fields.len() + 1);
    tagged.insert(TYPE_TAG_FIELD.to_string(), Value::String(type_id.to_string()));
    for (key, value) in fields {
        if key != TYPE_TAG_FIELD {
            tagged.insert(key, value);
        }
    }
    tagged
}

// =============================================================================
// Unions
// =============================================================================

/// The known members of a union, one per declared ref
pub trait UnionMembers: Sized {
    /// Every `$type` literal the union recognizes
    fn type_ids() -> &'static [&'static str];

    /// Decode a member whose tag is one of `type_ids()`
    fn decode_member(type_id: &str, value: Value) -> Result<Self, DecodeError>;

    fn type_id(&self) -> &'static str;

    /// Encode the member's own fields; the tag is added by the caller
    fn encode_member(&self) -> Result<Value, DecodeError>;
}

/// A union value: one of the known members, or the catch-all
#[derive(Debug, Clone, PartialEq)]
pub enum Union<T> {
    Known(T),
    Unknown(UnknownRecord),
}

impl<T: UnionMembers> Union<T> {
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        let type_id = type_tag(&value)
            .ok_or_else(|| DecodeError::MissingTypeTag {
                field: TYPE_TAG_FIELD.to_string(),
            })?
            .to_string();
        if T::type_ids().contains(&type_id.as_str()) {
            T::decode_member(&type_id, value).map(Self::Known)
        } else {
            UnknownRecord::from_value(value).map(Self::Unknown)
        }
    }

    pub fn encode(&self) -> Result<Value, DecodeError> {
        match self {
            Self::Known(member) => match member.encode_member()? {
                Value::Object(fields) => Ok(Value::Object(with_type_tag(member.type_id(), fields))),
                _ => Err(DecodeError::invalid("union member did not encode to an object")),
            },
            Self::Unknown(record) => Ok(record.to_value()),
        }
    }

    pub fn type_id(&self) -> &str {
        match self {
            Self::Known(member) => member.type_id(),
            Self::Unknown(record) => &record.type_id,
        }
    }
}

impl<T: UnionMembers> Serialize for Union<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, T: UnionMembers> Deserialize<'de> for Union<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// A string enumeration with a fixed set of literals
pub trait StringEnum: Sized {
    const TYPE_NAME: &'static str;

    fn from_raw(raw: &str) -> Option<Self>;

    fn raw(&self) -> &str;
}

/// Closed enumeration: the literal must match a declared case
pub fn decode_closed<T: StringEnum>(raw: &str) -> Result<T, DecodeError> {
    T::from_raw(raw).ok_or_else(|| DecodeError::UnrecognizedValue {
        type_name: T::TYPE_NAME.to_string(),
        value: raw.to_string(),
    })
}

/// An integer enumeration with a fixed set of values
pub trait IntegerEnum: Sized {
    const TYPE_NAME: &'static str;

    fn from_raw(raw: i64) -> Option<Self>;

    fn raw(&self) -> i64;
}

/// Closed integer enumeration: the value must match a declared case
pub fn decode_closed_integer<T: IntegerEnum>(raw: i64) -> Result<T, DecodeError> {
    T::from_raw(raw).ok_or_else(|| DecodeError::UnrecognizedValue {
        type_name: T::TYPE_NAME.to_string(),
        value: raw.to_string(),
    })
}

/// Open enumeration (known values): unknown literals are kept verbatim
pub fn decode_open<T: StringEnum>(raw: &str) -> KnownValue<T> {
    match T::from_raw(raw) {
        Some(known) => KnownValue::Known(known),
        None => KnownValue::Other(raw.to_string()),
    }
}

/// Value of an open enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownValue<T> {
    Known(T),
    Other(String),
}

impl<T: StringEnum> KnownValue<T> {
    pub fn raw(&self) -> &str {
        match self {
            Self::Known(known) => known.raw(),
            Self::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl<T: StringEnum> Serialize for KnownValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.raw())
    }
}

impl<'de, T: StringEnum> Deserialize<'de> for KnownValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(decode_open(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Visibility {
        Public,
        Hidden,
    }

    impl StringEnum for Visibility {
        const TYPE_NAME: &'static str = "Visibility";

        fn from_raw(raw: &str) -> Option<Self> {
            match raw {
                "public" => Some(Self::Public),
                "hidden" => Some(Self::Hidden),
                _ => None,
            }
        }

        fn raw(&self) -> &str {
            match self {
                Self::Public => "public",
                Self::Hidden => "hidden",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Priority {
        Low,
        High,
    }

    impl IntegerEnum for Priority {
        const TYPE_NAME: &'static str = "Priority";

        fn from_raw(raw: i64) -> Option<Self> {
            match raw {
                1 => Some(Self::Low),
                5 => Some(Self::High),
                _ => None,
            }
        }

        fn raw(&self) -> i64 {
            match self {
                Self::Low => 1,
                Self::High => 5,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Image {
        alt: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Embed {
        Image(Image),
    }

    impl UnionMembers for Embed {
        fn type_ids() -> &'static [&'static str] {
            &["com.example.embed.image"]
        }

        fn decode_member(type_id: &str, value: Value) -> Result<Self, DecodeError> {
            match type_id {
                "com.example.embed.image" => serde_json::from_value(value)
                    .map(Self::Image)
                    .map_err(|e| DecodeError::invalid(e.to_string())),
                other => Err(DecodeError::UnrecognizedValue {
                    type_name: "Embed".into(),
                    value: other.into(),
                }),
            }
        }

        fn type_id(&self) -> &'static str {
            match self {
                Self::Image(_) => "com.example.embed.image",
            }
        }

        fn encode_member(&self) -> Result<Value, DecodeError> {
            match self {
                Self::Image(image) => serde_json::to_value(image).map_err(|e| DecodeError::invalid(e.to_string())),
            }
        }
    }

    #[test]
    fn test_union_dispatches_on_type_tag() {
        let value = json!({"$type": "com.example.embed.image", "alt": "cat"});
        let embed: Union<Embed> = Union::decode(value.clone()).unwrap();
        assert_eq!(embed, Union::Known(Embed::Image(Image { alt: "cat".into() })));
        assert_eq!(embed.encode().unwrap(), value);
    }

    #[test]
    fn test_unknown_member_preserves_fields_in_order() {
        let raw = r#"{"$type":"com.example.embed.video","zeta":1,"alpha":{"nested":true}}"#;
        let embed: Union<Embed> = serde_json::from_str(raw).unwrap();
        match &embed {
            Union::Unknown(record) => {
                assert_eq!(record.type_id, "com.example.embed.video");
                assert_eq!(record.get("zeta"), Some(&json!(1)));
            }
            other => panic!("Expected unknown record, got {:?}", other),
        }
        assert_eq!(serde_json::to_string(&embed).unwrap(), raw);
    }

    #[test]
    fn test_unknown_member_with_inner_type_tag_keeps_field_order() {
        let raw = r#"{"zeta":1,"$type":"com.example.embed.video","alpha":2,"mid":3,"omega":4}"#;
        let record: UnknownRecord = serde_json::from_str(raw).unwrap();
        let keys: Vec<&str> = record.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "omega"]);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"$type":"com.example.embed.video","zeta":1,"alpha":2,"mid":3,"omega":4}"#
        );
    }

    #[test]
    fn test_missing_type_tag_fails() {
        let err = Union::<Embed>::decode(json!({"alt": "cat"})).unwrap_err();
        assert_eq!(err, DecodeError::MissingTypeTag { field: "$type".into() });
    }

    #[test]
    fn test_closed_enum_rejects_unknown_literal() {
        assert_eq!(decode_closed::<Visibility>("hidden").unwrap(), Visibility::Hidden);
        let err = decode_closed::<Visibility>("secret").unwrap_err();
        assert_eq!(err.to_string(), "Value 'secret' not recognized for Visibility");
    }

    #[test]
    fn test_closed_integer_enum_rejects_unknown_value() {
        assert_eq!(decode_closed_integer::<Priority>(5).unwrap(), Priority::High);
        assert_eq!(decode_closed_integer::<Priority>(1).unwrap().raw(), 1);
        let err = decode_closed_integer::<Priority>(3).unwrap_err();
        assert_eq!(err.to_string(), "Value '3' not recognized for Priority");
    }

    #[test]
    fn test_open_enum_never_fails() {
        let known: KnownValue<Visibility> = serde_json::from_str("\"public\"").unwrap();
        assert!(known.is_known());
        let other: KnownValue<Visibility> = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(other, KnownValue::Other("archived".into()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"archived\"");
    }
}
