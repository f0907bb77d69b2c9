//! The proto3 canonical JSON mapping of the generated messages.
//!
//! `build.rs` attaches `#[serde(with = "...")]` to message fields pointing at
//! the adapters below. Writers follow the canonical form (int64 as decimal
//! strings, enums by name, timestamps as RFC 3339); readers accept every form
//! the mapping allows (strings or numbers, names or numbers, and `null` for
//! the default value). Unknown fields are rejected.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::greeter::Status;

/// `int64` fields: written as strings, read from strings or numbers.
pub mod int64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(Int64Visitor)
    }

    struct Int64Visitor;

    impl<'de> Visitor<'de> for Int64Visitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an int64 as a JSON number or decimal string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }
    }
}

/// `Status` enum fields stored as `i32`: written by name, read from names or
/// numbers. Values outside the enum are written as plain numbers so that a
/// message never fails to serialize.
pub mod status {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match Status::try_from(*value) {
            Ok(status) => serializer.serialize_str(status.as_str_name()),
            Err(_) => serializer.serialize_i32(*value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        deserializer.deserialize_any(StatusVisitor)
    }

    struct StatusVisitor;

    impl<'de> Visitor<'de> for StatusVisitor {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a Status name or number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i32, E> {
            Status::from_str_name(v)
                .map(|status| status as i32)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<i32, E> {
            Ok(Status::default() as i32)
        }
    }
}

/// `google.protobuf.Timestamp` fields: RFC 3339 strings.
pub mod timestamp {
    use prost_types::Timestamp;

    use super::*;
    use crate::timestamp::{parse_rfc3339, to_rfc3339};

    pub fn serialize<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => {
                let text = to_rfc3339(ts)
                    .ok_or_else(|| serde::ser::Error::custom("timestamp out of range"))?;
                serializer.serialize_str(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        parse_rfc3339(&raw)
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// A message with a proto3 JSON form.
///
/// Implemented through serde for the `greeter` messages and by hand for
/// `google.protobuf.Empty`, which prost maps to `()` and whose JSON form is
/// `{}`.
pub trait JsonMessage: Sized {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;

    fn from_json(bytes: &[u8]) -> serde_json::Result<Self>;
}

macro_rules! serde_json_message {
    ($($message:ty),* $(,)?) => {
        $(
            impl JsonMessage for $message {
                fn to_json(&self) -> serde_json::Result<Vec<u8>> {
                    serde_json::to_vec(self)
                }

                fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
                    serde_json::from_slice(bytes)
                }
            }
        )*
    };
}

serde_json_message!(
    crate::ToDoDetails,
    crate::ToDoItem,
    crate::GetAllResponse,
    crate::GetOneRequest,
    crate::GetOneResponse,
    crate::CreateRequest,
    crate::CreateResponse,
    crate::UpdateRequest,
    crate::UpdateResponse,
    crate::UpdateStatusRequest,
    crate::DeleteRequest,
);

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyObject {}

impl JsonMessage for () {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&EmptyObject {})
    }

    fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<EmptyObject>(bytes).map(|_| ())
    }
}
