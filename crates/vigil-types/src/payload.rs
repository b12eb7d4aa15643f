//! Wire payloads.
//!
//! A [`Payload`] is the unit the engine stores and transmits: opaque `data`
//! bytes plus string-keyed byte metadata, one entry of which (`encoding`)
//! names the encoding used for `data`. The serde representation mirrors the
//! protobuf-JSON form engines emit (metadata values and data are base64), so
//! fixture files on disk can be compared against what the engine produced.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConverterError, Result};

/// Well-known encoding names.
pub mod encoding {
    /// Metadata key holding the encoding name.
    pub const METADATA_KEY: &str = "encoding";
    /// Absent value (`()`, `None`).
    pub const BINARY_NULL: &str = "binary/null";
    /// Raw bytes, passed through untouched.
    pub const BINARY_PLAIN: &str = "binary/plain";
    /// UTF-8 JSON document.
    pub const JSON_PLAIN: &str = "json/plain";
}

/// Ordered argument list.
pub type Payloads = Vec<Payload>;

/// A serialized value as the engine sees it.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    /// Encoding and other metadata.
    #[serde(default, with = "base64_map")]
    pub metadata: BTreeMap<String, Vec<u8>>,
    /// Encoded value.
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Payload {
    /// Build a payload with the given encoding and data.
    pub fn new(encoding_name: &str, data: Vec<u8>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            encoding::METADATA_KEY.to_string(),
            encoding_name.as_bytes().to_vec(),
        );
        Self { metadata, data }
    }

    /// The `binary/null` payload.
    pub fn null() -> Self {
        Self::new(encoding::BINARY_NULL, Vec::new())
    }

    /// Name of the encoding recorded in metadata.
    pub fn encoding(&self) -> Result<&str> {
        let raw = self
            .metadata
            .get(encoding::METADATA_KEY)
            .ok_or(ConverterError::MissingEncoding)?;
        std::str::from_utf8(raw).map_err(|_| ConverterError::InvalidEncoding)
    }

    /// Whether this payload encodes an absent value.
    pub fn is_null(&self) -> bool {
        matches!(self.encoding(), Ok(encoding::BINARY_NULL))
    }

    /// Whether the data is a self-describing (JSON) document.
    pub fn is_self_describing(&self) -> bool {
        matches!(self.encoding(), Ok(encoding::JSON_PLAIN))
    }

    /// Decode the data into a JSON value for display and structural comparison.
    ///
    /// Binary data is rendered as an array of byte values.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        match self.encoding()? {
            encoding::BINARY_NULL => Ok(serde_json::Value::Null),
            encoding::JSON_PLAIN => Ok(serde_json::from_slice(&self.data)?),
            _ => Ok(serde_json::Value::Array(
                self.data.iter().map(|b| serde_json::Value::from(*b)).collect(),
            )),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata: BTreeMap<&str, String> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v).into_owned()))
            .collect();
        f.debug_struct("Payload")
            .field("metadata", &metadata)
            .field("data", &DataPreview(self))
            .finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding_name = self.encoding().unwrap_or("<unknown>");
        write!(f, "[{encoding_name}] {:?}", DataPreview(self))
    }
}

struct DataPreview<'a>(&'a Payload);

impl fmt::Debug for DataPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_self_describing() {
            write!(f, "{}", String::from_utf8_lossy(&self.0.data))
        } else {
            write!(f, "0x")?;
            for b in &self.0.data {
                write!(f, "{b:02x}")?;
            }
            Ok(())
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &STANDARD.encode(value))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.as_bytes())
                    .map(|bytes| (k, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_protobuf_json_shape() {
        let payload = Payload::new(encoding::BINARY_PLAIN, vec![0xde, 0xad, 0xbe, 0xef]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": { "encoding": "YmluYXJ5L3BsYWlu" },
                "data": "3q2+7w=="
            })
        );
    }

    #[test]
    fn test_parse_fixture_without_data() {
        let payload: Payload =
            serde_json::from_value(json!({ "metadata": { "encoding": "YmluYXJ5L251bGw=" } }))
                .unwrap();
        assert!(payload.is_null());
        assert!(payload.data.is_empty());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result: std::result::Result<Payload, _> =
            serde_json::from_value(json!({ "metadata": {}, "data": "***" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_encoding() {
        let payload = Payload::default();
        assert!(matches!(
            payload.encoding(),
            Err(ConverterError::MissingEncoding)
        ));
    }

    #[test]
    fn test_display_binary_as_hex() {
        let payload = Payload::new(encoding::BINARY_PLAIN, vec![0xde, 0xad]);
        assert_eq!(payload.to_string(), "[binary/plain] 0xdead");
    }

    #[test]
    fn test_to_json_value() {
        let json_payload = Payload::new(encoding::JSON_PLAIN, b"{\"a\": 1}".to_vec());
        assert_eq!(json_payload.to_json_value().unwrap(), json!({"a": 1}));

        let bin = Payload::new(encoding::BINARY_PLAIN, vec![1, 2]);
        assert_eq!(bin.to_json_value().unwrap(), json!([1, 2]));

        assert_eq!(Payload::null().to_json_value().unwrap(), json!(null));
    }
}
