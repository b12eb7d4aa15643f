//! Default data converter.
//!
//! Values are encoded by type: byte vectors travel as `binary/plain`, unit and
//! `None` as `binary/null`, and everything else as `json/plain`. Arbitrary
//! serde types opt in to JSON through the [`Json`] wrapper.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ConverterError, Result};
use crate::payload::{Payload, encoding};

/// Encode a value into a wire payload.
pub trait ToPayload {
    /// Produce the payload for this value.
    fn to_payload(&self) -> Result<Payload>;
}

/// Decode a value from a wire payload.
pub trait FromPayload: Sized {
    /// Decode the payload into `Self`.
    fn from_payload(payload: &Payload) -> Result<Self>;

    /// Decode the argument at `index`, treating a missing argument as `binary/null`.
    fn from_arg(args: &[Payload], index: usize) -> Result<Self> {
        match args.get(index) {
            Some(payload) => Self::from_payload(payload),
            None => Self::from_payload(&Payload::null()),
        }
    }
}

/// Wrapper that forces JSON encoding for any serde type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> ToPayload for Json<T> {
    fn to_payload(&self) -> Result<Payload> {
        json_payload(&self.0)
    }
}

impl<T: DeserializeOwned> FromPayload for Json<T> {
    fn from_payload(payload: &Payload) -> Result<Self> {
        json_value(payload).map(Json)
    }
}

impl<T: ToPayload + ?Sized> ToPayload for &T {
    fn to_payload(&self) -> Result<Payload> {
        (**self).to_payload()
    }
}

impl ToPayload for Payload {
    fn to_payload(&self) -> Result<Payload> {
        Ok(self.clone())
    }
}

impl FromPayload for Payload {
    fn from_payload(payload: &Payload) -> Result<Self> {
        Ok(payload.clone())
    }
}

impl ToPayload for () {
    fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::null())
    }
}

impl FromPayload for () {
    fn from_payload(_payload: &Payload) -> Result<Self> {
        Ok(())
    }
}

impl ToPayload for Vec<u8> {
    fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::new(encoding::BINARY_PLAIN, self.clone()))
    }
}

impl ToPayload for [u8] {
    fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::new(encoding::BINARY_PLAIN, self.to_vec()))
    }
}

impl FromPayload for Vec<u8> {
    fn from_payload(payload: &Payload) -> Result<Self> {
        match payload.encoding()? {
            encoding::BINARY_PLAIN => Ok(payload.data.clone()),
            encoding::BINARY_NULL => Ok(Vec::new()),
            other => Err(ConverterError::EncodingMismatch {
                expected: encoding::BINARY_PLAIN,
                found: other.to_string(),
            }),
        }
    }
}

impl<T: ToPayload> ToPayload for Option<T> {
    fn to_payload(&self) -> Result<Payload> {
        match self {
            Some(value) => value.to_payload(),
            None => Ok(Payload::null()),
        }
    }
}

impl<T: FromPayload> FromPayload for Option<T> {
    fn from_payload(payload: &Payload) -> Result<Self> {
        if payload.is_null() {
            Ok(None)
        } else {
            T::from_payload(payload).map(Some)
        }
    }
}

impl ToPayload for str {
    fn to_payload(&self) -> Result<Payload> {
        json_payload(self)
    }
}

macro_rules! json_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToPayload for $ty {
                fn to_payload(&self) -> Result<Payload> {
                    json_payload(self)
                }
            }

            impl FromPayload for $ty {
                fn from_payload(payload: &Payload) -> Result<Self> {
                    json_value(payload)
                }
            }
        )*
    };
}

json_scalar!(String, bool, i32, i64, u32, u64, f64, serde_json::Value);

/// Encode a list of arguments.
pub fn encode_args(args: &[&dyn ToPayload]) -> Result<Vec<Payload>> {
    args.iter().map(|arg| arg.to_payload()).collect()
}

fn json_payload<T: Serialize + ?Sized>(value: &T) -> Result<Payload> {
    Ok(Payload::new(encoding::JSON_PLAIN, serde_json::to_vec(value)?))
}

fn json_value<T: DeserializeOwned>(payload: &Payload) -> Result<T> {
    match payload.encoding()? {
        encoding::JSON_PLAIN => Ok(serde_json::from_slice(&payload.data)?),
        other => Err(ConverterError::EncodingMismatch {
            expected: encoding::JSON_PLAIN,
            found: other.to_string(),
        }),
    }
}
