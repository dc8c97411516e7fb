//! Codec contract.
//!
//! A codec turns a record into bytes and back. Processors call it after
//! outbound transforms and before inbound ones; it never sees fields the
//! processor has not yet transformed.

use crate::error::BoxError;

/// Marshals values of `T` to and from a wire format.
///
/// `JsonCodec` ships with the `json` feature; other formats
/// implement this trait and attach through `Processor::with_codec`.
pub trait Codec<T>: Send + Sync {
    /// MIME type of the encoded form, e.g. `application/json`.
    fn content_type(&self) -> &str;

    fn encode(&self, value: &T) -> Result<Vec<u8>, BoxError>;

    /// Decodes `data` into `value`, which starts out as `T::default()`.
    fn decode(&self, data: &[u8], value: &mut T) -> Result<(), BoxError>;
}

#[cfg(feature = "json")]
mod json {
    use serde::{de::DeserializeOwned, Serialize};

    use super::Codec;
    use crate::error::BoxError;

    /// JSON through `serde_json`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct JsonCodec;

    impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
        fn content_type(&self) -> &str {
            "application/json"
        }

        fn encode(&self, value: &T) -> Result<Vec<u8>, BoxError> {
            Ok(serde_json::to_vec(value)?)
        }

        fn decode(&self, data: &[u8], value: &mut T) -> Result<(), BoxError> {
            *value = serde_json::from_slice(data)?;
            Ok(())
        }
    }

}

#[cfg(feature = "json")]
pub use json::JsonCodec;
