//! `slog` integration.
//!
//! [`Boundary`] and [`Action`] log as plain strings. With the `json` feature,
//! [`Processor::loggable`] wraps a record in a value that logs its outbound
//! form: the `send` boundary is applied first, so masked and redacted fields
//! never reach the drain in the clear.
//!
//! Logging never fails because of the record. If `send` or serialization
//! fails, a placeholder string is logged instead.

use slog::{Key, Record, Result as SlogResult, Serializer, Value as SlogValue};

use crate::boundary::{Action, Boundary};

impl SlogValue for Boundary {
    fn serialize(&self, _record: &Record<'_>, key: Key, serializer: &mut dyn Serializer) -> SlogResult {
        serializer.emit_str(key, self.as_str())
    }
}

impl SlogValue for Action {
    fn serialize(&self, _record: &Record<'_>, key: Key, serializer: &mut dyn Serializer) -> SlogResult {
        serializer.emit_str(key, self.as_str())
    }
}

#[cfg(feature = "json")]
mod json {
    use serde::Serialize;
    use serde_json::Value as JsonValue;
    use slog::{warn, Key, Record, Result as SlogResult, Serializer, Value as SlogValue};

    use crate::{processor::Processor, schema::Guarded};

    pub(super) const SEND_FAILED: &str = "Failed to apply send boundary";
    pub(super) const SERIALIZE_FAILED: &str = "Failed to serialize outbound value";

    /// A `slog::Value` holding a record's outbound form as JSON.
    ///
    /// Emitted through `slog`'s nested-value support.
    #[derive(Clone, Debug)]
    pub struct OutboundJson {
        value: JsonValue,
    }

    impl OutboundJson {
        /// The JSON that will be logged.
        #[must_use]
        pub fn as_json(&self) -> &JsonValue {
            &self.value
        }
    }

    impl SlogValue for OutboundJson {
        fn serialize(
            &self,
            record: &Record<'_>,
            key: Key,
            serializer: &mut dyn Serializer,
        ) -> SlogResult {
            let nested = slog::Serde(self.value.clone());
            SlogValue::serialize(&nested, record, key, serializer)
        }
    }

    impl<T: Guarded + Serialize> Processor<T> {
        /// Applies `send` to a clone of `value` and captures the result for
        /// logging.
        ///
        /// ```ignore
        /// info!(logger, "user updated"; "user" => processor.loggable(&user));
        /// ```
        pub fn loggable(&self, value: &T) -> OutboundJson {
            let value = match self.send(value) {
                Ok(sent) => serde_json::to_value(&sent).unwrap_or_else(|err| {
                    warn!(self.logger(), "outbound value not serializable"; "error" => %err);
                    JsonValue::String(SERIALIZE_FAILED.to_string())
                }),
                Err(_) => JsonValue::String(SEND_FAILED.to_string()),
            };
            OutboundJson { value }
        }
    }
}

#[cfg(feature = "json")]
pub use json::OutboundJson;
