use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::ports::StoreError;

/// Setup-time and publish-time failures.
///
/// Registration, subscription and notifier errors are programmer errors and are
/// always returned to the caller. Publish errors depend on
/// [`PublishPolicy`](crate::config::PublishPolicy).
#[derive(Debug, Error)]
pub enum McenterError {
    #[error("message already registered: {name}")]
    DuplicateRegistration { name: String },

    #[error("cannot register {name}: the message center is already ready")]
    RegisterAfterReady { name: String },

    #[error("message not registered: {name} (publish)")]
    UnregisteredOnPublish { name: String },

    #[error("payload rejected for {name}: {source}")]
    InvalidPayload {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("message not registered: {name} (subscribe)")]
    UnregisteredMessage { name: String },

    #[error("unknown type for {name}: {type_name}")]
    UnknownType { name: String, type_name: String },

    #[error("duplicate subscription for {name}::{type_name}")]
    DuplicateSubscription { name: String, type_name: String },

    #[error("unknown notifier kind: {kind}")]
    UnknownNotifierKind { kind: String },

    #[error("cannot encode payload for {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("work item {id} was dropped before its result was reported")]
    Abandoned { id: String },

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),
}

/// Returned by payload and result validators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of one type handler for one work item.
///
/// Recorded in the item's result slot and routed to the `error` notifier. It
/// never leaves the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("payload decode: {0}")]
    Decode(String),

    #[error("invalid result: {0}")]
    InvalidResult(ValidationError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("no listener for {name}::{type_name}")]
    MissingListener { name: String, type_name: String },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

// Persisted results only keep the rendered message; anything read back from
// the store comes back as `Failed`. Other writers may have stored an arbitrary
// JSON value in the error slot, so any shape is accepted.
impl Serialize for HandlerError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HandlerError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let message = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(map) => {
                let message = map.get("message").and_then(serde_json::Value::as_str).map(str::to_string);
                message.unwrap_or_else(|| serde_json::Value::Object(map).to_string())
            }
            other => other.to_string(),
        };
        Ok(HandlerError::Failed(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn handler_error_serializes_as_message() {
        let err = HandlerError::InvalidResult(ValidationError::new("missing value"));
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#""invalid result: missing value""#);

        let back: HandlerError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HandlerError::failed("invalid result: missing value"));
    }

    #[rstest]
    #[case(json!({ "message": "boom" }), "boom")]
    #[case(json!({}), "{}")]
    #[case(json!(42), "42")]
    #[case(json!(["a"]), r#"["a"]"#)]
    fn stored_error_of_any_shape_reads_back_as_failed(#[case] stored: serde_json::Value, #[case] message: &str) {
        let back: HandlerError = serde_json::from_value(stored).unwrap();
        assert_eq!(back, HandlerError::failed(message));
    }

    #[test]
    fn errors_name_the_message_and_type() {
        let err = McenterError::DuplicateSubscription {
            name: "user.created".into(),
            type_name: "save".into(),
        };
        assert_eq!(err.to_string(), "duplicate subscription for user.created::save");
    }
}
