//! Validator port.
//!
//! Payload and result validation is delegated to whatever the caller plugs in;
//! the center only needs "ok" or "rejected with a reason".

use serde_json::Value;

use crate::error::ValidationError;

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self(value)
    }
}

/// Boxes a validator for [`MessageCenter::register`](crate::app::MessageCenter::register).
pub fn validator(v: impl Validator + 'static) -> std::sync::Arc<dyn Validator> {
    std::sync::Arc::new(v)
}
