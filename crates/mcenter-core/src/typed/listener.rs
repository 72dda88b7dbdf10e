//! Listener - the object-safe handler bound to one `(message, type)` key.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::HandlerError;

/// Processes one type of one message.
///
/// Called once per work item with the published payload. The returned value is
/// stored in the item's result map under the type name.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn handle(&self, data: &Value) -> Result<Value, HandlerError>;
}

/// Adapts an async closure into a [`Listener`].
pub struct FnListener<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Listener for FnListener<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn handle(&self, data: &Value) -> Result<Value, HandlerError> {
        (self.f)(data.clone()).await
    }
}

/// # Example
/// ```ignore
/// center.subscribe("user.created", "save", listener_fn(|data| async move {
///     Ok(json!({ "saved": data["id"] }))
/// }))?;
/// ```
pub fn listener_fn<F, Fut>(f: F) -> Arc<dyn Listener>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    Arc::new(FnListener { f })
}
