//! Handler trait - typed handlers and their type-erased adapter.
//!
//! # Learning points
//! - Generic trait (`Handler<M>`)
//! - Type erasure (`TypedListener<M, H>` -> `dyn Listener`)

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::listener::Listener;
use super::message::Message;
use crate::error::HandlerError;

/// Handles one type of a typed message.
///
/// `Handler<UserCreated>` only ever receives a decoded `UserCreated`; a payload
/// that does not decode is recorded as [`HandlerError::Decode`].
#[async_trait]
pub trait Handler<M: Message>: Send + Sync {
    type Output: Serialize + Send;

    async fn handle(&self, message: M) -> Result<Self::Output, HandlerError>;
}

pub struct TypedListener<M: Message, H: Handler<M>> {
    handler: H,
    _marker: PhantomData<M>,
}

impl<M: Message, H: Handler<M>> TypedListener<M, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M: Message, H: Handler<M>> Listener for TypedListener<M, H> {
    async fn handle(&self, data: &Value) -> Result<Value, HandlerError> {
        let message: M = serde_json::from_value(data.clone())
            .map_err(|e| HandlerError::Decode(e.to_string()))?;
        let output = self.handler.handle(message).await?;
        serde_json::to_value(output).map_err(|e| HandlerError::Failed(format!("json encode: {e}")))
    }
}

/// Wraps a typed handler for [`MessageCenter::subscribe`](crate::app::MessageCenter::subscribe).
pub fn typed<M: Message, H: Handler<M> + 'static>(handler: H) -> Arc<dyn Listener> {
    Arc::new(TypedListener::<M, H>::new(handler))
}
