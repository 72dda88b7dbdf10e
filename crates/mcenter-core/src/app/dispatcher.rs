//! Dispatcher - runs every type of one work item, in declared order.
//!
//! Per type:
//! 1. skip when the type already has a result (recovered item) or the center
//!    is shutting down
//! 2. run the listener, timed, behind `catch_unwind`
//! 3. validate the returned value, notify on error and on overrun
//! 4. record `[error, value, elapsedMs]`
//!
//! Then the callback runs, an interrupted item is parked in the store, and the
//! item is settled with the lifecycle.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::lifecycle::Lifecycle;
use super::notifier::{Notification, Notifiers, panic_message};
use super::registry::MessageRegistry;
use super::worker_pool::Work;
use crate::domain::{MessageDefinition, RegisteredType, TypeOutcome, WorkItem};
use crate::error::HandlerError;
use crate::ports::StoreClient;

pub struct Dispatcher {
    registry: Arc<RwLock<MessageRegistry>>,
    lifecycle: Arc<Lifecycle>,
    notifiers: Arc<Notifiers>,
    store: Arc<dyn StoreClient>,
    store_key: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RwLock<MessageRegistry>>,
        lifecycle: Arc<Lifecycle>,
        notifiers: Arc<Notifiers>,
        store: Arc<dyn StoreClient>,
        store_key: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            notifiers,
            store,
            store_key: store_key.into(),
        }
    }

    async fn dispatch(&self, mut item: WorkItem) {
        let definition = self.registry.read().message(&item.name);
        let Some(definition) = definition else {
            warn!(id = %item.id, name = %item.name, "dispatch for unregistered message dropped");
            self.lifecycle.settle();
            return;
        };

        for registered in definition.types() {
            let type_name = registered.spec.name();
            // recovered results were never counted as pending
            if item.result.contains_key(type_name) {
                continue;
            }
            if self.lifecycle.is_shutting_down() {
                registered.stats.skipped();
                continue;
            }

            let outcome = self.run_type(&definition, registered, &item).await;
            info!(
                id = %item.id,
                name = %item.name,
                type_name,
                ok = outcome.is_ok(),
                elapsed_ms = outcome.elapsed_ms,
                "mcenter.dispatch"
            );
            item.result.insert(type_name.to_string(), outcome);
        }

        if let Some(callback) = item.callback.take() {
            let result = &item.result;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(result))) {
                error!(id = %item.id, name = %item.name, panic = %panic_message(panic.as_ref()), "callback panicked");
            }
        }

        if self.lifecycle.is_shutting_down() && item.result.len() != definition.type_count() {
            self.park(&item).await;
        }

        self.lifecycle.settle();
    }

    async fn run_type(&self, definition: &MessageDefinition, registered: &RegisteredType, item: &WorkItem) -> TypeOutcome {
        let spec = &registered.spec;
        let listener = self.registry.read().listener(definition.name(), spec.name());

        registered.stats.started();
        let started = Instant::now();
        let (error, value) = match listener {
            None => (
                Some(HandlerError::MissingListener {
                    name: definition.name().to_string(),
                    type_name: spec.name().to_string(),
                }),
                None,
            ),
            Some(listener) => match AssertUnwindSafe(listener.handle(&item.data)).catch_unwind().await {
                Ok(Ok(value)) => match spec.validate_result(&value) {
                    Ok(()) => (None, Some(value)),
                    // the rejected value is still recorded next to the error
                    Err(e) => (Some(HandlerError::InvalidResult(e)), Some(value)),
                },
                Ok(Err(e)) => (Some(e), None),
                Err(panic) => (Some(HandlerError::Panicked(panic_message(panic.as_ref()))), None),
            },
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        registered.stats.finished(error.is_none());

        if let Some(error) = &error {
            self.notifiers.notify(&Notification::Error {
                error,
                id: &item.id,
                name: definition.name(),
                type_name: spec.name(),
                data: &item.data,
            });
        }

        // whole milliseconds, so a reported overrun always exceeds the limit
        if let Some(limit) = spec.timeout_limit()
            && elapsed_ms > limit.as_millis() as u64
        {
            registered.stats.timed_out();
            self.notifiers.notify(&Notification::Timeout {
                elapsed_ms,
                id: &item.id,
                name: definition.name(),
                type_name: spec.name(),
            });
        }

        TypeOutcome {
            error,
            value,
            elapsed_ms,
        }
    }

    /// Stores an item that shutdown interrupted, for recovery on the next start.
    async fn park(&self, item: &WorkItem) {
        let record = match item.to_record().to_json() {
            Ok(record) => record,
            Err(e) => {
                error!(id = %item.id, name = %item.name, error = %e, "failed to encode interrupted item");
                return;
            }
        };

        match self.store.set(&self.store_key, item.id.as_str(), record).await {
            Ok(()) => debug!(id = %item.id, name = %item.name, done = item.result.len(), "interrupted item stored"),
            Err(e) => error!(id = %item.id, name = %item.name, error = %e, "failed to store interrupted item"),
        }
    }
}

#[async_trait]
impl Work for Dispatcher {
    async fn run(&self, item: WorkItem) {
        self.dispatch(item).await;
    }
}
